//! Store repository for `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use shopkeep_core::{Store, StoreId};

use super::RepositoryError;
use super::repo::StoreRepository;

/// Row shape of `storefront.store`.
#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: StoreId,
    slug: String,
    subdomain: Option<String>,
    custom_domain: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            subdomain: row.subdomain,
            custom_domain: row.custom_domain,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `PostgreSQL` store repository.
#[derive(Clone)]
pub struct PgStoreRepository {
    pool: PgPool,
}

impl PgStoreRepository {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreRepository for PgStoreRepository {
    #[instrument(skip(self))]
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Store>, RepositoryError> {
        // The unique indexes are on lower(field), so each branch is an index
        // lookup; ORDER BY applies the custom domain > subdomain > slug rule.
        let row = sqlx::query_as::<_, StoreRow>(
            r"
            SELECT id, slug, subdomain, custom_domain, active, created_at, updated_at
            FROM storefront.store
            WHERE lower(custom_domain) = $1
               OR lower(subdomain) = $1
               OR lower(slug) = $1
            ORDER BY CASE
                WHEN lower(custom_domain) = $1 THEN 0
                WHEN lower(subdomain) = $1 THEN 1
                ELSE 2
            END, id
            LIMIT 1
            ",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Store::from))
    }
}
