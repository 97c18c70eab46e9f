//! Repository traits.
//!
//! The admission gate holds its backends as `Arc<dyn ...>` so the same code
//! path runs against `PostgreSQL` in production and the in-memory backend in
//! tests.

use async_trait::async_trait;
use shopkeep_core::{Store, StoreId};

use super::RepositoryError;
use crate::subscription::SubscriptionRecord;

/// Read access to tenant records.
#[async_trait]
pub trait StoreRepository: Send + Sync {
    /// Find the store whose custom domain, subdomain, or slug equals
    /// `identifier` (already lower-cased).
    ///
    /// When several stores match, the custom-domain match wins, then the
    /// subdomain match, then the slug match. Inactive stores are returned as
    /// is; filtering is the directory's job.
    async fn find_by_identifier(&self, identifier: &str)
    -> Result<Option<Store>, RepositoryError>;
}

/// Read access to subscription rows, joined with their plan limits.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// All subscription rows for a store, current and historical.
    async fn list_for_store(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<SubscriptionRecord>, RepositoryError>;
}
