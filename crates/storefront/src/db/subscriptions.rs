//! Subscription repository for `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use shopkeep_core::{
    ChannelLimit, ChannelUsage, LimitError, PlanId, PlanLimits, StoreId, SubscriptionId,
    SubscriptionStatus,
};

use super::RepositoryError;
use super::repo::SubscriptionRepository;
use crate::subscription::SubscriptionRecord;

/// Row shape of `storefront.subscription` joined with its plan.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: SubscriptionId,
    store_id: StoreId,
    plan_id: PlanId,
    status: SubscriptionStatus,
    trial_ends_at: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    messaging_orders_used: i32,
    website_orders_used: i32,
    updated_at: DateTime<Utc>,
    messaging_order_limit: Option<i32>,
    website_order_limit: Option<i32>,
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = RepositoryError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let corrupt = |e: LimitError| {
            RepositoryError::DataCorruption(format!("subscription {}: {e}", row.id))
        };

        let limits = PlanLimits::new(
            ChannelLimit::from_stored(row.messaging_order_limit.map(i64::from))
                .map_err(corrupt)?,
            ChannelLimit::from_stored(row.website_order_limit.map(i64::from)).map_err(corrupt)?,
        );
        let usage = ChannelUsage::from_stored(
            i64::from(row.messaging_orders_used),
            i64::from(row.website_orders_used),
        )
        .map_err(corrupt)?;

        Ok(Self {
            id: row.id,
            store_id: row.store_id,
            plan_id: row.plan_id,
            status: row.status,
            trial_ends_at: row.trial_ends_at,
            current_period_end: row.current_period_end,
            limits,
            usage,
            updated_at: row.updated_at,
        })
    }
}

/// `PostgreSQL` subscription repository.
#[derive(Clone)]
pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    /// Create a new subscription repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    #[instrument(skip(self))]
    async fn list_for_store(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<SubscriptionRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r"
            SELECT s.id, s.store_id, s.plan_id, s.status,
                   s.trial_ends_at, s.current_period_end,
                   s.messaging_orders_used, s.website_orders_used,
                   s.updated_at,
                   p.messaging_order_limit, p.website_order_limit
            FROM storefront.subscription s
            JOIN storefront.subscription_plan p ON p.id = s.plan_id
            WHERE s.store_id = $1
            ORDER BY s.updated_at DESC, s.id DESC
            ",
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SubscriptionRecord::try_from).collect()
    }
}
