//! `PostgreSQL` quota ledger.
//!
//! Admission is one conditional `UPDATE ... RETURNING`. Under READ COMMITTED
//! a concurrent updater of the same row blocks on the row lock, then
//! re-evaluates the `WHERE` clause against the committed counter, so the
//! comparison always sees the latest value.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

use shopkeep_core::{
    Channel, ChannelLimit, ChannelUsage, SubscriptionId, SubscriptionStatus,
};

use super::{LedgerError, LedgerOutcome, QuotaLedger, QuotaRejection};
use crate::db::RepositoryError;

// A row only matches while the subscription is live and its period has not
// ended, so an order racing a cancellation or the period boundary is not
// counted.
const ADMIT_MESSAGING: &str = r"
    UPDATE storefront.subscription AS s
    SET messaging_orders_used = s.messaging_orders_used + 1
    FROM storefront.subscription_plan AS p
    WHERE s.id = $1
      AND p.id = s.plan_id
      AND s.status IN ('trial', 'active')
      AND COALESCE(
            CASE WHEN s.status = 'trial'
                 THEN COALESCE(s.trial_ends_at, s.current_period_end)
                 ELSE s.current_period_end
            END > now(),
            TRUE)
      AND p.messaging_order_limit IS NOT NULL
      AND (p.messaging_order_limit = 0 OR s.messaging_orders_used < p.messaging_order_limit)
    RETURNING s.messaging_orders_used, p.messaging_order_limit
";

const ADMIT_WEBSITE: &str = r"
    UPDATE storefront.subscription AS s
    SET website_orders_used = s.website_orders_used + 1
    FROM storefront.subscription_plan AS p
    WHERE s.id = $1
      AND p.id = s.plan_id
      AND s.status IN ('trial', 'active')
      AND COALESCE(
            CASE WHEN s.status = 'trial'
                 THEN COALESCE(s.trial_ends_at, s.current_period_end)
                 ELSE s.current_period_end
            END > now(),
            TRUE)
      AND p.website_order_limit IS NOT NULL
      AND (p.website_order_limit = 0 OR s.website_orders_used < p.website_order_limit)
    RETURNING s.website_orders_used, p.website_order_limit
";

const READ_MESSAGING: &str = r"
    SELECT s.messaging_orders_used AS used, p.messaging_order_limit AS stored_limit, s.status,
           COALESCE(
             CASE WHEN s.status = 'trial'
                  THEN COALESCE(s.trial_ends_at, s.current_period_end)
                  ELSE s.current_period_end
             END <= now(),
             FALSE) AS period_over
    FROM storefront.subscription s
    JOIN storefront.subscription_plan p ON p.id = s.plan_id
    WHERE s.id = $1
";

const READ_WEBSITE: &str = r"
    SELECT s.website_orders_used AS used, p.website_order_limit AS stored_limit, s.status,
           COALESCE(
             CASE WHEN s.status = 'trial'
                  THEN COALESCE(s.trial_ends_at, s.current_period_end)
                  ELSE s.current_period_end
             END <= now(),
             FALSE) AS period_over
    FROM storefront.subscription s
    JOIN storefront.subscription_plan p ON p.id = s.plan_id
    WHERE s.id = $1
";

/// SQLSTATEs after which the statement was rolled back and may be retried.
const TRANSIENT_SQLSTATES: &[&str] = &[
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "55P03", // lock_not_available
];

/// `PostgreSQL` quota ledger.
#[derive(Clone)]
pub struct PgQuotaLedger {
    pool: PgPool,
}

impl PgQuotaLedger {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Explain why the conditional update matched no row. Read only.
    async fn classify_miss(
        &self,
        subscription_id: SubscriptionId,
        channel: Channel,
    ) -> Result<LedgerOutcome, LedgerError> {
        let sql = match channel {
            Channel::Messaging => READ_MESSAGING,
            Channel::Website => READ_WEBSITE,
        };

        let row: Option<MissRow> = sqlx::query_as(sql)
            .bind(subscription_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify_error)?;

        let row = row.ok_or(LedgerError::UnknownSubscription(subscription_id))?;
        row.classify(subscription_id)
    }
}

/// State read back after the conditional update matched nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
struct MissRow {
    used: i32,
    stored_limit: Option<i32>,
    status: SubscriptionStatus,
    period_over: bool,
}

impl MissRow {
    /// Which guard of the update failed.
    fn classify(self, subscription_id: SubscriptionId) -> Result<LedgerOutcome, LedgerError> {
        if !self.status.is_live() {
            return Ok(LedgerOutcome::Rejected(QuotaRejection::NotEntitled {
                status: self.status,
            }));
        }
        if self.period_over {
            return Ok(LedgerOutcome::Rejected(QuotaRejection::NotEntitled {
                status: SubscriptionStatus::Expired,
            }));
        }

        let used = to_counter(self.used, subscription_id)?;
        match to_limit(self.stored_limit, subscription_id)? {
            ChannelLimit::Disabled => Ok(LedgerOutcome::Rejected(QuotaRejection::ChannelDisabled)),
            ChannelLimit::Limited(cap) => Ok(LedgerOutcome::Rejected(
                QuotaRejection::QuotaExhausted {
                    used,
                    cap: cap.get(),
                },
            )),
            // The plan changed between the update and this read.
            ChannelLimit::Unlimited => Err(LedgerError::Transient(format!(
                "limit of subscription {subscription_id} changed during admission"
            ))),
        }
    }
}

#[async_trait]
impl QuotaLedger for PgQuotaLedger {
    #[instrument(skip(self), fields(%subscription_id, %channel))]
    async fn try_admit(
        &self,
        subscription_id: SubscriptionId,
        channel: Channel,
    ) -> Result<LedgerOutcome, LedgerError> {
        let sql = match channel {
            Channel::Messaging => ADMIT_MESSAGING,
            Channel::Website => ADMIT_WEBSITE,
        };

        let updated: Option<(i32, Option<i32>)> = sqlx::query_as(sql)
            .bind(subscription_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify_error)?;

        match updated {
            Some((used, stored_limit)) => {
                let used = to_counter(used, subscription_id)?;
                let limit = to_limit(stored_limit, subscription_id)?;
                debug!(used, %limit, "quota counter incremented");
                Ok(LedgerOutcome::Admitted { used, limit })
            }
            None => self.classify_miss(subscription_id, channel).await,
        }
    }

    #[instrument(skip(self), fields(%subscription_id))]
    async fn usage(&self, subscription_id: SubscriptionId) -> Result<ChannelUsage, LedgerError> {
        let row: Option<(i32, i32)> = sqlx::query_as(
            r"
            SELECT messaging_orders_used, website_orders_used
            FROM storefront.subscription
            WHERE id = $1
            ",
        )
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify_error)?;

        let (messaging, website) =
            row.ok_or(LedgerError::UnknownSubscription(subscription_id))?;
        ChannelUsage::from_stored(i64::from(messaging), i64::from(website)).map_err(|e| {
            LedgerError::Repository(RepositoryError::DataCorruption(format!(
                "subscription {subscription_id}: {e}"
            )))
        })
    }
}

/// Map sqlx errors, separating rolled-back conflicts from everything else.
fn classify_error(err: sqlx::Error) -> LedgerError {
    match &err {
        sqlx::Error::Database(db_err)
            if db_err
                .code()
                .is_some_and(|code| TRANSIENT_SQLSTATES.contains(&code.as_ref())) =>
        {
            warn!(error = %err, "quota update conflicted");
            LedgerError::Transient(err.to_string())
        }
        sqlx::Error::PoolTimedOut => LedgerError::Transient(err.to_string()),
        _ => LedgerError::Repository(RepositoryError::Database(err)),
    }
}

fn to_counter(used: i32, subscription_id: SubscriptionId) -> Result<u32, LedgerError> {
    u32::try_from(used).map_err(|_| {
        LedgerError::Repository(RepositoryError::DataCorruption(format!(
            "subscription {subscription_id} has negative usage counter {used}"
        )))
    })
}

fn to_limit(
    stored: Option<i32>,
    subscription_id: SubscriptionId,
) -> Result<ChannelLimit, LedgerError> {
    ChannelLimit::from_stored(stored.map(i64::from)).map_err(|e| {
        LedgerError::Repository(RepositoryError::DataCorruption(format!(
            "plan of subscription {subscription_id}: {e}"
        )))
    })
}
