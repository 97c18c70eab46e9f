//! Per-channel order quotas.
//!
//! The ledger owns the usage counters and exposes a single primitive,
//! [`QuotaLedger::try_admit`], which compares the counter with the plan limit
//! and increments it as one indivisible step. No caller reads a counter,
//! compares it, and writes it back; two checkouts racing for the last slot
//! get exactly one admission.
//!
//! | Limit | Result |
//! |-------|--------|
//! | disabled | `ChannelDisabled`, counter untouched |
//! | unlimited | admitted, counter incremented |
//! | cap `n` | admitted iff `used < n`, else `QuotaExhausted` |
//!
//! A subscription that is no longer live (cancelled, or past its period end)
//! is refused with `NotEntitled` whatever the limit.

pub mod postgres;
pub mod retry;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use shopkeep_core::{Channel, ChannelLimit, ChannelUsage, SubscriptionId, SubscriptionStatus};

use crate::db::RepositoryError;

pub use postgres::PgQuotaLedger;
pub use retry::RetryPolicy;

/// Result of one `try_admit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LedgerOutcome {
    /// The counter was incremented; `used` is the new value.
    Admitted { used: u32, limit: ChannelLimit },
    /// Nothing was written.
    Rejected(QuotaRejection),
}

/// Why the ledger refused an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum QuotaRejection {
    ChannelDisabled,
    QuotaExhausted { used: u32, cap: u32 },
    /// The subscription was cancelled or its period ended after the gate
    /// checked it. `status` is `Cancelled` or `Expired`.
    NotEntitled { status: SubscriptionStatus },
}

/// Errors from the ledger backend.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The update was rolled back by the backend (serialization failure,
    /// deadlock, lock timeout, pool exhaustion). Safe to retry.
    #[error("transient ledger conflict: {0}")]
    Transient(String),

    /// No subscription row with this id.
    #[error("unknown subscription {0}")]
    UnknownSubscription(SubscriptionId),

    /// Any other backend failure. Not retried: the update may have committed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl LedgerError {
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Atomic check-and-increment over per-channel usage counters.
#[async_trait]
pub trait QuotaLedger: Send + Sync {
    /// Admit one order on `channel` for `subscription_id` if its plan allows
    /// it, incrementing the channel counter in the same atomic step.
    ///
    /// Rejections never modify the counter.
    async fn try_admit(
        &self,
        subscription_id: SubscriptionId,
        channel: Channel,
    ) -> Result<LedgerOutcome, LedgerError>;

    /// Current counters, read only.
    async fn usage(&self, subscription_id: SubscriptionId) -> Result<ChannelUsage, LedgerError>;
}
