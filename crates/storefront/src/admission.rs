//! Order admission gate.
//!
//! Composes tenant resolution, subscription derivation and the quota ledger
//! into one decision per incoming order:
//!
//! 1. Resolve the tenant. Unknown or inactive: `StoreNotFound`.
//! 2. Derive the current subscription. None: `NoSubscription`; expired:
//!    `SubscriptionExpired`; cancelled: `SubscriptionInactive`.
//! 3. Map the payment method to a channel.
//! 4. `try_admit` on the ledger, retrying transient conflicts.
//!
//! An admitted order has already been counted when this returns; a rejected
//! one has touched nothing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use shopkeep_core::{
    Admission, Channel, ChannelLimit, PaymentMethod, Rejection, Store, StoreId, SubscriptionId,
    SubscriptionStatus,
};

use crate::db::SubscriptionRepository;
use crate::quota::{LedgerOutcome, QuotaLedger, QuotaRejection, RetryPolicy};
use crate::subscription::{self, SubscriptionSnapshot};
use crate::tenant::{DirectoryError, DomainResolver, TenantDirectory};

/// Read-only view of a tenant's subscription and usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageReport {
    pub store_id: StoreId,
    pub slug: String,
    pub subscription_id: SubscriptionId,
    pub status: SubscriptionStatus,
    pub stored_status: SubscriptionStatus,
    pub period_end: Option<DateTime<Utc>>,
    pub channels: Vec<ChannelReport>,
}

/// Usage of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelReport {
    pub channel: Channel,
    pub limit: ChannelLimit,
    pub used: u32,
    /// `None` when the channel is unlimited or disabled.
    pub remaining: Option<u32>,
    /// Whether one more order would be admitted right now.
    pub available: bool,
}

/// Decides whether an order may be placed and counts it if so.
pub struct AdmissionGate {
    resolver: DomainResolver,
    directory: TenantDirectory,
    subscriptions: Arc<dyn SubscriptionRepository>,
    ledger: Arc<dyn QuotaLedger>,
    retry: RetryPolicy,
}

impl AdmissionGate {
    #[must_use]
    pub fn new(
        resolver: DomainResolver,
        directory: TenantDirectory,
        subscriptions: Arc<dyn SubscriptionRepository>,
        ledger: Arc<dyn QuotaLedger>,
    ) -> Self {
        Self {
            resolver,
            directory,
            subscriptions,
            ledger,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub const fn resolver(&self) -> &DomainResolver {
        &self.resolver
    }

    #[must_use]
    pub const fn directory(&self) -> &TenantDirectory {
        &self.directory
    }

    /// Admit one order for the tenant named by `identifier` (custom domain,
    /// subdomain, or slug).
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] explaining why the order was not admitted.
    pub async fn admit_order(
        &self,
        identifier: &str,
        method: &PaymentMethod,
    ) -> Result<Admission, Rejection> {
        self.admit_order_at(identifier, method, Utc::now()).await
    }

    /// [`admit_order`](Self::admit_order) with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] explaining why the order was not admitted.
    pub async fn admit_order_at(
        &self,
        identifier: &str,
        method: &PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<Admission, Rejection> {
        let store = self.find_store(identifier).await?;
        self.admit_for_store(store, method, now).await
    }

    /// Admit one order for the tenant addressed by a request host and path.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] explaining why the order was not admitted.
    pub async fn admit_request(
        &self,
        host: &str,
        path: &str,
        method: &PaymentMethod,
    ) -> Result<Admission, Rejection> {
        let request = self.resolver.resolve(host, path);
        let store = self
            .directory
            .resolve_request(&request)
            .await
            .map_err(|e| lookup_failed(&e))?
            .ok_or(Rejection::StoreNotFound)?;
        self.admit_for_store(store, method, Utc::now()).await
    }

    /// Admit one order for an already resolved store.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] explaining why the order was not admitted.
    #[instrument(
        skip(self, store, method),
        fields(store_id = %store.id, channel = %method.channel())
    )]
    pub async fn admit_for_store(
        &self,
        store: Store,
        method: &PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<Admission, Rejection> {
        let snapshot = self.entitled_snapshot(store.id, now).await?;
        let channel = method.channel();

        match self.try_admit(snapshot.subscription_id, channel).await? {
            LedgerOutcome::Admitted { used, limit } => {
                info!(subscription_id = %snapshot.subscription_id, used, %limit, "order admitted");
                Ok(Admission {
                    store,
                    subscription_id: snapshot.subscription_id,
                    channel,
                    used,
                    limit,
                })
            }
            LedgerOutcome::Rejected(QuotaRejection::ChannelDisabled) => {
                debug!("channel disabled on plan");
                Err(Rejection::ChannelDisabled {
                    channel,
                    alternative: alternative(&snapshot, channel),
                })
            }
            LedgerOutcome::Rejected(QuotaRejection::NotEntitled { status }) => {
                info!(%status, "subscription lapsed during admission");
                Err(match status {
                    SubscriptionStatus::Expired => Rejection::SubscriptionExpired {
                        expired_at: snapshot.period_end,
                    },
                    _ => Rejection::SubscriptionInactive,
                })
            }
            LedgerOutcome::Rejected(QuotaRejection::QuotaExhausted { used, cap }) => {
                info!(used, cap, "channel quota exhausted");
                Err(Rejection::QuotaExhausted {
                    channel,
                    used,
                    cap,
                    alternative: alternative(&snapshot, channel),
                })
            }
        }
    }

    /// Current status, limits and counters for a tenant. Read only.
    ///
    /// # Errors
    ///
    /// Returns `StoreNotFound`, `NoSubscription`, or `TransientConflict`.
    pub async fn usage_report(&self, identifier: &str) -> Result<UsageReport, Rejection> {
        let store = self.find_store(identifier).await?;
        self.usage_report_for_store(&store, Utc::now()).await
    }

    /// [`usage_report`](Self::usage_report) for an already resolved store.
    ///
    /// # Errors
    ///
    /// Returns `NoSubscription` or `TransientConflict`.
    #[instrument(skip(self, store), fields(store_id = %store.id))]
    pub async fn usage_report_for_store(
        &self,
        store: &Store,
        now: DateTime<Utc>,
    ) -> Result<UsageReport, Rejection> {
        let snapshot = self.snapshot(store.id, now).await?;

        let usage = match self.ledger.usage(snapshot.subscription_id).await {
            Ok(usage) => usage,
            Err(e) => {
                warn!(error = %e, "ledger read failed, reporting usage from subscription row");
                snapshot.usage
            }
        };

        let channels = Channel::ALL
            .iter()
            .map(|&channel| {
                let limit = snapshot.limits.for_channel(channel);
                let used = usage.for_channel(channel);
                ChannelReport {
                    channel,
                    limit,
                    used,
                    remaining: limit.remaining(used),
                    available: snapshot.is_entitled() && limit.admits(used),
                }
            })
            .collect();

        Ok(UsageReport {
            store_id: store.id,
            slug: store.slug.clone(),
            subscription_id: snapshot.subscription_id,
            status: snapshot.status,
            stored_status: snapshot.stored_status,
            period_end: snapshot.period_end,
            channels,
        })
    }

    async fn find_store(&self, identifier: &str) -> Result<Store, Rejection> {
        self.directory
            .resolve(identifier)
            .await
            .map_err(|e| lookup_failed(&e))
    }

    async fn snapshot(
        &self,
        store_id: StoreId,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionSnapshot, Rejection> {
        let rows = self
            .subscriptions
            .list_for_store(store_id)
            .await
            .map_err(|e| {
                error!(%store_id, error = %e, "failed to load subscriptions");
                Rejection::TransientConflict
            })?;

        subscription::derive(&rows, now).ok_or(Rejection::NoSubscription)
    }

    async fn entitled_snapshot(
        &self,
        store_id: StoreId,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionSnapshot, Rejection> {
        let snapshot = self.snapshot(store_id, now).await?;
        match snapshot.status {
            SubscriptionStatus::Trial | SubscriptionStatus::Active => Ok(snapshot),
            SubscriptionStatus::Expired => {
                debug!(subscription_id = %snapshot.subscription_id, "subscription expired");
                Err(Rejection::SubscriptionExpired {
                    expired_at: snapshot.period_end,
                })
            }
            SubscriptionStatus::Cancelled => Err(Rejection::SubscriptionInactive),
        }
    }

    /// `try_admit` with bounded retry of transient conflicts.
    async fn try_admit(
        &self,
        subscription_id: SubscriptionId,
        channel: Channel,
    ) -> Result<LedgerOutcome, Rejection> {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 1;

        loop {
            match self.ledger.try_admit(subscription_id, channel).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.jittered_backoff(attempt);
                    warn!(attempt, ?delay, error = %e, "ledger conflict, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_transient() => {
                    warn!(attempt, error = %e, "ledger conflict, giving up");
                    return Err(Rejection::TransientConflict);
                }
                Err(e) => {
                    error!(%subscription_id, error = %e, "ledger update failed");
                    return Err(Rejection::TransientConflict);
                }
            }
        }
    }
}

fn lookup_failed(err: &DirectoryError) -> Rejection {
    match err {
        DirectoryError::NotFound => Rejection::StoreNotFound,
        DirectoryError::Repository(e) => {
            error!(error = %e, "tenant lookup failed");
            Rejection::TransientConflict
        }
    }
}

/// The other channel, if the snapshot says it would take an order.
fn alternative(snapshot: &SubscriptionSnapshot, channel: Channel) -> Option<Channel> {
    let other = channel.other();
    snapshot.channel_available(other).then_some(other)
}
