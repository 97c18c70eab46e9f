//! In-memory backend.
//!
//! Implements every repository trait plus [`QuotaLedger`] over `DashMap`s so
//! the admission path can run without a database (tests, local demos). Usage
//! counters are `AtomicU32`s advanced with a compare-and-swap loop, which
//! gives the same no-over-admission guarantee as the conditional `UPDATE`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use shopkeep_core::{
    Channel, ChannelUsage, PlanLimits, Store, StoreId, SubscriptionId, SubscriptionStatus,
};

use super::RepositoryError;
use super::repo::{StoreRepository, SubscriptionRepository};
use crate::quota::{LedgerError, LedgerOutcome, QuotaLedger, QuotaRejection};
use crate::subscription::{SubscriptionRecord, effective_status};

#[derive(Debug, Default)]
struct Counters {
    messaging: AtomicU32,
    website: AtomicU32,
}

impl Counters {
    fn from_usage(usage: ChannelUsage) -> Self {
        Self {
            messaging: AtomicU32::new(usage.messaging),
            website: AtomicU32::new(usage.website),
        }
    }

    const fn for_channel(&self, channel: Channel) -> &AtomicU32 {
        match channel {
            Channel::Messaging => &self.messaging,
            Channel::Website => &self.website,
        }
    }

    fn snapshot(&self) -> ChannelUsage {
        ChannelUsage::new(
            self.messaging.load(Ordering::Acquire),
            self.website.load(Ordering::Acquire),
        )
    }
}

#[derive(Debug)]
struct Entry {
    record: SubscriptionRecord,
    counters: Arc<Counters>,
}

struct LedgerEntry {
    status: SubscriptionStatus,
    limits: PlanLimits,
    counters: Arc<Counters>,
}

/// In-memory stores, subscriptions and quota counters.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    stores: Arc<DashMap<StoreId, Store>>,
    subscriptions: Arc<DashMap<SubscriptionId, Entry>>,
    /// Number of upcoming `try_admit` calls that fail as transient conflicts.
    injected_conflicts: Arc<AtomicU32>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a store.
    pub fn insert_store(&self, store: Store) {
        self.stores.insert(store.id, store);
    }

    /// Apply `f` to a stored store. Returns `false` if there is no such store.
    pub fn update_store(&self, id: StoreId, f: impl FnOnce(&mut Store)) -> bool {
        self.stores.get_mut(&id).map(|mut store| f(&mut store)).is_some()
    }

    /// Insert or replace a subscription row. Counters start at `record.usage`.
    pub fn insert_subscription(&self, record: SubscriptionRecord) {
        let counters = Arc::new(Counters::from_usage(record.usage));
        self.subscriptions
            .insert(record.id, Entry { record, counters });
    }

    /// Apply `f` to a stored subscription row, keeping its counters.
    pub fn update_subscription(
        &self,
        id: SubscriptionId,
        f: impl FnOnce(&mut SubscriptionRecord),
    ) -> bool {
        self.subscriptions
            .get_mut(&id)
            .map(|mut entry| f(&mut entry.record))
            .is_some()
    }

    /// Make the next `n` admissions fail with [`LedgerError::Transient`].
    pub fn fail_next_admissions(&self, n: u32) {
        self.injected_conflicts.store(n, Ordering::Release);
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    fn ledger_entry(&self, id: SubscriptionId) -> Result<LedgerEntry, LedgerError> {
        // Clone out of the shard guard before touching the atomics.
        self.subscriptions
            .get(&id)
            .map(|entry| LedgerEntry {
                status: effective_status(&entry.record, Utc::now()),
                limits: entry.record.limits,
                counters: Arc::clone(&entry.counters),
            })
            .ok_or(LedgerError::UnknownSubscription(id))
    }
}

#[async_trait]
impl StoreRepository for MemoryBackend {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Store>, RepositoryError> {
        Ok(self
            .stores
            .iter()
            .filter_map(|store| {
                store
                    .matched_field(identifier)
                    .map(|field| (field, store.id, store.value().clone()))
            })
            .min_by_key(|(field, id, _)| (*field, *id))
            .map(|(_, _, store)| store))
    }
}

#[async_trait]
impl SubscriptionRepository for MemoryBackend {
    async fn list_for_store(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<SubscriptionRecord>, RepositoryError> {
        Ok(self
            .subscriptions
            .iter()
            .filter(|entry| entry.record.store_id == store_id)
            .map(|entry| SubscriptionRecord {
                usage: entry.counters.snapshot(),
                ..entry.record.clone()
            })
            .collect())
    }
}

#[async_trait]
impl QuotaLedger for MemoryBackend {
    async fn try_admit(
        &self,
        subscription_id: SubscriptionId,
        channel: Channel,
    ) -> Result<LedgerOutcome, LedgerError> {
        if self.take_injected_conflict() {
            return Err(LedgerError::Transient("injected conflict".to_string()));
        }

        let LedgerEntry {
            status,
            limits,
            counters,
        } = self.ledger_entry(subscription_id)?;
        if !status.is_entitled() {
            return Ok(LedgerOutcome::Rejected(QuotaRejection::NotEntitled { status }));
        }

        let limit = limits.for_channel(channel);
        if !limit.is_enabled() {
            return Ok(LedgerOutcome::Rejected(QuotaRejection::ChannelDisabled));
        }

        let counter = counters.for_channel(channel);
        let result = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
            if limit.admits(used) {
                used.checked_add(1)
            } else {
                None
            }
        });

        match result {
            Ok(previous) => Ok(LedgerOutcome::Admitted {
                used: previous + 1,
                limit,
            }),
            Err(used) => Ok(LedgerOutcome::Rejected(QuotaRejection::QuotaExhausted {
                used,
                cap: limit.cap().unwrap_or(u32::MAX),
            })),
        }
    }

    async fn usage(&self, subscription_id: SubscriptionId) -> Result<ChannelUsage, LedgerError> {
        Ok(self.ledger_entry(subscription_id)?.counters.snapshot())
    }
}
