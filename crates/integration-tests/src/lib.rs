//! Integration tests for Shopkeep.
//!
//! The tests drive the public API of `shopkeep-storefront` (admission gate
//! and axum router) against the in-memory backend, so apart from the ignored
//! `postgres_ledger` tests they need no database:
//!
//! ```bash
//! cargo test -p shopkeep-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `admission_scenarios` - end-to-end admission decisions
//! - `concurrency` - no over-admission under parallel checkouts
//! - `http_api` - the tenant API through the router
//! - `postgres_ledger` - the `PostgreSQL` ledger (run with `--ignored`, needs `DATABASE_URL`)

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Duration, Utc};

use shopkeep_core::{
    ChannelLimit, ChannelUsage, PlanId, PlanLimits, Store, StoreId, SubscriptionId,
    SubscriptionStatus,
};
use shopkeep_storefront::AdmissionGate;
use shopkeep_storefront::db::MemoryBackend;
use shopkeep_storefront::quota::RetryPolicy;
use shopkeep_storefront::routes;
use shopkeep_storefront::state::AppState;
use shopkeep_storefront::subscription::SubscriptionRecord;
use shopkeep_storefront::tenant::{DomainResolver, TenantDirectory};

/// Platform domain used by every fixture.
pub const PLATFORM_DOMAIN: &str = "shopkeep.in";

/// An in-memory platform with helpers to seed stores and subscriptions.
#[derive(Clone, Default)]
pub struct TestPlatform {
    pub backend: MemoryBackend,
}

impl TestPlatform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an active store reachable by slug and subdomain `slug`.
    pub fn add_store(&self, id: i64, slug: &str, custom_domain: Option<&str>) -> StoreId {
        let now = Utc::now();
        let store_id = StoreId::new(id);
        self.backend.insert_store(Store {
            id: store_id,
            slug: slug.to_string(),
            subdomain: Some(slug.to_string()),
            custom_domain: custom_domain.map(str::to_string),
            active: true,
            created_at: now,
            updated_at: now,
        });
        store_id
    }

    /// Seed an active subscription ending 30 days from now.
    pub fn add_subscription(
        &self,
        id: i64,
        store_id: StoreId,
        limits: PlanLimits,
        usage: ChannelUsage,
    ) -> SubscriptionId {
        self.add_subscription_with(SubscriptionRecord {
            id: SubscriptionId::new(id),
            store_id,
            plan_id: PlanId::new(1),
            status: SubscriptionStatus::Active,
            trial_ends_at: None,
            current_period_end: Some(Utc::now() + Duration::days(30)),
            limits,
            usage,
            updated_at: Utc::now(),
        })
    }

    /// Seed an arbitrary subscription row.
    pub fn add_subscription_with(&self, record: SubscriptionRecord) -> SubscriptionId {
        let id = record.id;
        self.backend.insert_subscription(record);
        id
    }

    /// The "acme" tenant: messaging capped at 3 with 2 used, website disabled.
    pub fn with_acme() -> (Self, SubscriptionId) {
        let platform = Self::new();
        let store_id = platform.add_store(1, "acme", Some("shop.acme.com"));
        let subscription_id = platform.add_subscription(
            100,
            store_id,
            PlanLimits::new(ChannelLimit::capped(3), ChannelLimit::Disabled),
            ChannelUsage::new(2, 0),
        );
        (platform, subscription_id)
    }

    #[must_use]
    pub fn resolver() -> DomainResolver {
        DomainResolver::new(PLATFORM_DOMAIN).with_aliases(["localhost"])
    }

    /// An admission gate over this platform that retries without sleeping.
    #[must_use]
    pub fn gate(&self) -> AdmissionGate {
        let shared = Arc::new(self.backend.clone());
        AdmissionGate::new(
            Self::resolver(),
            TenantDirectory::new(shared.clone()),
            shared.clone(),
            shared,
        )
        .with_retry_policy(RetryPolicy::immediate(3))
    }

    /// The full HTTP application over this platform.
    #[must_use]
    pub fn app(&self) -> Router {
        routes::router(AppState::in_memory(Self::resolver(), &self.backend))
    }
}

/// A timestamp `days` days from now.
#[must_use]
pub fn days_from_now(days: i64) -> DateTime<Utc> {
    Utc::now() + Duration::days(days)
}
