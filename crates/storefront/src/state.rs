//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::admission::AdmissionGate;
use crate::config::{AdmissionConfig, TenancyConfig};
use crate::db::{MemoryBackend, PgStoreRepository, PgSubscriptionRepository};
use crate::quota::PgQuotaLedger;
use crate::tenant::{DomainResolver, TenantDirectory};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// admission gate and, when running against `PostgreSQL`, the pool.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: Option<PgPool>,
    gate: AdmissionGate,
}

impl AppState {
    /// Create state backed by `PostgreSQL`.
    #[must_use]
    pub fn new(tenancy: &TenancyConfig, admission: &AdmissionConfig, pool: PgPool) -> Self {
        let directory = TenantDirectory::with_cache(
            Arc::new(PgStoreRepository::new(pool.clone())),
            tenancy.cache_ttl,
            tenancy.cache_capacity,
        );
        let gate = AdmissionGate::new(
            tenancy.resolver(),
            directory,
            Arc::new(PgSubscriptionRepository::new(pool.clone())),
            Arc::new(PgQuotaLedger::new(pool.clone())),
        )
        .with_retry_policy(admission.retry_policy());

        Self::from_gate(gate, Some(pool))
    }

    /// Create state backed by an in-memory backend (tests, local demos).
    #[must_use]
    pub fn in_memory(resolver: DomainResolver, backend: &MemoryBackend) -> Self {
        let shared = Arc::new(backend.clone());
        let gate = AdmissionGate::new(
            resolver,
            TenantDirectory::new(shared.clone()),
            shared.clone(),
            shared,
        );
        Self::from_gate(gate, None)
    }

    /// Wrap an already assembled gate.
    #[must_use]
    pub fn from_gate(gate: AdmissionGate, pool: Option<PgPool>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { pool, gate }),
        }
    }

    /// The database pool, when running against `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn gate(&self) -> &AdmissionGate {
        &self.inner.gate
    }

    #[must_use]
    pub fn resolver(&self) -> &DomainResolver {
        self.inner.gate.resolver()
    }

    #[must_use]
    pub fn directory(&self) -> &TenantDirectory {
        self.inner.gate.directory()
    }
}
