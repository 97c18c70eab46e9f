//! Identifier to store lookup with a short-lived cache.
//!
//! Only active stores are cached, so deactivating a store takes effect on the
//! next lookup after [`TenantDirectory::invalidate_store`] (or after the TTL).
//! Misses are never cached.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use shopkeep_core::Store;

use super::resolver::TenantRequest;
use crate::db::{RepositoryError, StoreRepository};

/// Default cache time-to-live.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Default maximum number of cached identifiers.
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Errors from directory lookups.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No active store has this identifier.
    #[error("no active store for identifier")]
    NotFound,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Resolves tenant identifiers to active stores.
#[derive(Clone)]
pub struct TenantDirectory {
    inner: Arc<TenantDirectoryInner>,
}

struct TenantDirectoryInner {
    repo: Arc<dyn StoreRepository>,
    cache: Cache<String, Store>,
}

impl TenantDirectory {
    /// Create a directory with the default cache settings.
    #[must_use]
    pub fn new(repo: Arc<dyn StoreRepository>) -> Self {
        Self::with_cache(repo, DEFAULT_CACHE_TTL, DEFAULT_CACHE_CAPACITY)
    }

    /// Create a directory with an explicit cache TTL and capacity.
    #[must_use]
    pub fn with_cache(repo: Arc<dyn StoreRepository>, ttl: Duration, capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .support_invalidation_closures()
            .build();

        Self {
            inner: Arc::new(TenantDirectoryInner { repo, cache }),
        }
    }

    /// Resolve one identifier (custom domain, subdomain, or slug).
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NotFound`] when no store matches or the
    /// matching store is inactive, and [`DirectoryError::Repository`] when the
    /// backing store fails.
    #[instrument(skip(self))]
    pub async fn resolve(&self, identifier: &str) -> Result<Store, DirectoryError> {
        let key = identifier.trim().to_ascii_lowercase();
        if key.is_empty() {
            return Err(DirectoryError::NotFound);
        }

        if let Some(store) = self.inner.cache.get(&key).await {
            debug!(store_id = %store.id, "tenant cache hit");
            return Ok(store);
        }

        match self.inner.repo.find_by_identifier(&key).await? {
            Some(store) if store.active => {
                self.inner.cache.insert(key, store.clone()).await;
                Ok(store)
            }
            Some(store) => {
                debug!(store_id = %store.id, "store is inactive");
                Err(DirectoryError::NotFound)
            }
            None => Err(DirectoryError::NotFound),
        }
    }

    /// Walk the request's candidates in order and return the first active
    /// store. `Ok(None)` for platform requests and when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Repository`] if a lookup fails.
    pub async fn resolve_request(
        &self,
        request: &TenantRequest,
    ) -> Result<Option<Store>, DirectoryError> {
        for key in request.candidates() {
            match self.resolve(key.identifier()).await {
                Ok(store) => return Ok(Some(store)),
                Err(DirectoryError::NotFound) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Drop every cached identifier that points at `store`, and every
    /// identifier `store` now answers to.
    ///
    /// Pass the store as it is after the change. Call after a store's domain
    /// fields or active flag change: an identifier the store has just taken
    /// over may still be cached for the store that used to win it.
    pub async fn invalidate_store(&self, store: &Store) {
        let store_id = store.id;
        let identifiers = store.identifiers();
        let predicate = self.inner.cache.invalidate_entries_if(move |key, cached| {
            cached.id == store_id || identifiers.iter().any(|i| i == key)
        });
        if let Err(e) = predicate {
            warn!(%store_id, error = %e, "targeted invalidation failed, clearing tenant cache");
            self.inner.cache.invalidate_all();
        }
        self.inner.cache.run_pending_tasks().await;
    }

    /// Drop one cached identifier.
    pub async fn invalidate_identifier(&self, identifier: &str) {
        let key = identifier.trim().to_ascii_lowercase();
        self.inner.cache.invalidate(&key).await;
    }

    /// Clear the whole cache.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}
