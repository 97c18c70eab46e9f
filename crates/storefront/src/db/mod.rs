//! Database access for tenant resolution and order admission.
//!
//! # Database: `shopkeep`
//!
//! The storefront only reads tenant and billing data; the one write it
//! performs is the quota counter increment (see [`crate::quota`]).
//!
//! ## Tables
//!
//! - `storefront.store` - Tenants and their slug/subdomain/custom domain
//! - `storefront.subscription_plan` - Per-channel order limits
//! - `storefront.subscription` - Subscription rows with usage counters
//!
//! # Backends
//!
//! - [`stores::PgStoreRepository`], [`subscriptions::PgSubscriptionRepository`]
//!   for `PostgreSQL`
//! - [`memory::MemoryBackend`] for tests and local development
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p shopkeep-cli -- migrate
//! ```

pub mod memory;
pub mod repo;
pub mod stores;
pub mod subscriptions;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use memory::MemoryBackend;
pub use repo::{StoreRepository, SubscriptionRepository};
pub use stores::PgStoreRepository;
pub use subscriptions::PgSubscriptionRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url.expose_secret())
        .await
}
