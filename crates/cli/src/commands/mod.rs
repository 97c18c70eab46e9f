//! CLI subcommands.

pub mod migrate;
pub mod resolve;
pub mod usage;

use shopkeep_core::Rejection;
use shopkeep_storefront::config::ConfigError;
use shopkeep_storefront::tenant::DirectoryError;

/// Errors surfaced by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Lookup failed: {0}")]
    Directory(#[from] DirectoryError),

    #[error("{}", .0.user_message())]
    Rejected(#[from] Rejection),

    #[error("Output error: {0}")]
    Json(#[from] serde_json::Error),
}
