//! Host/path resolution debugging.

use std::sync::Arc;

use shopkeep_storefront::config::{TenancyConfig, get_database_url};
use shopkeep_storefront::db::{PgStoreRepository, create_pool};
use shopkeep_storefront::tenant::{TenantDirectory, TenantRequest};

use super::CliError;

/// Print the candidates for `host` + `path`, and optionally the store they
/// resolve to.
///
/// # Errors
///
/// Returns an error if configuration is missing or the lookup fails.
pub async fn run(host: &str, path: &str, lookup: bool) -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    let tenancy = TenancyConfig::from_env()?;
    let request = tenancy.resolver().resolve(host, path);

    #[allow(clippy::print_stdout)]
    {
        match &request {
            TenantRequest::Platform => println!("platform request (no tenant)"),
            TenantRequest::Tenant(candidates) => {
                println!("candidates, in order:");
                for key in candidates {
                    println!("  {:?}: {}", key.field, key.identifier());
                }
            }
        }
    }

    if !lookup || request.is_platform() {
        return Ok(());
    }

    let pool = create_pool(&get_database_url("STOREFRONT_DATABASE_URL")?).await?;
    let directory = TenantDirectory::new(Arc::new(PgStoreRepository::new(pool)));
    let store = directory.resolve_request(&request).await?;

    #[allow(clippy::print_stdout)]
    match store {
        Some(store) => println!("{}", serde_json::to_string_pretty(&store)?),
        None => println!("no active store matches"),
    }
    Ok(())
}
