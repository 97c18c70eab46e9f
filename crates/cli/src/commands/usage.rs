//! Usage inspection.
//!
//! Read only: useful after a checkout timed out, to see whether the order
//! was counted before retrying it.

use shopkeep_storefront::config::{AdmissionConfig, TenancyConfig, get_database_url};
use shopkeep_storefront::db::create_pool;
use shopkeep_storefront::state::AppState;

use super::CliError;

/// Print the usage report for `identifier` as JSON.
///
/// # Errors
///
/// Returns an error if configuration is missing, the tenant is unknown or has
/// no subscription, or the database is unreachable.
pub async fn run(identifier: &str) -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    let tenancy = TenancyConfig::from_env()?;
    let pool = create_pool(&get_database_url("STOREFRONT_DATABASE_URL")?).await?;

    let state = AppState::new(&tenancy, &AdmissionConfig::default(), pool);
    let report = state.gate().usage_report(identifier).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
