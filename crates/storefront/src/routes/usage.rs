//! Usage report endpoint.

use axum::{Json, extract::State};
use chrono::Utc;

use crate::admission::UsageReport;
use crate::error::Result;
use crate::middleware::RequireTenant;
use crate::state::AppState;

/// `GET /api/usage`
///
/// # Errors
///
/// Returns 404 for unknown tenants, 403 when the store has no subscription,
/// and 503 when the subscription rows cannot be read.
pub async fn show(
    State(state): State<AppState>,
    RequireTenant(store): RequireTenant,
) -> Result<Json<UsageReport>> {
    let report = state.gate().usage_report_for_store(&store, Utc::now()).await?;
    Ok(Json(report))
}
