//! Resolved tenant endpoint.

use axum::{Extension, Json};
use serde::Serialize;

use shopkeep_core::{IdentityField, StoreId};

use crate::error::Result;
use crate::middleware::{RequireTenant, TenantContext};

/// The tenant a request resolved to.
#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub store_id: StoreId,
    pub slug: String,
    pub subdomain: Option<String>,
    pub custom_domain: Option<String>,
    /// Which identity field the request matched.
    pub matched_by: Option<IdentityField>,
}

/// `GET /api/tenant`
///
/// # Errors
///
/// Returns 404 when the request does not resolve to an active store.
pub async fn show(
    RequireTenant(store): RequireTenant,
    Extension(context): Extension<TenantContext>,
) -> Result<Json<TenantResponse>> {
    let matched_by = context
        .request
        .candidates()
        .iter()
        .find_map(|key| store.matched_field(key.identifier()));

    Ok(Json(TenantResponse {
        store_id: store.id,
        slug: store.slug,
        subdomain: store.subdomain,
        custom_domain: store.custom_domain,
        matched_by,
    }))
}
