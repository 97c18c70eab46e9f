//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (database ping)
//!
//! # Tenant API (tenant from Host header)
//! GET  /api/tenant                  - Resolved tenant
//! GET  /api/usage                   - Subscription status and channel usage
//! POST /api/checkout/admit          - Admit one order
//!
//! # Tenant API (path-slug tenants on the platform domain)
//! GET  /{slug}/api/tenant
//! GET  /{slug}/api/usage
//! POST /{slug}/api/checkout/admit
//! ```

pub mod checkout;
pub mod health;
pub mod tenant;
pub mod usage;

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::field::Empty;

use crate::middleware::{request_id_middleware, tenant_middleware};
use crate::state::AppState;

/// Create the tenant API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/tenant", get(tenant::show))
        .route("/usage", get(usage::show))
        .route("/checkout/admit", post(checkout::admit))
}

/// Tenant API routes, for host-addressed and path-slug tenants.
pub fn tenant_routes() -> Router<AppState> {
    Router::new()
        .nest("/api", api_routes())
        .nest("/{slug}/api", api_routes())
}

/// Health checks. Served without tenant resolution, so a check addressed to
/// a pod IP never touches the store table.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
}

/// The full application: routes, tenant resolution, request IDs and tracing.
///
/// Sentry layers are added by the binary so tests can build the router
/// without a Sentry client.
pub fn router(state: AppState) -> Router {
    let tenant = tenant_routes().layer(axum_middleware::from_fn_with_state(
        state.clone(),
        tenant_middleware,
    ));

    health_routes()
        .merge(tenant)
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = Empty,
                    store_id = Empty,
                )
            }),
        )
        .with_state(state)
}
