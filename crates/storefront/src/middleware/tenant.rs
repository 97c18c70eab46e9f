//! Tenant resolution middleware and extractors.
//!
//! Every request is resolved from its `Host` header and path before it
//! reaches a handler. The result is stored as a [`TenantContext`] request
//! extension; handlers pull the store out with [`RequireTenant`].

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::{Span, debug};

use shopkeep_core::{Rejection, Store};

use crate::error::{AppError, set_sentry_tenant};
use crate::state::AppState;
use crate::tenant::TenantRequest;

/// Outcome of resolving the current request.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub request: TenantRequest,
    /// The first active store among the request's candidates.
    pub store: Option<Store>,
}

/// Middleware that resolves the tenant for every request.
///
/// Platform requests and unknown tenants pass through with `store: None`;
/// handlers decide whether that is an error. A failing store lookup is
/// answered with 503 without running the handler.
///
/// # Errors
///
/// Returns [`AppError`] when the store lookup fails.
pub async fn tenant_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| request.uri().host())
        .unwrap_or_default()
        .to_string();

    let tenant_request = state.resolver().resolve(&host, request.uri().path());
    let store = state
        .directory()
        .resolve_request(&tenant_request)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, %host, "tenant lookup failed");
            AppError::Rejected(Rejection::TransientConflict)
        })?;

    match &store {
        Some(store) => {
            Span::current().record("store_id", store.id.as_i64());
            set_sentry_tenant(store.id, &store.slug);
            debug!(store_id = %store.id, slug = %store.slug, "tenant resolved");
        }
        None if !tenant_request.is_platform() => {
            debug!(%host, path = request.uri().path(), "no active store for request");
        }
        None => {}
    }

    request.extensions_mut().insert(TenantContext {
        request: tenant_request,
        store,
    });

    Ok(next.run(request).await)
}

/// Extractor that requires a resolved, active store.
///
/// Rejects with `StoreNotFound` (404) otherwise.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireTenant(store): RequireTenant) -> String {
///     store.slug
/// }
/// ```
pub struct RequireTenant(pub Store);

impl<S> FromRequestParts<S> for RequireTenant
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .and_then(|ctx| ctx.store.clone())
            .map(Self)
            .ok_or(AppError::Rejected(Rejection::StoreNotFound))
    }
}

