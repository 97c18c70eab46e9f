//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Tenant resolution (`Host` + path to store)

pub mod request_id;
pub mod tenant;

pub use request_id::request_id_middleware;
pub use tenant::{RequireTenant, TenantContext, tenant_middleware};
