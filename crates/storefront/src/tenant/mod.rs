//! Tenant resolution: request to candidate identifiers to store.

pub mod directory;
pub mod resolver;

pub use directory::{DirectoryError, TenantDirectory};
pub use resolver::{DomainResolver, TenantKey, TenantRequest, normalize_host};
