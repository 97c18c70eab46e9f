//! Shopkeep storefront library.
//!
//! Tenant resolution and order admission for multi-tenant storefronts:
//!
//! - [`tenant`]: request host/path to store
//! - [`subscription`]: current subscription and derived expiry
//! - [`quota`]: atomic per-channel order counters
//! - [`admission`]: the gate composing all of the above
//!
//! plus the axum HTTP surface in [`routes`]. The crate is a library so the
//! binary, the CLI and the integration tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod admission;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod quota;
pub mod routes;
pub mod state;
pub mod subscription;
pub mod tenant;

pub use admission::{AdmissionGate, ChannelReport, UsageReport};
