//! Shopkeep Core - Shared types library.
//!
//! This crate provides the domain types used across all Shopkeep components:
//! - `storefront` - Tenant resolution and order admission service
//! - `cli` - Command-line tools for migrations and inspection
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. Database encodings are behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, channels, tri-state limits, statuses, and
//!   admission outcomes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
