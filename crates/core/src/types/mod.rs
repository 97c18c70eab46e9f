//! Core types for Shopkeep.
//!
//! This module provides type-safe wrappers for the tenant and admission domain.

pub mod admission;
pub mod channel;
pub mod id;
pub mod limit;
pub mod order;
pub mod price;
pub mod status;
pub mod store;

pub use admission::{Admission, Rejection};
pub use channel::{Channel, PaymentMethod, PaymentMethodError};
pub use id::*;
pub use limit::{ChannelLimit, ChannelUsage, LimitError, PlanLimits};
pub use order::NewOrder;
pub use price::{CurrencyCode, Price};
pub use status::*;
pub use store::{IdentityField, Store};
