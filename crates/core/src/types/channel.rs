//! Order intake channels and the payment methods that select them.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the two order-intake paths a plan meters separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Cash-on-delivery orders handed off through a messaging deep-link.
    Messaging,
    /// Orders paid online through a payment gateway.
    Website,
}

impl Channel {
    /// Both channels, in a fixed order.
    pub const ALL: [Self; 2] = [Self::Messaging, Self::Website];

    /// The channel an order paid with `method` is counted against.
    #[must_use]
    pub const fn for_payment(method: &PaymentMethod) -> Self {
        match method {
            PaymentMethod::CashOnDelivery => Self::Messaging,
            PaymentMethod::Online(_) => Self::Website,
        }
    }

    /// The other channel.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Messaging => Self::Website,
            Self::Website => Self::Messaging,
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Messaging => "messaging",
            Self::Website => "website",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur when parsing a [`PaymentMethod`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentMethodError {
    /// The input string is empty.
    #[error("payment method cannot be empty")]
    Empty,
    /// The gateway identifier contains characters outside `[a-z0-9_-]`.
    #[error("invalid payment gateway identifier: {0}")]
    InvalidGateway(String),
}

/// Payment method chosen at checkout.
///
/// Anything other than cash-on-delivery is an online gateway; the gateway
/// identifier is kept only so the caller can route payment initiation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    CashOnDelivery,
    Online(String),
}

impl PaymentMethod {
    /// Parse the checkout form value.
    ///
    /// `cod`, `cash_on_delivery` and `cash-on-delivery` (any case) select
    /// cash-on-delivery; any other identifier is an online gateway.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentMethodError`] for empty input or a malformed gateway id.
    pub fn parse(value: &str) -> Result<Self, PaymentMethodError> {
        let trimmed = value.trim().to_ascii_lowercase();
        if trimmed.is_empty() {
            return Err(PaymentMethodError::Empty);
        }

        match trimmed.as_str() {
            "cod" | "cash_on_delivery" | "cash-on-delivery" => Ok(Self::CashOnDelivery),
            gateway => {
                if gateway
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
                {
                    Ok(Self::Online(gateway.to_owned()))
                } else {
                    Err(PaymentMethodError::InvalidGateway(value.to_owned()))
                }
            }
        }
    }

    /// The channel this payment method is metered against.
    #[must_use]
    pub const fn channel(&self) -> Channel {
        Channel::for_payment(self)
    }
}

impl FromStr for PaymentMethod {
    type Err = PaymentMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CashOnDelivery => f.write_str("cod"),
            Self::Online(gateway) => f.write_str(gateway),
        }
    }
}

impl Serialize for PaymentMethod {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PaymentMethod {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
