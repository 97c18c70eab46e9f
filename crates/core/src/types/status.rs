//! Subscription status.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a subscription row.
///
/// The stored value is only an input: entitlement is derived from the
/// selected row and its period end, see the storefront `subscription` module.
///
/// ```text
/// Trial ──upgrade──▶ Active
///   │                  │
///   └──trial end──▶ Expired ◀──period end──┘
///
/// any ──cancellation──▶ Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.subscription_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    /// Whether a subscription in this status may accept orders.
    #[must_use]
    pub const fn is_entitled(self) -> bool {
        matches!(self, Self::Trial | Self::Active)
    }

    /// Whether the row is still a candidate for the current subscription.
    #[must_use]
    pub const fn is_live(self) -> bool {
        self.is_entitled()
    }

    /// Whether an external billing event may move a row from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Trial, Self::Active | Self::Expired | Self::Cancelled)
                | (Self::Active, Self::Expired | Self::Cancelled)
                | (Self::Expired, Self::Cancelled)
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial" => Ok(Self::Trial),
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid subscription status: {s}")),
        }
    }
}
