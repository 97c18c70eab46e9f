//! Admission decisions returned to the checkout flow.
//!
//! Every outcome is a value: callers branch on the [`Rejection`] variant to
//! pick their copy and to decide whether to offer the other channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::channel::Channel;
use super::id::SubscriptionId;
use super::limit::ChannelLimit;
use super::order::NewOrder;
use super::price::Price;
use super::store::Store;

/// A successful admission. The channel counter has already been incremented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub store: Store,
    pub subscription_id: SubscriptionId,
    pub channel: Channel,
    /// Counter value after this admission.
    pub used: u32,
    pub limit: ChannelLimit,
}

impl Admission {
    /// Build the order the caller persists for this admission.
    #[must_use]
    pub const fn new_order(&self, total: Price) -> NewOrder {
        NewOrder::admitted(self.store.id, self.subscription_id, self.channel, total)
    }
}

/// Why an order was not admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    /// No active store matches the request.
    #[error("store not found")]
    StoreNotFound,

    /// The store has never had a subscription.
    #[error("store has no subscription")]
    NoSubscription,

    /// The current subscription was cancelled.
    #[error("subscription is cancelled")]
    SubscriptionInactive,

    /// The current subscription expired, either by status or by period end.
    #[error("subscription expired")]
    SubscriptionExpired {
        expired_at: Option<DateTime<Utc>>,
    },

    /// The plan does not offer this channel.
    #[error("{channel} orders are not available on this plan")]
    ChannelDisabled {
        channel: Channel,
        alternative: Option<Channel>,
    },

    /// The channel's cap for this period is reached.
    #[error("{channel} order limit reached ({used}/{cap})")]
    QuotaExhausted {
        channel: Channel,
        used: u32,
        cap: u32,
        alternative: Option<Channel>,
    },

    /// The counter update kept conflicting; neither admitted nor refused.
    #[error("admission could not be completed, please retry")]
    TransientConflict,
}

impl Rejection {
    /// Stable machine-readable reason code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::StoreNotFound => "store_not_found",
            Self::NoSubscription => "no_subscription",
            Self::SubscriptionInactive => "subscription_inactive",
            Self::SubscriptionExpired { .. } => "subscription_expired",
            Self::ChannelDisabled { .. } => "channel_disabled",
            Self::QuotaExhausted { .. } => "quota_exhausted",
            Self::TransientConflict => "transient_conflict",
        }
    }

    /// Copy suitable for showing to a shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::StoreNotFound => "This store could not be found.".to_string(),
            Self::NoSubscription | Self::SubscriptionInactive => {
                "Ordering is currently unavailable for this store.".to_string()
            }
            Self::SubscriptionExpired { .. } => {
                "This store's subscription has expired. Please contact the store owner."
                    .to_string()
            }
            Self::ChannelDisabled { channel, alternative } => match alternative {
                Some(other) => format!(
                    "{} orders are not available. Please order via {} instead.",
                    channel_label(*channel),
                    channel_label(*other).to_lowercase()
                ),
                None => "Ordering is currently unavailable for this store.".to_string(),
            },
            Self::QuotaExhausted {
                channel,
                used,
                cap,
                alternative,
            } => match alternative {
                Some(other) => format!(
                    "{} orders are full for this period. Please order via {} instead.",
                    channel_label(*channel),
                    channel_label(*other).to_lowercase()
                ),
                None => format!(
                    "This store has reached its order limit ({used} of {cap}). Please contact the store owner."
                ),
            },
            Self::TransientConflict => {
                "We couldn't place your order right now. Please try again.".to_string()
            }
        }
    }

    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientConflict)
    }

    /// The other channel, when the rejection suggests one.
    #[must_use]
    pub const fn alternative(&self) -> Option<Channel> {
        match self {
            Self::ChannelDisabled { alternative, .. } | Self::QuotaExhausted { alternative, .. } => {
                *alternative
            }
            _ => None,
        }
    }
}

const fn channel_label(channel: Channel) -> &'static str {
    match channel {
        Channel::Messaging => "Cash-on-delivery",
        Channel::Website => "Online payment",
    }
}
