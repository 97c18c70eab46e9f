//! Per-channel order limits and usage counters.
//!
//! Plans store each channel limit as a nullable integer:
//!
//! | Stored value | Meaning |
//! |--------------|---------|
//! | `NULL`       | channel disabled |
//! | `0`          | unlimited |
//! | `n > 0`      | at most `n` orders per billing period |
//!
//! [`ChannelLimit`] makes the three cases explicit so every match on a limit
//! is exhaustive.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::channel::Channel;

/// Errors converting a stored limit.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitError {
    #[error("channel limit cannot be negative (got {0})")]
    Negative(i64),
    #[error("channel limit {0} does not fit in u32")]
    TooLarge(i64),
}

/// Tri-state order limit for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "cap", rename_all = "snake_case")]
pub enum ChannelLimit {
    /// The plan does not offer this channel at all.
    Disabled,
    /// Orders are counted but never capped.
    Unlimited,
    /// Hard cap per billing period.
    Limited(NonZeroU32),
}

impl ChannelLimit {
    /// Convert the nullable integer stored on a plan row.
    ///
    /// # Errors
    ///
    /// Returns [`LimitError`] for negative values or values above `u32::MAX`.
    pub fn from_stored(value: Option<i64>) -> Result<Self, LimitError> {
        let Some(raw) = value else {
            return Ok(Self::Disabled);
        };
        if raw < 0 {
            return Err(LimitError::Negative(raw));
        }
        let cap = u32::try_from(raw).map_err(|_| LimitError::TooLarge(raw))?;
        Ok(NonZeroU32::new(cap).map_or(Self::Unlimited, Self::Limited))
    }

    /// The nullable integer representation used in storage.
    #[must_use]
    pub fn to_stored(self) -> Option<i64> {
        match self {
            Self::Disabled => None,
            Self::Unlimited => Some(0),
            Self::Limited(cap) => Some(i64::from(cap.get())),
        }
    }

    /// Convenience constructor for a positive cap; `0` yields `Unlimited`.
    #[must_use]
    pub const fn capped(cap: u32) -> Self {
        match NonZeroU32::new(cap) {
            Some(cap) => Self::Limited(cap),
            None => Self::Unlimited,
        }
    }

    /// Whether one more order may be admitted when `used` orders already are.
    #[must_use]
    pub const fn admits(self, used: u32) -> bool {
        match self {
            Self::Disabled => false,
            Self::Unlimited => true,
            Self::Limited(cap) => used < cap.get(),
        }
    }

    /// Whether the channel is offered at all.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// The hard cap, if any.
    #[must_use]
    pub const fn cap(self) -> Option<u32> {
        match self {
            Self::Limited(cap) => Some(cap.get()),
            Self::Disabled | Self::Unlimited => None,
        }
    }

    /// Orders left in the period; `None` when unlimited or disabled.
    #[must_use]
    pub const fn remaining(self, used: u32) -> Option<u32> {
        match self {
            Self::Limited(cap) => Some(cap.get().saturating_sub(used)),
            Self::Disabled | Self::Unlimited => None,
        }
    }
}

impl fmt::Display for ChannelLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Unlimited => f.write_str("unlimited"),
            Self::Limited(cap) => write!(f, "{cap} per period"),
        }
    }
}

/// Per-channel limits of a subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub messaging: ChannelLimit,
    pub website: ChannelLimit,
}

impl PlanLimits {
    #[must_use]
    pub const fn new(messaging: ChannelLimit, website: ChannelLimit) -> Self {
        Self { messaging, website }
    }

    #[must_use]
    pub const fn for_channel(&self, channel: Channel) -> ChannelLimit {
        match channel {
            Channel::Messaging => self.messaging,
            Channel::Website => self.website,
        }
    }
}

/// Orders recorded against each channel in the current period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelUsage {
    pub messaging: u32,
    pub website: u32,
}

impl ChannelUsage {
    #[must_use]
    pub const fn new(messaging: u32, website: u32) -> Self {
        Self { messaging, website }
    }

    #[must_use]
    pub const fn for_channel(&self, channel: Channel) -> u32 {
        match channel {
            Channel::Messaging => self.messaging,
            Channel::Website => self.website,
        }
    }

    /// Convert stored counters, rejecting negative values.
    ///
    /// # Errors
    ///
    /// Returns [`LimitError`] if either counter is negative or too large.
    pub fn from_stored(messaging: i64, website: i64) -> Result<Self, LimitError> {
        let convert = |raw: i64| {
            if raw < 0 {
                Err(LimitError::Negative(raw))
            } else {
                u32::try_from(raw).map_err(|_| LimitError::TooLarge(raw))
            }
        };
        Ok(Self {
            messaging: convert(messaging)?,
            website: convert(website)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_stored_tri_state() {
        assert_eq!(ChannelLimit::from_stored(None), Ok(ChannelLimit::Disabled));
        assert_eq!(ChannelLimit::from_stored(Some(0)), Ok(ChannelLimit::Unlimited));
        assert_eq!(
            ChannelLimit::from_stored(Some(3)),
            Ok(ChannelLimit::capped(3))
        );
        assert_eq!(
            ChannelLimit::from_stored(Some(-1)),
            Err(LimitError::Negative(-1))
        );
        assert!(matches!(
            ChannelLimit::from_stored(Some(i64::from(u32::MAX) + 1)),
            Err(LimitError::TooLarge(_))
        ));
    }

    #[test]
    fn test_to_stored_inverts_from_stored() {
        for stored in [None, Some(0), Some(1), Some(250)] {
            let limit = ChannelLimit::from_stored(stored).unwrap();
            assert_eq!(limit.to_stored(), stored);
        }
    }

    #[test]
    fn test_remaining() {
        assert_eq!(ChannelLimit::capped(3).remaining(1), Some(2));
        assert_eq!(ChannelLimit::capped(3).remaining(5), Some(0));
        assert_eq!(ChannelLimit::Unlimited.remaining(5), None);
    }

    #[test]
    fn test_limit_serde_shape() {
        let json = serde_json::to_value(ChannelLimit::capped(5)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "limited", "cap": 5}));
        let json = serde_json::to_value(ChannelLimit::Disabled).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "disabled"}));
    }

    #[test]
    fn test_usage_rejects_negative_counters() {
        assert_eq!(
            ChannelUsage::from_stored(-2, 0),
            Err(LimitError::Negative(-2))
        );
        assert_eq!(ChannelUsage::from_stored(2, 4), Ok(ChannelUsage::new(2, 4)));
    }

    proptest! {
        #[test]
        fn prop_disabled_never_admits(used in any::<u32>()) {
            prop_assert!(!ChannelLimit::Disabled.admits(used));
        }

        #[test]
        fn prop_unlimited_always_admits(used in any::<u32>()) {
            prop_assert!(ChannelLimit::Unlimited.admits(used));
        }

        #[test]
        fn prop_limited_admits_below_cap(cap in 1u32..10_000, used in 0u32..20_000) {
            prop_assert_eq!(ChannelLimit::capped(cap).admits(used), used < cap);
        }
    }
}
