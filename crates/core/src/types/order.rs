//! Orders created by the checkout flow after admission.

use serde::{Deserialize, Serialize};

use super::channel::Channel;
use super::id::{StoreId, SubscriptionId};
use super::price::Price;

/// An order ready to be persisted by the caller.
///
/// Only obtainable from an admission, so an order can't be built for a
/// channel whose counter was not incremented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub store_id: StoreId,
    /// The subscription whose counter paid for this order.
    pub subscription_id: SubscriptionId,
    pub channel: Channel,
    pub total: Price,
}

impl NewOrder {
    pub(crate) const fn admitted(
        store_id: StoreId,
        subscription_id: SubscriptionId,
        channel: Channel,
        total: Price,
    ) -> Self {
        Self {
            store_id,
            subscription_id,
            channel,
            total,
        }
    }
}
