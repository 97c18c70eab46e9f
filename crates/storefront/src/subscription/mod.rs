//! Subscription state derivation.
//!
//! A store can accumulate several subscription rows over time (trials,
//! upgrades, renewals, cancellations). Which one is authoritative, and
//! whether it still entitles the store to take orders, is derived here from
//! the rows and the current time. Nothing in this module writes status.
//!
//! # Selection
//!
//! Among rows whose stored status is `trial` or `active`:
//! 1. the most recently updated `active` row, else
//! 2. the most recently updated `trial` row.
//!
//! Ties on `updated_at` go to the higher subscription id. If no row is live,
//! the most recently updated row of any status is selected so callers can
//! tell "expired" from "cancelled".
//!
//! # Derived expiry
//!
//! A live row whose period end is at or before `now` is `Expired`, whatever
//! its stored status says. The period end is the trial end for trials
//! (falling back to the current period end) and the current period end for
//! active rows. Rows without a period end do not derive-expire.

use chrono::{DateTime, Utc};
use serde::Serialize;

use shopkeep_core::{
    Channel, ChannelUsage, PlanId, PlanLimits, StoreId, SubscriptionId, SubscriptionStatus,
};

/// One subscription row joined with its plan's limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRecord {
    pub id: SubscriptionId,
    pub store_id: StoreId,
    pub plan_id: PlanId,
    pub status: SubscriptionStatus,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub limits: PlanLimits,
    pub usage: ChannelUsage,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRecord {
    /// The instant after which this row no longer entitles the store.
    #[must_use]
    pub fn period_end(&self) -> Option<DateTime<Utc>> {
        match self.status {
            SubscriptionStatus::Trial => self.trial_ends_at.or(self.current_period_end),
            SubscriptionStatus::Active
            | SubscriptionStatus::Expired
            | SubscriptionStatus::Cancelled => self.current_period_end,
        }
    }

    fn recency(&self) -> (DateTime<Utc>, SubscriptionId) {
        (self.updated_at, self.id)
    }
}

/// The derived state the admission gate consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionSnapshot {
    pub subscription_id: SubscriptionId,
    pub store_id: StoreId,
    /// Effective status after derived expiry.
    pub status: SubscriptionStatus,
    /// Status as stored on the row.
    pub stored_status: SubscriptionStatus,
    pub limits: PlanLimits,
    pub usage: ChannelUsage,
    pub period_end: Option<DateTime<Utc>>,
}

impl SubscriptionSnapshot {
    #[must_use]
    pub const fn is_entitled(&self) -> bool {
        self.status.is_entitled()
    }

    /// Whether one more order on `channel` would be admitted, as of this
    /// snapshot. Advisory only; admission itself goes through the ledger.
    #[must_use]
    pub const fn channel_available(&self, channel: Channel) -> bool {
        self.limits
            .for_channel(channel)
            .admits(self.usage.for_channel(channel))
    }
}

/// Pick the authoritative row.
#[must_use]
pub fn select_current(rows: &[SubscriptionRecord]) -> Option<&SubscriptionRecord> {
    let latest_with = |status: SubscriptionStatus| {
        rows.iter()
            .filter(|row| row.status == status)
            .max_by_key(|row| row.recency())
    };

    latest_with(SubscriptionStatus::Active)
        .or_else(|| latest_with(SubscriptionStatus::Trial))
        .or_else(|| rows.iter().max_by_key(|row| row.recency()))
}

/// The status a row has at `now`, applying derived expiry.
#[must_use]
pub fn effective_status(row: &SubscriptionRecord, now: DateTime<Utc>) -> SubscriptionStatus {
    if !row.status.is_live() {
        return row.status;
    }
    match row.period_end() {
        Some(end) if end <= now => SubscriptionStatus::Expired,
        _ => row.status,
    }
}

/// Select the current row and derive its snapshot. `None` when there are no rows.
#[must_use]
pub fn derive(rows: &[SubscriptionRecord], now: DateTime<Utc>) -> Option<SubscriptionSnapshot> {
    let row = select_current(rows)?;
    Some(SubscriptionSnapshot {
        subscription_id: row.id,
        store_id: row.store_id,
        status: effective_status(row, now),
        stored_status: row.status,
        limits: row.limits,
        usage: row.usage,
        period_end: row.period_end(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use shopkeep_core::ChannelLimit;

    use super::*;

    fn row(id: i64, status: SubscriptionStatus, updated_minutes_ago: i64) -> SubscriptionRecord {
        let now = Utc::now();
        SubscriptionRecord {
            id: SubscriptionId::new(id),
            store_id: StoreId::new(1),
            plan_id: PlanId::new(1),
            status,
            trial_ends_at: None,
            current_period_end: Some(now + Duration::days(30)),
            limits: PlanLimits::new(ChannelLimit::capped(3), ChannelLimit::Disabled),
            usage: ChannelUsage::default(),
            updated_at: now - Duration::minutes(updated_minutes_ago),
        }
    }

    #[test]
    fn test_no_rows_no_snapshot() {
        assert!(derive(&[], Utc::now()).is_none());
    }

    #[test]
    fn test_active_preferred_over_newer_trial() {
        let rows = [
            row(1, SubscriptionStatus::Trial, 0),
            row(2, SubscriptionStatus::Active, 60),
        ];
        assert_eq!(select_current(&rows).unwrap().id, SubscriptionId::new(2));
    }

    #[test]
    fn test_most_recent_active_wins() {
        let rows = [
            row(1, SubscriptionStatus::Active, 120),
            row(2, SubscriptionStatus::Active, 5),
            row(3, SubscriptionStatus::Active, 60),
        ];
        assert_eq!(select_current(&rows).unwrap().id, SubscriptionId::new(2));
    }

    #[test]
    fn test_trial_used_when_no_active() {
        let rows = [
            row(1, SubscriptionStatus::Cancelled, 0),
            row(2, SubscriptionStatus::Trial, 30),
        ];
        assert_eq!(select_current(&rows).unwrap().id, SubscriptionId::new(2));
    }

    #[test]
    fn test_tie_broken_by_higher_id() {
        let mut a = row(4, SubscriptionStatus::Active, 0);
        let mut b = row(9, SubscriptionStatus::Active, 0);
        let at = Utc::now();
        a.updated_at = at;
        b.updated_at = at;
        assert_eq!(select_current(&[b, a]).unwrap().id, SubscriptionId::new(9));
    }

    #[test]
    fn test_dead_rows_fall_back_to_latest() {
        let rows = [
            row(1, SubscriptionStatus::Expired, 60),
            row(2, SubscriptionStatus::Cancelled, 10),
        ];
        let snapshot = derive(&rows, Utc::now()).unwrap();
        assert_eq!(snapshot.subscription_id, SubscriptionId::new(2));
        assert_eq!(snapshot.status, SubscriptionStatus::Cancelled);
    }

    #[test]
    fn test_derived_expiry_overrides_active() {
        let mut active = row(1, SubscriptionStatus::Active, 0);
        active.current_period_end = Some(Utc::now() - Duration::hours(1));
        let snapshot = derive(&[active], Utc::now()).unwrap();
        assert_eq!(snapshot.stored_status, SubscriptionStatus::Active);
        assert_eq!(snapshot.status, SubscriptionStatus::Expired);
        assert!(!snapshot.is_entitled());
    }

    #[test]
    fn test_trial_expires_on_trial_end() {
        let now = Utc::now();
        let mut trial = row(1, SubscriptionStatus::Trial, 0);
        trial.trial_ends_at = Some(now);
        trial.current_period_end = Some(now + Duration::days(30));
        assert_eq!(effective_status(&trial, now), SubscriptionStatus::Expired);
        assert_eq!(
            effective_status(&trial, now - Duration::seconds(1)),
            SubscriptionStatus::Trial
        );
    }

    #[test]
    fn test_missing_period_end_never_expires() {
        let mut active = row(1, SubscriptionStatus::Active, 0);
        active.current_period_end = None;
        assert_eq!(
            effective_status(&active, Utc::now() + Duration::days(3650)),
            SubscriptionStatus::Active
        );
    }

    #[test]
    fn test_expired_active_row_still_selected_over_trial() {
        let mut active = row(1, SubscriptionStatus::Active, 0);
        active.current_period_end = Some(Utc::now() - Duration::days(1));
        let trial = row(2, SubscriptionStatus::Trial, 0);
        let snapshot = derive(&[active, trial], Utc::now()).unwrap();
        assert_eq!(snapshot.subscription_id, SubscriptionId::new(1));
        assert_eq!(snapshot.status, SubscriptionStatus::Expired);
    }

    #[test]
    fn test_channel_available() {
        let mut active = row(1, SubscriptionStatus::Active, 0);
        active.usage = ChannelUsage::new(3, 0);
        let snapshot = derive(&[active], Utc::now()).unwrap();
        assert!(!snapshot.channel_available(Channel::Messaging));
        assert!(!snapshot.channel_available(Channel::Website));
    }
}
