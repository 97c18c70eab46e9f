//! End-to-end admission decisions through the public gate API.

#![allow(clippy::unwrap_used)]

use shopkeep_core::{
    Channel, ChannelLimit, ChannelUsage, CurrencyCode, PaymentMethod, PlanId, PlanLimits, Price,
    Rejection, StoreId, SubscriptionId, SubscriptionStatus,
};
use shopkeep_integration_tests::{TestPlatform, days_from_now};
use shopkeep_storefront::quota::QuotaLedger;
use shopkeep_storefront::subscription::SubscriptionRecord;

fn cod() -> PaymentMethod {
    PaymentMethod::parse("cod").unwrap()
}

fn online() -> PaymentMethod {
    PaymentMethod::parse("razorpay").unwrap()
}

// =============================================================================
// The acme tenant
// =============================================================================

#[tokio::test]
async fn test_acme_last_cod_slot_then_exhausted() {
    let (platform, subscription_id) = TestPlatform::with_acme();
    let gate = platform.gate();

    let admission = gate.admit_order("acme", &cod()).await.unwrap();
    assert_eq!(admission.channel, Channel::Messaging);
    assert_eq!(admission.used, 3);
    assert_eq!(admission.limit, ChannelLimit::capped(3));

    let rejection = gate.admit_order("acme", &cod()).await.unwrap_err();
    assert_eq!(rejection.code(), "quota_exhausted");
    assert_eq!(rejection.alternative(), None);

    let rejection = gate.admit_order("acme", &online()).await.unwrap_err();
    assert_eq!(rejection.code(), "channel_disabled");

    let usage = platform.backend.usage(subscription_id).await.unwrap();
    assert_eq!(usage, ChannelUsage::new(3, 0));
}

#[tokio::test]
async fn test_acme_reachable_by_every_identifier() {
    let (platform, _) = TestPlatform::with_acme();
    let gate = platform.gate();

    for (host, path) in [
        ("shop.acme.com", "/"),
        ("ACME.shopkeep.in:443", "/"),
        ("shopkeep.in", "/acme/checkout"),
        ("localhost:3000", "/acme"),
    ] {
        let outcome = gate.admit_request(host, path, &cod()).await;
        // Only the first attempt has a slot left; what matters is that each
        // request found the tenant.
        assert!(
            !matches!(outcome, Err(Rejection::StoreNotFound)),
            "{host}{path} did not resolve"
        );
    }
}

#[tokio::test]
async fn test_order_for_admission() {
    let (platform, _) = TestPlatform::with_acme();
    let admission = platform.gate().admit_order("acme", &cod()).await.unwrap();

    let total = Price::from_minor_units(49_900, CurrencyCode::INR);
    let order = admission.new_order(total);
    assert_eq!(order.store_id, admission.store.id);
    assert_eq!(order.channel, Channel::Messaging);
    assert_eq!(order.subscription_id, admission.subscription_id);
    assert_eq!(order.total, total);
}

// =============================================================================
// Subscription state
// =============================================================================

#[tokio::test]
async fn test_expired_trial_rejected_even_if_stored_as_trial() {
    let platform = TestPlatform::new();
    let store_id = platform.add_store(1, "trialer", None);
    platform.add_subscription_with(SubscriptionRecord {
        id: SubscriptionId::new(1),
        store_id,
        plan_id: PlanId::new(1),
        status: SubscriptionStatus::Trial,
        trial_ends_at: Some(days_from_now(-1)),
        current_period_end: None,
        limits: PlanLimits::new(ChannelLimit::Unlimited, ChannelLimit::Unlimited),
        usage: ChannelUsage::default(),
        updated_at: days_from_now(-14),
    });

    let rejection = platform
        .gate()
        .admit_order("trialer", &cod())
        .await
        .unwrap_err();
    assert!(matches!(rejection, Rejection::SubscriptionExpired { .. }));
}

#[tokio::test]
async fn test_upgrade_from_trial_uses_active_plan() {
    let platform = TestPlatform::new();
    let store_id = platform.add_store(1, "upgrader", None);

    // Trial row touched more recently than the paid row.
    platform.add_subscription_with(SubscriptionRecord {
        id: SubscriptionId::new(1),
        store_id,
        plan_id: PlanId::new(1),
        status: SubscriptionStatus::Trial,
        trial_ends_at: Some(days_from_now(7)),
        current_period_end: None,
        limits: PlanLimits::new(ChannelLimit::capped(1), ChannelLimit::Disabled),
        usage: ChannelUsage::new(1, 0),
        updated_at: days_from_now(0),
    });
    let paid = platform.add_subscription_with(SubscriptionRecord {
        id: SubscriptionId::new(2),
        store_id,
        plan_id: PlanId::new(2),
        status: SubscriptionStatus::Active,
        trial_ends_at: None,
        current_period_end: Some(days_from_now(30)),
        limits: PlanLimits::new(ChannelLimit::capped(100), ChannelLimit::Unlimited),
        usage: ChannelUsage::default(),
        updated_at: days_from_now(-1),
    });

    let admission = platform
        .gate()
        .admit_order("upgrader", &online())
        .await
        .unwrap();
    assert_eq!(admission.subscription_id, paid);
    assert_eq!(admission.limit, ChannelLimit::Unlimited);
}

#[tokio::test]
async fn test_cancelled_store_cannot_order() {
    let platform = TestPlatform::new();
    let store_id = platform.add_store(1, "gone", None);
    let id = platform.add_subscription(
        1,
        store_id,
        PlanLimits::new(ChannelLimit::Unlimited, ChannelLimit::Unlimited),
        ChannelUsage::default(),
    );
    platform.backend.update_subscription(id, |s| {
        s.status = SubscriptionStatus::Cancelled;
    });

    assert_eq!(
        platform.gate().admit_order("gone", &cod()).await.unwrap_err(),
        Rejection::SubscriptionInactive
    );
}

#[tokio::test]
async fn test_inactive_store_not_found() {
    let (platform, subscription_id) = TestPlatform::with_acme();
    platform
        .backend
        .update_store(StoreId::new(1), |s| s.active = false);

    assert_eq!(
        platform.gate().admit_order("acme", &cod()).await.unwrap_err(),
        Rejection::StoreNotFound
    );
    assert_eq!(
        platform.backend.usage(subscription_id).await.unwrap(),
        ChannelUsage::new(2, 0)
    );
}

// =============================================================================
// Alternatives and retries
// =============================================================================

#[tokio::test]
async fn test_disabled_channel_points_to_open_one() {
    let platform = TestPlatform::new();
    let store_id = platform.add_store(1, "webonly", None);
    platform.add_subscription(
        1,
        store_id,
        PlanLimits::new(ChannelLimit::Disabled, ChannelLimit::capped(10)),
        ChannelUsage::new(0, 4),
    );

    let rejection = platform
        .gate()
        .admit_order("webonly", &cod())
        .await
        .unwrap_err();
    assert_eq!(
        rejection,
        Rejection::ChannelDisabled {
            channel: Channel::Messaging,
            alternative: Some(Channel::Website),
        }
    );
    assert!(rejection.user_message().contains("online payment"));
}

#[tokio::test]
async fn test_conflicts_within_budget_are_invisible() {
    let (platform, subscription_id) = TestPlatform::with_acme();
    platform.backend.fail_next_admissions(2);

    let admission = platform.gate().admit_order("acme", &cod()).await.unwrap();
    assert_eq!(admission.used, 3);
    assert_eq!(
        platform.backend.usage(subscription_id).await.unwrap(),
        ChannelUsage::new(3, 0)
    );
}

#[tokio::test]
async fn test_conflicts_beyond_budget_surface_as_transient() {
    let (platform, subscription_id) = TestPlatform::with_acme();
    platform.backend.fail_next_admissions(10);

    let rejection = platform
        .gate()
        .admit_order("acme", &cod())
        .await
        .unwrap_err();
    assert_eq!(rejection, Rejection::TransientConflict);
    assert!(rejection.is_retryable());
    assert_eq!(
        platform.backend.usage(subscription_id).await.unwrap(),
        ChannelUsage::new(2, 0)
    );
}
