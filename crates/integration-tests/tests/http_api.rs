//! The tenant API through the full router.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use shopkeep_integration_tests::TestPlatform;

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

fn fixture_store(id: i64, slug: &str) -> shopkeep_core::Store {
    let now = chrono::Utc::now();
    shopkeep_core::Store {
        id: shopkeep_core::StoreId::new(id),
        slug: slug.to_string(),
        subdomain: None,
        custom_domain: None,
        active: true,
        created_at: now,
        updated_at: now,
    }
}

fn get(host: &str, path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(header::HOST, host)
        .body(Body::empty())
        .unwrap()
}

fn admit(host: &str, path: &str, payment_method: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::HOST, host)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "payment_method": payment_method }).to_string(),
        ))
        .unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let (platform, _) = TestPlatform::with_acme();
    let (status, body) = send(platform.app(), get("shopkeep.in", "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

#[tokio::test]
async fn test_readiness_without_database() {
    let (platform, _) = TestPlatform::with_acme();
    let (status, _) = send(platform.app(), get("shopkeep.in", "/health/ready")).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Tenant resolution
// =============================================================================

#[tokio::test]
async fn test_tenant_by_custom_domain() {
    let (platform, _) = TestPlatform::with_acme();
    let (status, body) = send(platform.app(), get("shop.acme.com", "/api/tenant")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "acme");
    assert_eq!(body["matched_by"], "custom_domain");
}

#[tokio::test]
async fn test_tenant_by_subdomain() {
    let (platform, _) = TestPlatform::with_acme();
    let (status, body) = send(platform.app(), get("acme.shopkeep.in:8443", "/api/tenant")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store_id"], 1);
    assert_eq!(body["matched_by"], "subdomain");
}

#[tokio::test]
async fn test_tenant_by_path_slug() {
    let (platform, _) = TestPlatform::with_acme();
    let (status, body) = send(platform.app(), get("shopkeep.in", "/acme/api/tenant")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store_id"], 1);
    assert_eq!(body["slug"], "acme");
}

#[tokio::test]
async fn test_tenant_matched_by_slug_only() {
    let platform = TestPlatform::new();
    platform.backend.insert_store(shopkeep_core::Store {
        subdomain: Some("bolt-shop".to_string()),
        ..fixture_store(2, "bolt")
    });

    let (status, body) = send(platform.app(), get("localhost:3000", "/bolt/api/tenant")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matched_by"], "slug");
}

#[tokio::test]
async fn test_platform_host_has_no_tenant() {
    let (platform, _) = TestPlatform::with_acme();
    let (status, body) = send(platform.app(), get("shopkeep.in", "/api/tenant")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["reason"], "store_not_found");
}

#[tokio::test]
async fn test_unknown_custom_domain() {
    let (platform, _) = TestPlatform::with_acme();
    let (status, _) = send(platform.app(), get("nobody.example", "/api/tenant")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_echoed() {
    let (platform, _) = TestPlatform::with_acme();
    let mut request = get("shop.acme.com", "/api/tenant");
    request
        .headers_mut()
        .insert("x-request-id", "checkout-42".parse().unwrap());

    let response = platform.app().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "checkout-42"
    );
}

// =============================================================================
// Checkout admission
// =============================================================================

#[tokio::test]
async fn test_checkout_admit_then_exhausted() {
    let (platform, _) = TestPlatform::with_acme();

    let (status, body) = send(
        platform.app(),
        admit("shop.acme.com", "/api/checkout/admit", "cod"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["channel"], "messaging");
    assert_eq!(body["used"], 3);
    assert_eq!(body["remaining"], 0);
    assert!(body.get("order").is_none());

    let (status, body) = send(
        platform.app(),
        admit("shop.acme.com", "/api/checkout/admit", "COD"),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["reason"], "quota_exhausted");
    assert_eq!(body["usage"]["used"], 3);
    assert_eq!(body["usage"]["cap"], 3);
    assert!(body.get("alternative_channel").is_none());
}

#[tokio::test]
async fn test_checkout_returns_order_to_persist() {
    let (platform, subscription_id) = TestPlatform::with_acme();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/checkout/admit")
        .header(header::HOST, "shop.acme.com")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "payment_method": "cod", "total_minor": 49_900 }).to_string(),
        ))
        .unwrap();

    let (status, body) = send(platform.app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["store_id"], 1);
    assert_eq!(body["order"]["subscription_id"], subscription_id.as_i64());
    assert_eq!(body["order"]["channel"], "messaging");
    assert_eq!(body["order"]["total"]["currency_code"], "INR");
}

#[tokio::test]
async fn test_checkout_online_disabled() {
    let (platform, _) = TestPlatform::with_acme();
    let (status, body) = send(
        platform.app(),
        admit("shopkeep.in", "/acme/api/checkout/admit", "razorpay"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["reason"], "channel_disabled");
}

#[tokio::test]
async fn test_checkout_bad_payment_method() {
    let (platform, subscription_id) = TestPlatform::with_acme();
    let (status, body) = send(
        platform.app(),
        admit("shop.acme.com", "/api/checkout/admit", "pay pal!"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "bad_request");

    use shopkeep_storefront::quota::QuotaLedger;
    assert_eq!(
        platform
            .backend
            .usage(subscription_id)
            .await
            .unwrap()
            .messaging,
        2
    );
}

#[tokio::test]
async fn test_checkout_unknown_tenant() {
    let (platform, _) = TestPlatform::with_acme();
    let (status, body) = send(
        platform.app(),
        admit("shopkeep.in", "/ghost/api/checkout/admit", "cod"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["reason"], "store_not_found");
}

#[tokio::test]
async fn test_checkout_transient_conflict_is_503() {
    let (platform, _) = TestPlatform::with_acme();
    platform.backend.fail_next_admissions(100);

    let (status, body) = send(
        platform.app(),
        admit("shop.acme.com", "/api/checkout/admit", "cod"),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["reason"], "transient_conflict");
}

// =============================================================================
// Usage
// =============================================================================

#[tokio::test]
async fn test_usage_report() {
    let (platform, _) = TestPlatform::with_acme();
    let (status, body) = send(platform.app(), get("acme.shopkeep.in", "/api/usage")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");

    let channels = body["channels"].as_array().unwrap();
    let messaging = channels
        .iter()
        .find(|c| c["channel"] == "messaging")
        .unwrap();
    assert_eq!(messaging["used"], 2);
    assert_eq!(messaging["remaining"], 1);
    assert_eq!(messaging["available"], true);

    let website = channels.iter().find(|c| c["channel"] == "website").unwrap();
    assert_eq!(website["limit"]["kind"], "disabled");
    assert_eq!(website["available"], false);
}
