//! Checkout admission endpoint.
//!
//! The checkout flow calls this before creating an order. A 200 means the
//! order has been counted against the plan and must be created; any other
//! status means no order may be created.

use axum::{Json, extract::State};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use shopkeep_core::{
    Channel, ChannelLimit, CurrencyCode, NewOrder, PaymentMethod, Price, StoreId, SubscriptionId,
};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireTenant;
use crate::state::AppState;

/// Admission request body.
#[derive(Debug, Deserialize)]
pub struct AdmitRequest {
    /// `cod` for cash on delivery, otherwise a gateway id (`razorpay`, `stripe`, ...).
    pub payment_method: String,
    /// Order total in paise. When present the response carries the order to
    /// persist.
    #[serde(default)]
    pub total_minor: Option<u64>,
}

/// Admission response body.
#[derive(Debug, Serialize)]
pub struct AdmitResponse {
    pub store_id: StoreId,
    pub subscription_id: SubscriptionId,
    pub channel: Channel,
    pub used: u32,
    pub limit: ChannelLimit,
    pub remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<NewOrder>,
}

/// `POST /api/checkout/admit`
///
/// # Errors
///
/// Returns 400 for an unparseable payment method, otherwise the status of
/// the admission rejection.
pub async fn admit(
    State(state): State<AppState>,
    RequireTenant(store): RequireTenant,
    Json(body): Json<AdmitRequest>,
) -> Result<Json<AdmitResponse>> {
    let method = PaymentMethod::parse(&body.payment_method)
        .map_err(|e| AppError::BadRequest(format!("payment_method: {e}")))?;

    let admission = state
        .gate()
        .admit_for_store(store, &method, Utc::now())
        .await?;

    add_breadcrumb(
        "checkout",
        "Order admitted",
        Some(&[("channel", admission.channel.as_str())]),
    );

    let order = body
        .total_minor
        .map(|minor| admission.new_order(Price::from_minor_units(minor, CurrencyCode::INR)));

    Ok(Json(AdmitResponse {
        store_id: admission.store.id,
        subscription_id: admission.subscription_id,
        channel: admission.channel,
        used: admission.used,
        limit: admission.limit,
        remaining: admission.limit.remaining(admission.used),
        order,
    }))
}
