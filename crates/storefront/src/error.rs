//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; bodies are JSON.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use shopkeep_core::{Channel, Rejection, StoreId};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// The order (or usage lookup) was refused.
    #[error("Rejected: {0}")]
    Rejected(#[from] Rejection),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub reason: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_channel: Option<Channel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageFigures>,
}

/// Counter figures attached to quota rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageFigures {
    pub used: u32,
    pub cap: u32,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Rejected(rejection) => rejection_status(rejection),
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            Self::Rejected(rejection) => ErrorBody {
                reason: rejection.code(),
                message: rejection.user_message(),
                alternative_channel: rejection.alternative(),
                usage: match rejection {
                    Rejection::QuotaExhausted { used, cap, .. } => Some(UsageFigures {
                        used: *used,
                        cap: *cap,
                    }),
                    _ => None,
                },
            },
            Self::BadRequest(_) => ErrorBody {
                reason: "bad_request",
                message: self.to_string(),
                alternative_channel: None,
                usage: None,
            },
        }
    }
}

/// Status code for a rejection.
#[must_use]
pub const fn rejection_status(rejection: &Rejection) -> StatusCode {
    match rejection {
        Rejection::StoreNotFound => StatusCode::NOT_FOUND,
        Rejection::NoSubscription
        | Rejection::SubscriptionInactive
        | Rejection::SubscriptionExpired { .. }
        | Rejection::ChannelDisabled { .. } => StatusCode::FORBIDDEN,
        Rejection::QuotaExhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
        Rejection::TransientConflict => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(self.body())).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Tag the Sentry scope with the resolved tenant.
///
/// Called by the tenant middleware so errors can be grouped per store.
pub fn set_sentry_tenant(store_id: StoreId, slug: &str) {
    sentry::configure_scope(|scope| {
        scope.set_tag("store_id", store_id);
        scope.set_tag("store_slug", slug);
    });
}

/// Add a breadcrumb for checkout actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order admitted", Some(&[("channel", "messaging")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");

        let err = AppError::from(Rejection::StoreNotFound);
        assert_eq!(err.to_string(), "Rejected: store not found");
    }

    #[test]
    fn test_rejection_status_codes() {
        assert_eq!(
            get_status(Rejection::StoreNotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(Rejection::NoSubscription.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(Rejection::SubscriptionExpired { expired_at: None }.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(
                Rejection::ChannelDisabled {
                    channel: Channel::Website,
                    alternative: None
                }
                .into()
            ),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(
                Rejection::QuotaExhausted {
                    channel: Channel::Messaging,
                    used: 3,
                    cap: 3,
                    alternative: None
                }
                .into()
            ),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(Rejection::TransientConflict.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_bad_request_status() {
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_quota_body_carries_usage_and_alternative() {
        let err = AppError::from(Rejection::QuotaExhausted {
            channel: Channel::Messaging,
            used: 5,
            cap: 5,
            alternative: Some(Channel::Website),
        });
        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(body["reason"], "quota_exhausted");
        assert_eq!(body["alternative_channel"], "website");
        assert_eq!(body["usage"]["used"], 5);
        assert_eq!(body["usage"]["cap"], 5);
    }

    #[test]
    fn test_transient_body_is_generic() {
        let body = AppError::from(Rejection::TransientConflict).body();
        assert_eq!(body.reason, "transient_conflict");
        assert!(body.alternative_channel.is_none());
        assert!(body.usage.is_none());
    }
}
