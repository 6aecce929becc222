//! API error types and handling
//!
//! Two response shapes: entitlement denials use the flat bodies clients
//! key their paywall UI off, everything else uses the standard
//! `{"error": {"code", "message"}}` envelope. Infrastructure failures
//! never leak reason codes a client could mistake for a denial.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use dealcrm_entitlements::{EntitlementError, FeatureAccessResult};

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Authentication errors
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Authentication required")]
    Unauthorized,

    // Entitlement denials
    #[error("Feature not available")]
    FeatureDenied(FeatureAccessResult),
    #[error("Usage limit exceeded")]
    UsageDenied(FeatureAccessResult),

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    // Internal errors
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            // 403 with the shape paywall UIs consume
            ApiError::FeatureDenied(result) => {
                let mut body = json!({
                    "error": "Feature not available",
                    "reason": result.reason,
                });
                if let Some(plan) = result.required_plan {
                    body["requiredPlan"] = json!(plan);
                }
                if let Some(url) = result.upgrade_url {
                    body["upgradeUrl"] = json!(url);
                }
                (StatusCode::FORBIDDEN, Json(body)).into_response()
            }
            // 429 with the counter values so clients can render "987 of 1000"
            ApiError::UsageDenied(result) => {
                let mut body = json!({
                    "error": "Usage limit exceeded",
                    "reason": result.reason,
                });
                if let Some(used) = result.current_usage {
                    body["currentUsage"] = json!(used);
                }
                if let Some(limit) = result.limit {
                    body["limit"] = json!(limit);
                }
                if let Some(url) = result.upgrade_url {
                    body["upgradeUrl"] = json!(url);
                }
                (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
            }
            other => {
                let (status, code, message) = match &other {
                    ApiError::InvalidToken => {
                        (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", other.to_string())
                    }
                    ApiError::Unauthorized => {
                        (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", other.to_string())
                    }
                    ApiError::Validation(msg) => {
                        (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                    }
                    ApiError::BadRequest(msg) => {
                        (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone())
                    }
                    ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", other.to_string()),
                    ApiError::Database(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "DATABASE_ERROR",
                        "Database error".to_string(),
                    ),
                    ApiError::Internal => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        other.to_string(),
                    ),
                    ApiError::FeatureDenied(_) | ApiError::UsageDenied(_) => unreachable!(),
                };

                let body = Json(json!({
                    "error": {
                        "code": code,
                        "message": message,
                    }
                }));

                (status, body).into_response()
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            _ => ApiError::Database(err.to_string()),
        }
    }
}

impl From<EntitlementError> for ApiError {
    fn from(err: EntitlementError) -> Self {
        match err {
            EntitlementError::TenantNotFound(_) => ApiError::NotFound,
            EntitlementError::UnknownFeature(f) => {
                ApiError::BadRequest(format!("Unknown feature: {}", f))
            }
            EntitlementError::UnknownPlan(p) => ApiError::BadRequest(format!("Unknown plan: {}", p)),
            EntitlementError::UnknownDimension(d) => {
                ApiError::BadRequest(format!("Unknown usage dimension: {}", d))
            }
            EntitlementError::InvalidInput(msg) => ApiError::Validation(msg),
            EntitlementError::Database(e) => {
                tracing::error!("Entitlement database error: {:?}", e);
                ApiError::Database(e.to_string())
            }
            EntitlementError::Internal(msg) => {
                tracing::error!("Entitlement internal error: {}", msg);
                ApiError::Internal
            }
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
