//! Error handling for the Manufacturing Operations Platform
//!
//! Every error renders as `{"error": {"code", "message", "field"?, "details"?}}`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::metrics::DeliveryError;
use shared::validation::{field_errors, FieldError};
use thiserror::Error;
use uuid::Uuid;

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Postgres SQLSTATE for numeric_value_out_of_range
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// One rejected line of a bulk delivery batch
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RejectedItem {
    pub index: usize,
    pub order_id: Uuid,
    pub reason: String,
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Email address not verified")]
    EmailNotVerified,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation failed for {} field(s)", .0.len())]
    ValidationErrors(Vec<FieldError>),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business rule errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Insufficient inventory: {0}")]
    InsufficientInventory(String),

    #[error("Over-delivery: {0}")]
    OverDelivery(String),

    #[error("Bulk delivery rejected ({} item(s))", .0.len())]
    BatchRejected(Vec<RejectedItem>),

    // External service errors
    #[error("Assistant is not configured")]
    AssistantUnavailable,

    #[error("External service error: {0}")]
    ExternalService(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    let constraint = db_err.constraint().unwrap_or("value").to_string();
                    return AppError::DuplicateEntry(constraint);
                }
                Some(NUMERIC_OUT_OF_RANGE) => {
                    return AppError::validation("value", "Value is too large to store");
                }
                _ => {}
            }
        }
        AppError::DatabaseError(err)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::ValidationErrors(field_errors(&errors))
    }
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::OrderNotOpen(_) => AppError::InvalidStateTransition(err.to_string()),
            DeliveryError::NonPositivePayment | DeliveryError::PaymentExceedsBalance { .. } => {
                AppError::validation("amount", err.to_string())
            }
            other => AppError::OverDelivery(other.to_string()),
        }
    }
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
            details: None,
        }
    }

    fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    fn with_details<T: Serialize>(mut self, details: &T) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }
}

impl AppError {
    pub fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_CREDENTIALS", "Invalid email or password"),
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("TOKEN_EXPIRED", "Token has expired"),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_TOKEN", "Invalid token"),
            ),
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", message.clone()),
            ),
            AppError::EmailNotVerified => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new(
                    "EMAIL_NOT_VERIFIED",
                    "Please verify your email address before signing in",
                ),
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new(
                    "INSUFFICIENT_PERMISSIONS",
                    "You do not have permission to perform this action",
                ),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone()).with_field(field.clone()),
            ),
            AppError::ValidationErrors(errors) => {
                let mut detail = ErrorDetail::new("VALIDATION_ERROR", "Some fields are invalid")
                    .with_details(errors);
                if let Some(first) = errors.first() {
                    detail = detail.with_field(first.field.clone());
                    detail.message = first.message.clone();
                }
                (StatusCode::BAD_REQUEST, detail)
            }
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "DUPLICATE_ENTRY",
                    format!("A record with this {} already exists", field),
                )
                .with_field(field.clone()),
            ),
            AppError::Conflict(message) => (
                StatusCode::CONFLICT,
                ErrorDetail::new("CONFLICT", message.clone()),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::InvalidStateTransition(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("INVALID_STATE_TRANSITION", message.clone()),
            ),
            AppError::InsufficientInventory(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("INSUFFICIENT_INVENTORY", message.clone()),
            ),
            AppError::OverDelivery(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("OVER_DELIVERY", message.clone())
                    .with_field("quantity_delivered"),
            ),
            AppError::BatchRejected(items) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(
                    "BATCH_REJECTED",
                    format!(
                        "{} of the submitted updates cannot be applied; nothing was saved",
                        items.len()
                    ),
                )
                .with_details(items),
            ),
            AppError::AssistantUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail::new(
                    "ASSISTANT_UNAVAILABLE",
                    "The operations assistant is not configured",
                ),
            ),
            AppError::ExternalService(message) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new(
                    "EXTERNAL_SERVICE_ERROR",
                    format!("External service error: {}", message),
                ),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            ),
            AppError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", message.clone()),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        tracing::error!(code = %error_detail.code, status = status.as_u16(), "Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use validator::Validate;

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (AppError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AppError::EmailNotVerified, StatusCode::FORBIDDEN),
            (AppError::InsufficientPermissions, StatusCode::FORBIDDEN),
            (AppError::validation("name", "Required"), StatusCode::BAD_REQUEST),
            (AppError::NotFound("Order".into()), StatusCode::NOT_FOUND),
            (AppError::DuplicateEntry("sku".into()), StatusCode::CONFLICT),
            (AppError::OverDelivery("too many".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::BatchRejected(vec![]), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::AssistantUnavailable, StatusCode::SERVICE_UNAVAILABLE),
            (AppError::ExternalService("x".into()), StatusCode::BAD_GATEWAY),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_validation_errors_carry_fields() {
        let input = shared::models::BusinessCustomerInput {
            gst_number: Some("27AAPFU0939F1ZX".to_string()),
            ..Default::default()
        };
        let error: AppError = input.validate().unwrap_err().into();
        let (status, detail) = error.status_and_detail();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(detail.code, "VALIDATION_ERROR");
        let details = detail.details.unwrap();
        let fields: Vec<&str> = details
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["gst_number", "name"]);
    }

    #[test]
    fn test_batch_rejection_lists_items() {
        let order_id = Uuid::new_v4();
        let error = AppError::BatchRejected(vec![RejectedItem {
            index: 2,
            order_id,
            reason: "Delivered quantity 12 exceeds remaining quantity 10".into(),
        }]);
        let (_, detail) = error.status_and_detail();
        assert_eq!(detail.code, "BATCH_REJECTED");
        let details = detail.details.unwrap();
        assert_eq!(details[0]["index"], 2);
        assert_eq!(details[0]["order_id"], order_id.to_string());
    }

    #[test]
    fn test_delivery_error_mapping() {
        let over: AppError = DeliveryError::ExceedsRemaining {
            requested: Decimal::from(5),
            remaining: Decimal::from(4),
        }
        .into();
        assert!(matches!(over, AppError::OverDelivery(_)));

        let closed: AppError =
            DeliveryError::OrderNotOpen(shared::models::OrderStatus::Completed).into();
        assert!(matches!(closed, AppError::InvalidStateTransition(_)));

        let overpaid: AppError = DeliveryError::PaymentExceedsBalance {
            amount: Decimal::from(10),
            outstanding: Decimal::from(5),
        }
        .into();
        assert!(matches!(overpaid, AppError::Validation { ref field, .. } if field == "amount"));
    }
}
