use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard JSON error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Not Found", "Bad Request")
    pub error: String,
    /// Machine-readable error code (e.g. "insufficient_stock")
    pub code: String,
    /// Human-readable error description
    pub message: String,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Cashier with ID {0} not found")]
    CashierNotFound(Uuid),

    #[error("Item with ID {0} not found")]
    ItemNotFound(Uuid),

    #[error("Insufficient stock for item {name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        name: String,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    ///
    /// Sale-creation rejections (unknown cashier/item, insufficient stock)
    /// share the 400 family with plain validation failures; clients tell
    /// them apart through the `code` field of the error body.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::CashierNotFound(_)
            | Self::ItemNotFound(_)
            | Self::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::DatabaseError(_)
            | Self::EventError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code surfaced in the error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "database_error",
            Self::NotFound(_) => "not_found",
            Self::ValidationError(_) => "validation_error",
            Self::CashierNotFound(_) => "cashier_not_found",
            Self::ItemNotFound(_) => "item_not_found",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::Conflict(_) => "conflict",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::EventError(_) | Self::InternalError(_) | Self::Other(_) => "internal_error",
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::EventError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: self.code().to_string(),
            message: self.response_message(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn stock_and_lookup_failures_map_to_bad_request() {
        let oos = ServiceError::InsufficientStock {
            name: "Linen Shirt".into(),
            available: dec!(2),
            requested: dec!(5),
        };
        assert_eq!(oos.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(oos.code(), "insufficient_stock");

        let cashier = ServiceError::CashierNotFound(Uuid::new_v4());
        assert_eq!(cashier.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(cashier.code(), "cashier_not_found");
    }

    #[test]
    fn infrastructure_errors_do_not_leak_details() {
        let err = ServiceError::InternalError("connection pool exhausted".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.response_message(), "Internal server error");
    }

    #[test]
    fn not_found_keeps_its_message() {
        let err = ServiceError::NotFound("Sale not found".into());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.response_message(), "Not found: Sale not found");
    }
}
