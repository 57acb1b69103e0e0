use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::payment_due::PaymentDueStatus;
use crate::errors::ServiceError;
use crate::services::payments::{MarkPaidRequest, PaymentDueResponse};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
struct PaymentListParams {
    status: Option<String>,
}

/// List payment dues, optionally filtered by status
async fn list_payment_dues(
    State(state): State<AppState>,
    Query(params): Query<PaymentListParams>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Vec<PaymentDueResponse>>>, ServiceError> {
    let status = match params.status {
        Some(raw) => Some(PaymentDueStatus::parse(&raw).ok_or_else(|| {
            ServiceError::ValidationError(format!("unknown payment status '{}'", raw))
        })?),
        None => None,
    };
    let response = state.services.payments.list_all(status).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// List unpaid dues, most urgent first
async fn list_pending(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Vec<PaymentDueResponse>>>, ServiceError> {
    let response = state.services.payments.list_pending().await?;
    Ok(Json(ApiResponse::success(response)))
}

/// List unpaid dues that are past their due date
async fn list_overdue(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Vec<PaymentDueResponse>>>, ServiceError> {
    let response = state.services.payments.list_overdue().await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Get a payment due by ID
async fn get_payment_due(
    State(state): State<AppState>,
    Path(payment_due_id): Path<Uuid>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<PaymentDueResponse>>, ServiceError> {
    let response = state.services.payments.get(payment_due_id).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Settle a payment due
async fn mark_paid(
    State(state): State<AppState>,
    Path(payment_due_id): Path<Uuid>,
    _user: AuthUser,
    request: Option<Json<MarkPaidRequest>>,
) -> Result<Json<ApiResponse<PaymentDueResponse>>, ServiceError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let response = state
        .services
        .payments
        .mark_paid(payment_due_id, request)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_payment_dues))
        .route("/pending", get(list_pending))
        .route("/overdue", get(list_overdue))
        .route("/:id", get(get_payment_due))
        .route("/:id/paid", post(mark_paid))
}
