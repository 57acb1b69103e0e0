use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::common::{DateRangeParams, PaginationParams};
use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::sales::{CreateSaleRequest, SaleListResponse, SaleResponse};
use crate::{ApiResponse, AppState};

/// Record a sale
async fn create_sale(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(request): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SaleResponse>>), ServiceError> {
    let response = state.services.sales.create_sale(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

/// Get a sale with its lines
async fn get_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<SaleResponse>>, ServiceError> {
    let response = state.services.sales.get_sale(sale_id).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// List sales, newest first
async fn list_sales(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(range): Query<DateRangeParams>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<SaleListResponse>>, ServiceError> {
    let response = state
        .services
        .sales
        .list_sales(pagination.page, pagination.per_page, range.from, range.to)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Refund a sale and restore its stock
async fn refund_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<SaleResponse>>, ServiceError> {
    let response = state.services.sales.refund_sale(sale_id).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Void a sale and restore its stock
async fn void_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<SaleResponse>>, ServiceError> {
    let response = state.services.sales.void_sale(sale_id).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_sale).get(list_sales))
        .route("/:id", get(get_sale))
        .route("/:id/refund", post(refund_sale))
        .route("/:id/void", post(void_sale))
}
