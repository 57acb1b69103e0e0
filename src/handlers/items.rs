use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::common::PaginationParams;
use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::items::{
    CreateItemRequest, ItemListResponse, ItemResponse, UpdateItemRequest,
};
use crate::{ApiResponse, AppState};

/// Create a catalog item
async fn create_item(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(request): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ItemResponse>>), ServiceError> {
    let response = state.services.items.create_item(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

/// Get an item by ID
async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<ItemResponse>>, ServiceError> {
    let response = state.services.items.get_item(item_id).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// List active items
async fn list_items(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<ItemListResponse>>, ServiceError> {
    let response = state
        .services
        .items
        .list_items(pagination.page, pagination.per_page)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

/// List items at or below their minimum stock level
async fn list_low_stock(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Vec<ItemResponse>>>, ServiceError> {
    let response = state.services.items.list_low_stock().await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Apply partial updates to an item
async fn update_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    _user: AuthUser,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<ApiResponse<ItemResponse>>, ServiceError> {
    let response = state.services.items.update_item(item_id, request).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Deactivate an item
async fn delete_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    _user: AuthUser,
) -> Result<StatusCode, ServiceError> {
    state.services.items.delete_item(item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_item).get(list_items))
        .route("/low-stock", get(list_low_stock))
        .route(
            "/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
}
