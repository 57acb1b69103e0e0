use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::users::{CreateUserRequest, UserResponse};
use crate::{ApiResponse, AppState};

/// Create a user
async fn create_user(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ServiceError> {
    let response = state.services.users.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

/// Get a user by ID
async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, ServiceError> {
    let response = state.services.users.get_user(user_id).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// List users
async fn list_users(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ServiceError> {
    let response = state.services.users.list_users().await?;
    Ok(Json(ApiResponse::success(response)))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user).get(list_users))
        .route("/:id", get(get_user))
}
