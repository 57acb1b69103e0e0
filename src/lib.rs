/*!
 * Back-office API for a retail point-of-sale system.
 *
 * The HTTP surface lives under `/api/v1`. Sales are the core of the
 * system: recording one atomically decrements stock for every line,
 * and reversing one puts the stock back. Pending sales open a payment
 * due that the payments endpoints track until settled.
 */

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use axum::{extract::State, routing::get, Extension, Json, Router};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthRouterExt, AuthService};

/// App state shared across every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// Common response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Routes under `/api/v1`.
///
/// The status and health probes stay open; everything else sits behind
/// the bearer-token middleware.
pub fn api_v1_routes() -> Router<AppState> {
    let protected = Router::new()
        .nest("/sales", handlers::sales::sale_routes())
        .nest("/payments", handlers::payments::payment_routes())
        .nest("/items", handlers::items::item_routes())
        .nest("/users", handlers::users::user_routes())
        .with_auth();

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(protected)
}

/// Builds the full application router
pub fn create_app(state: AppState, auth_service: Arc<AuthService>) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes())
        .layer(Extension(auth_service))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "service": "retail-pos-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
