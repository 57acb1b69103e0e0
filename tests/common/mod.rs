use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use retail_pos_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    services::items::CreateItemRequest,
    services::users::CreateUserRequest,
    AppState,
};

/// Harness that spins up the full router over a private SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    token: String,
    _db_dir: tempfile::TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("retail_pos_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            cfg.payment_due_grace_days,
        );

        let auth_service = Arc::new(AuthService::new(AuthConfig::new(
            cfg.jwt_secret.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
        )));

        let token = auth_service
            .generate_token(
                Uuid::new_v4(),
                Some("Test Admin".to_string()),
                vec!["admin".to_string()],
            )
            .expect("mint access token for tests");

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = retail_pos_api::create_app(state.clone(), auth_service);

        Self {
            router,
            state,
            token,
            _db_dir: db_dir,
            _event_task: event_task,
        }
    }

    /// Access the bearer token for the default admin user.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for authenticated JSON requests.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    /// Seed a cashier and return their ID.
    pub async fn seed_cashier(&self, username: &str) -> Uuid {
        let user = self
            .state
            .services
            .users
            .create_user(CreateUserRequest {
                username: username.to_string(),
                email: format!("{}@example.com", username),
            })
            .await
            .expect("seed cashier for tests");
        user.id
    }

    /// Seed a catalog item and return its ID.
    pub async fn seed_item(&self, sku: &str, price: Decimal, stock: Decimal) -> Uuid {
        let item = self
            .state
            .services
            .items
            .create_item(CreateItemRequest {
                name: format!("Test Item {}", sku),
                sku: sku.to_string(),
                price,
                cost: price,
                stock,
                min_stock_level: Decimal::ZERO,
            })
            .await
            .expect("seed item for tests");
        item.id
    }

    /// Read an item's current stock straight from the service layer.
    pub async fn item_stock(&self, item_id: Uuid) -> Decimal {
        self.state
            .services
            .items
            .get_item(item_id)
            .await
            .expect("item should exist")
            .stock
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Parse a JSON field that carries a decimal as either a string or a number.
pub fn dec_field(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string field"),
        Value::Number(n) => n.to_string().parse().expect("decimal number field"),
        other => panic!("expected a decimal field, got {}", other),
    }
}

/// Deserialize a response body into JSON.
pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}

/// Assert a status code, dumping the body on mismatch.
pub async fn assert_status(response: axum::response::Response, expected: StatusCode) -> Value {
    let status = response.status();
    let body = response_json(response).await;
    assert_eq!(status, expected, "unexpected status, body: {}", body);
    body
}
