use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::HeaderValue;
use tokio::sync::mpsc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use retail_pos_api::auth::{AuthConfig, AuthService};
use retail_pos_api::config;
use retail_pos_api::db;
use retail_pos_api::events::{self, EventSender};
use retail_pos_api::handlers::AppServices;
use retail_pos_api::{create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config().context("failed to load configuration")?;

    config::init_tracing(cfg.log_level(), cfg.log_json);
    info!(environment = %cfg.environment, "Starting retail-pos-api");

    let db_pool = Arc::new(
        db::establish_connection_from_app_config(&cfg)
            .await
            .context("failed to connect to the database")?,
    );

    if cfg.auto_migrate {
        db::run_migrations(&db_pool)
            .await
            .context("failed to run database migrations")?;
    }

    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = EventSender::new(event_tx);
    tokio::spawn(events::process_events(event_rx));

    let services = AppServices::new(
        db_pool.clone(),
        Arc::new(event_sender.clone()),
        cfg.payment_due_grace_days,
    );

    let auth_service = Arc::new(AuthService::new(AuthConfig::new(
        cfg.jwt_secret.clone(),
        Duration::from_secs(cfg.jwt_expiration as u64),
    )));

    let state = AppState {
        db: db_pool.clone(),
        config: cfg.clone(),
        event_sender,
        services,
    };

    let app = create_app(state, auth_service).layer(build_cors_layer(&cfg));

    let addr = format!("{}:{}", cfg.host, cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db::close_pool((*db_pool).clone()).await.ok();

    info!("Shutdown complete");
    Ok(())
}

fn build_cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    if cfg.has_cors_allowed_origins() {
        let origins: Vec<HeaderValue> = cfg
            .cors_allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(|origin| {
                let origin = origin.trim();
                if origin.is_empty() {
                    return None;
                }
                match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %origin, "Ignoring unparsable CORS origin");
                        None
                    }
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.should_allow_permissive_cors() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => warn!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
