//! Router, app builder and server runtime.

use anyhow::Context;
use astrobadge_core::BadgePayload;
use astrobadge_verifier::{Ed25519ReportVerifier, TrustedKeys};
use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        DefaultBodyLimit, Query, State,
    },
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::error::ApiError;
use crate::logging::{log_requests, RequestLogger};
use crate::store::open_store;

#[derive(Clone)]
struct AppState {
    dispatcher: Dispatcher,
}

#[derive(Debug, Deserialize)]
struct BadgeQuery {
    owner: Option<String>,
    name: Option<String>,
}

/// Build the router over an explicit dispatcher.
///
/// Routes:
/// - `POST /` - ingest a signed trust report
/// - `GET /shields?owner=&name=` - badge payload for a repository
/// - `GET /health` - liveness probe
pub fn router(dispatcher: Dispatcher, logger: RequestLogger, max_report_bytes: usize) -> Router {
    Router::new()
        .route("/", post(post_report))
        .route("/shields", get(get_shields))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_report_bytes))
        .layer(middleware::from_fn_with_state(logger, log_requests))
        .layer(CorsLayer::permissive())
        .with_state(AppState { dispatcher })
}

/// Open the configured store and verifier and wire them into a dispatcher.
pub async fn build_dispatcher(config: &ServerConfig) -> anyhow::Result<Dispatcher> {
    let trusted = TrustedKeys::parse(&config.trusted_keys).context("Invalid trusted keys")?;
    info!("Trusting {} signer key(s)", trusted.len());

    let store = open_store(&config.store).await?;
    Ok(Dispatcher::new(
        store,
        Arc::new(Ed25519ReportVerifier::new(trusted)),
        config.message_style,
    ))
}

/// Build an in-process API router from explicit runtime config.
pub async fn build_app(config: &ServerConfig) -> anyhow::Result<Router> {
    let dispatcher = build_dispatcher(config).await?;
    Ok(router(
        dispatcher,
        RequestLogger::new(config.log_errors_only),
        config.max_report_bytes,
    ))
}

/// Run the API server with explicit runtime configuration.
pub async fn run_with_config(config: ServerConfig) -> anyhow::Result<()> {
    config.validate()?;
    let dispatcher = build_dispatcher(&config).await?;
    let store = Arc::clone(dispatcher.store());
    let app = router(
        dispatcher,
        RequestLogger::new(config.log_errors_only),
        config.max_report_bytes,
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        "Astrobadge API listening on {} (store: {}, style: {})",
        addr,
        store.backend(),
        config.message_style
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    store.close().await;
    info!("Astrobadge API shutdown complete");
    Ok(())
}

/// Run the API server using environment-driven configuration.
pub async fn run_from_env() -> anyhow::Result<()> {
    run_with_config(ServerConfig::from_env()?).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
            }
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

async fn health() -> &'static str {
    "OK"
}

async fn post_report(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let body = body.map_err(|e| {
        ApiError::malformed_input(format!("Failed to read request body: {}", e)).at_stage("decode")
    })?;

    let stored = state.dispatcher.ingest(&body).await?;
    Ok((StatusCode::CREATED, Json(stored.into_document())))
}

async fn get_shields(
    State(state): State<AppState>,
    query: Result<Query<BadgeQuery>, QueryRejection>,
) -> Result<Json<BadgePayload>, ApiError> {
    let Query(query) =
        query.map_err(|e| ApiError::malformed_input(format!("Invalid query: {}", e)))?;

    let badge = state
        .dispatcher
        .badge(query.owner.as_deref(), query.name.as_deref())
        .await?;
    Ok(Json(badge))
}
