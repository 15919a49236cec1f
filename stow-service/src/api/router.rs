use super::handlers::envelope::handle_ucan;
use super::handlers::info::{handle_did_document, handle_health, handle_info};
use super::handlers::receipt::handle_receipt;
use super::middleware::correlation::correlation_middleware;
use super::middleware::logging::logging_middleware;
use super::state::ApiState;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use stow_core::foundation::{Result, UploadError};
use tokio::net::TcpListener;

pub async fn run_server(addr: SocketAddr, state: Arc<ApiState>) -> Result<()> {
    info!("binding upload service addr={}", addr);
    let app = build_router(state);
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server ready and accepting connections addr={}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| {
            error!("HTTP server terminated unexpectedly addr={} error={}", addr, err);
            UploadError::Message(err.to_string())
        })
}

pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(handle_info).post(handle_ucan))
        .route("/health", get(handle_health))
        .route("/.well-known/did.json", get(handle_did_document))
        .route("/receipt/:cid", get(handle_receipt))
        .layer(DefaultBodyLimit::max(8 * 1024 * 1024))
        .layer(axum::middleware::from_fn(logging_middleware))
        .layer(axum::middleware::from_fn(correlation_middleware))
        .with_state(state)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down server");
    }
}
