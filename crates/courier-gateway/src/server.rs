// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. Authentication is
//! delegated to an upstream layer and absent here.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use courier_core::{CourierError, DurableStore, OfflineStore};
use courier_engine::{ConnectionRegistry, MessageDispatcher};

use crate::handlers;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Ingest-side dispatcher (persist + enqueue + compensation).
    pub dispatcher: Arc<MessageDispatcher>,
    /// Durable store, read by the history listing.
    pub store: Arc<dyn DurableStore>,
    /// Offline result store, read by polling and the reconnect drain.
    pub offline: Arc<dyn OfflineStore>,
    /// Live connection registry.
    pub registry: Arc<ConnectionRegistry>,
    /// Process start time for the health endpoint.
    pub start_time: std::time::Instant,
}

/// Gateway server bind configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Assemble the route table over the shared state.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/send-message", post(handlers::post_send_message))
        .route("/query-result", get(handlers::get_query_result))
        .route("/messages", get(handlers::get_messages))
        .route("/health", get(handlers::get_health))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Bind and serve until the cancellation token fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), CourierError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CourierError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    info!(addr = addr.as_str(), "gateway server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| CourierError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
