//! Server-side code for the PayCall bridge
//!
//! This module contains all backend functionality:
//! - Inbound telephony media stream (WebSocket)
//! - Voice-agent bridging (codec translation + tool-call relay)
//! - Internal payments API client
//! - Call monitoring routes

#![allow(dead_code)]

pub mod bridge;
pub mod call_log;
pub mod payments;

use axum::http::Method;
use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::BridgeConfig;
use crate::models::CallRecord;

/// Application state shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub config: BridgeConfig,
    pub agent: bridge::AgentConnector,
    pub payments: payments::PaymentClient,
    pub call_log: call_log::CallLog,
}

/// Run the bridge server until it fails or is shut down
pub async fn run_server(config: BridgeConfig) -> anyhow::Result<()> {
    let state = AppState {
        agent: bridge::AgentConnector::new(&config),
        payments: payments::PaymentClient::new(
            config.payment_url.clone(),
            config.payment_token.clone(),
        ),
        call_log: call_log::CallLog::new(),
        config: config.clone(),
    };

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("paycall-bridge listening on {}", addr);

    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

/// Create the Axum router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Telephony media stream (WebSocket, one connection per call)
        .route("/media-stream", get(bridge::handle_media_upgrade))
        // Call monitoring
        .route("/api/calls/active", get(get_active_calls))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

// Health check
async fn health_check() -> &'static str {
    "OK"
}

async fn get_active_calls(State(state): State<Arc<AppState>>) -> Json<Vec<CallRecord>> {
    Json(state.call_log.active_calls().await)
}
