//! # Aegis - Conversational Insurance Assistant
//!
//! Aegis is the backend for the Aegis Assurances virtual assistant. It serves
//! a streaming chat endpoint speaking the AI SDK UI message stream protocol,
//! with a tool-calling agent loop over the insurance database and the
//! external quote service.
//!
//! ## Features
//!
//! - **Streaming Chat**: Server-sent events compatible with AI SDK clients
//! - **Tool Calling**: Client, contract, claim, and product lookups plus quotes
//! - **Multi-model**: Routed through an OpenAI-compatible gateway
//! - **Metrics**: Prometheus metrics for monitoring
//! - **Health Checks**: Kubernetes-ready health endpoints
//! - **Validation**: Configuration validation at startup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aegis::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let settings = Settings::new()?;
//!
//!     // Server will start on configured host:port
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Agent**: Model-agnostic chat loop, tool dispatch, LLM gateway client
//! - **Tools**: Insurance domain tools the model can call
//! - **Protocol**: UI message stream event encoding
//! - **Persistence**: sqlx-backed insurance store
//! - **Adapters**: HTTP handlers (chat, health, metrics)

pub mod adapters;
pub mod agent;
pub mod cli;
pub mod config;
pub mod persistence;
pub mod prompt;
pub mod protocol;
pub mod text;
pub mod tools;

use crate::adapters::chat_handler::{self, AppState};
use crate::adapters::health_handler::HealthHandler;
use crate::adapters::metrics_handler::MetricsHandler;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Creates the Axum application router with all endpoints configured.
///
/// # Arguments
///
/// * `app_state` - Shared chat session, metrics, and model catalog state
/// * `health_handler` - Health check handler
/// * `metrics_handler` - Metrics collection handler
///
/// # Returns
///
/// Configured Axum Router
pub fn create_app(
    app_state: AppState,
    health_handler: Arc<HealthHandler>,
    metrics_handler: Arc<MetricsHandler>,
) -> Router {
    let router = Router::new()
        // Health check endpoints
        .route(
            "/health",
            get({
                let handler = health_handler.clone();
                move || {
                    let h = handler.clone();
                    async move { h.health().await }
                }
            }),
        )
        .route(
            "/health/ready",
            get({
                let handler = health_handler.clone();
                move || {
                    let h = handler.clone();
                    async move { h.ready().await }
                }
            }),
        )
        .route(
            "/health/live",
            get({
                let handler = health_handler.clone();
                move || {
                    let h = handler.clone();
                    async move { h.live().await }
                }
            }),
        )
        // Metrics endpoint
        .route(
            "/metrics",
            get({
                let handler = metrics_handler.clone();
                move || {
                    let h = handler.clone();
                    async move { h.metrics().await }
                }
            }),
        )
        // Chat API
        .nest(
            "/api",
            Router::new()
                .route("/chat", post(chat_handler::chat))
                .route("/models", get(chat_handler::list_models))
                .with_state(app_state),
        );

    router.layer(
        tower_http::cors::CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    )
}
