//! HTTP front end
//!
//! # Endpoints
//!
//! - POST /           - project-builder mode `{prompt, auto_run}`
//! - POST /agent      - agent mode `{prompt}`
//! - GET  /api/status - provider and conversation status
//!
//! Agent requests share one orchestrator behind a mutex, so concurrent calls
//! are handled one at a time in arrival order.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use sdk::errors::{EngineError, ErrorExt};

use crate::agent::SharedOrchestrator;
use crate::llm::LLMProvider;
use crate::tools::ToolRegistry;

/// State shared by all handlers
#[derive(Clone)]
pub struct ServerState {
    pub orchestrator: SharedOrchestrator,
    pub tools: Arc<ToolRegistry>,
    pub provider: Arc<dyn LLMProvider>,
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    prompt: String,

    #[serde(default)]
    auto_run: bool,
}

#[derive(Debug, Deserialize)]
struct AgentRequest {
    #[serde(default)]
    prompt: String,
}

/// Error body `{ "error": ... }`
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{} ({})", err, err.user_hint()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", post(generate_handler))
        .route("/agent", post(agent_handler))
        .route("/api/status", get(status_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl+C.
pub async fn serve(addr: SocketAddr, state: ServerState) -> Result<(), EngineError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| EngineError::Network(format!("Failed to bind to {}: {}", addr, e)))?;

    let local = listener
        .local_addr()
        .map_err(|e| EngineError::Network(format!("Failed to get local address: {}", e)))?;
    tracing::info!("HTTP server listening on http://{}", local);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("HTTP server shutting down gracefully");
        })
        .await
        .map_err(|e| EngineError::Network(format!("HTTP server error: {}", e)))
}

async fn generate_handler(
    State(state): State<ServerState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("prompt is required"));
    }

    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, auto_run = request.auto_run, "Generate request");

    let report = state.tools.build(&request.prompt, request.auto_run).await?;
    Ok(Json(json!({
        "message": "Project generated successfully",
        "project_dir": report.project_dir,
        "main_file": report.main_file,
        "run_output": report.run_output,
    })))
}

async fn agent_handler(
    State(state): State<ServerState>,
    Json(request): Json<AgentRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("prompt is required"));
    }

    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, "Agent request");

    let outcome = state
        .orchestrator
        .lock()
        .await
        .handle_request(&request.prompt)
        .await;

    Ok(Json(json!({
        "action": outcome.action,
        "fallback": outcome.fallback,
        "result": outcome.output,
        "text": outcome.output.to_string(),
    })))
}

async fn status_handler(State(state): State<ServerState>) -> Json<serde_json::Value> {
    let healthy = state.provider.check_health().await;
    let turns = state.orchestrator.lock().await.memory().len();

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "provider": state.provider.name(),
        "provider_healthy": healthy,
        "conversation_turns": turns,
    }))
}
