//! Axum HTTP server exposing the prompt and queue endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::planner::fallback_commands;
use crate::state::GatewayState;

/// Start the gateway HTTP server: the prompt API, the plugin queue endpoint,
/// and the embedded prompt form at `/`.
pub async fn start_gateway(state: Arc<GatewayState>, bind: &str, port: u16) -> anyhow::Result<()> {
    let app = router(state);

    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: Arc<GatewayState>) -> Router {
    // API routes are registered first so they take priority over the UI catch-all
    Router::new()
        .route("/health", get(health_handler))
        .route("/prompts", post(prompt_handler))
        .route("/commands", post(command_handler))
        .route("/commands/next", get(next_command_handler))
        .with_state(state)
        .merge(crate::ui::ui_router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Deserialize)]
struct PromptRequest {
    #[serde(default)]
    prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstructionRequest {
    #[serde(default)]
    instruction: Option<String>,
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "queued": state.queue.len().await,
        "planner": state.planner.id(),
    }))
}

async fn prompt_handler(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<PromptRequest>,
) -> impl IntoResponse {
    let Some(prompt) = req.prompt.filter(|p| !p.is_empty()) else {
        return prompt_missing();
    };

    info!(prompt = %prompt, "Prompt received");
    let commands = plan_or_fallback(&state, &prompt).await;
    let queued = state.queue.push_all(commands).await;

    (
        StatusCode::OK,
        Json(json!({"status": "ok", "queued_count": queued})),
    )
}

/// Frontend-form variant: plans like `/prompts` but echoes the first planned
/// command back so the form can render it.
async fn command_handler(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<InstructionRequest>,
) -> impl IntoResponse {
    let Some(instruction) = req.instruction.filter(|p| !p.is_empty()) else {
        return prompt_missing();
    };

    info!(prompt = %instruction, "Instruction received");
    let commands = plan_or_fallback(&state, &instruction).await;
    let first = commands.first().cloned().unwrap_or(Value::Null);
    state.queue.push_all(commands).await;

    (StatusCode::OK, Json(json!({"command": first})))
}

async fn next_command_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    match state.queue.pop().await {
        Some(cmd) => {
            let age_ms = (Utc::now() - cmd.queued_at).num_milliseconds();
            debug!(id = %cmd.id, age_ms, "Command collected");
            Json(cmd.payload)
        }
        None => Json(json!({"status": "no-command"})),
    }
}

async fn plan_or_fallback(state: &GatewayState, prompt: &str) -> Vec<Value> {
    match state.planner.plan(prompt).await {
        Ok(commands) => commands,
        Err(e) => {
            warn!(%e, "Planning failed, queueing fallback");
            fallback_commands(&e)
        }
    }
}

fn prompt_missing() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"status": "error", "msg": "Prompt missing"})),
    )
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Shutdown signal received");
}
