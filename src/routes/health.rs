//! `GET /health` — unauthenticated liveness probe.

use crate::app::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "kortix-gateway",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "env": state.env_mode.as_str(),
    }))
}
