//! `GET /v1/models` and `GET /v1/models/:id` — reads from the in-memory
//! model catalog built by the provider registry (C5).

use crate::app::AppState;
use crate::auth::Identity;
use crate::error::{GatewayError, GatewayResult};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

pub async fn list_models(State(state): State<Arc<AppState>>, _identity: Identity) -> impl IntoResponse {
    let models: Vec<_> = state
        .providers
        .models()
        .map(|(id, cfg)| {
            json!({
                "id": id,
                "provider": cfg.provider_binding,
                "input_per_1m_tokens": cfg.input_per_1m_tokens,
                "output_per_1m_tokens": cfg.output_per_1m_tokens,
                "context_window": cfg.context_window,
                "tier": cfg.tier,
            })
        })
        .collect();
    Json(json!({ "data": models }))
}

pub async fn get_model(
    State(state): State<Arc<AppState>>,
    _identity: Identity,
    Path(id): Path<String>,
) -> GatewayResult<impl IntoResponse> {
    let cfg = state.providers.model_config(&id).ok_or_else(|| GatewayError::NotFound(format!("unknown model id {id}")))?;
    Ok(Json(json!({
        "id": id,
        "provider": cfg.provider_binding,
        "input_per_1m_tokens": cfg.input_per_1m_tokens,
        "output_per_1m_tokens": cfg.output_per_1m_tokens,
        "context_window": cfg.context_window,
        "tier": cfg.tier,
    })))
}
