//! `POST /v1/chat/completions` — thin HTTP wrapper around the LLM proxy
//! (C7); the credit check happens here so a 402 short-circuits before any
//! upstream call is made.

use crate::app::AppState;
use crate::auth::Identity;
use crate::error::{GatewayError, GatewayResult};
use crate::types::ChatRequest;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(request): Json<ChatRequest>,
) -> GatewayResult<impl IntoResponse> {
    if request.messages.is_empty() {
        return Err(GatewayError::BadRequest("messages must not be empty".to_string()));
    }

    let check = state.billing.check_credits(&identity.account_id, 0.01).await;
    if !check.has_credits {
        return Err(GatewayError::InsufficientCredits(check.message));
    }

    state.llm.proxy(request, &identity.account_id).await
}
