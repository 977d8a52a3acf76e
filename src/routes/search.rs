//! `POST /web-search` and `POST /image-search`.

use crate::app::AppState;
use crate::auth::Identity;
use crate::error::{GatewayError, GatewayResult};
use crate::providers::pricing::{self, TOOL_IMAGE_SEARCH, TOOL_WEB_SEARCH_ADVANCED, TOOL_WEB_SEARCH_BASIC};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

fn default_max_results_web() -> u32 {
    5
}

fn default_search_depth() -> String {
    "basic".to_string()
}

#[derive(Deserialize)]
pub struct WebSearchRequest {
    query: String,
    #[serde(default = "default_max_results_web")]
    max_results: u32,
    #[serde(default = "default_search_depth")]
    search_depth: String,
    #[serde(default)]
    session_id: Option<String>,
}

pub async fn web_search(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(req): Json<WebSearchRequest>,
) -> GatewayResult<impl IntoResponse> {
    if req.query.trim().is_empty() {
        return Err(GatewayError::BadRequest("query must not be empty".to_string()));
    }
    let max_results = req.max_results.clamp(1, 10);

    let tool = if req.search_depth == "advanced" { TOOL_WEB_SEARCH_ADVANCED } else { TOOL_WEB_SEARCH_BASIC };
    let pricing_table = pricing::tool_pricing_table();
    let tool_pricing = pricing_table.get(tool).copied().ok_or_else(|| GatewayError::Config(format!("no pricing for {tool}")))?;

    let check = state.billing.check_credits(&identity.account_id, 0.01).await;
    if !check.has_credits {
        return Err(GatewayError::InsufficientCredits(check.message));
    }

    let adapter = state.web_search.as_ref().ok_or_else(|| GatewayError::Config("web search is not configured".to_string()))?;
    let results = adapter.execute(&req.query, max_results).await?;

    let cost = tool_pricing.cost(results.len());
    let description = pricing::humanize_tool_name(tool);
    let debit = state.billing.deduct_credits(&identity.account_id, cost, &description, req.session_id.as_deref()).await;
    if !debit.success {
        log::warn!("web search debit failed for {}: {:?}", identity.account_id, debit.reason);
    }

    Ok(Json(json!({
        "results": results,
        "query": req.query,
        "cost": if identity.is_test { 0.0 } else { cost },
    })))
}

fn default_max_results_image() -> u32 {
    5
}

fn default_safe_search() -> bool {
    true
}

#[derive(Deserialize)]
pub struct ImageSearchRequest {
    query: String,
    #[serde(default = "default_max_results_image")]
    max_results: u32,
    #[serde(default = "default_safe_search")]
    safe_search: bool,
    #[serde(default)]
    session_id: Option<String>,
}

pub async fn image_search(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(req): Json<ImageSearchRequest>,
) -> GatewayResult<impl IntoResponse> {
    if req.query.trim().is_empty() {
        return Err(GatewayError::BadRequest("query must not be empty".to_string()));
    }
    let max_results = req.max_results.clamp(1, 20);

    let pricing_table = pricing::tool_pricing_table();
    let tool_pricing = pricing_table
        .get(TOOL_IMAGE_SEARCH)
        .copied()
        .ok_or_else(|| GatewayError::Config("no pricing for image_search".to_string()))?;

    let check = state.billing.check_credits(&identity.account_id, 0.01).await;
    if !check.has_credits {
        return Err(GatewayError::InsufficientCredits(check.message));
    }

    let adapter = state.image_search.as_ref().ok_or_else(|| GatewayError::Config("image search is not configured".to_string()))?;
    let results = adapter.execute(&req.query, max_results, req.safe_search).await?;

    let cost = tool_pricing.cost(results.len());
    let description = pricing::humanize_tool_name(TOOL_IMAGE_SEARCH);
    let debit = state.billing.deduct_credits(&identity.account_id, cost, &description, req.session_id.as_deref()).await;
    if !debit.success {
        log::warn!("image search debit failed for {}: {:?}", identity.account_id, debit.reason);
    }

    Ok(Json(json!({
        "results": results,
        "query": req.query,
        "cost": if identity.is_test { 0.0 } else { cost },
    })))
}
