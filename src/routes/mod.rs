//! Route table for the HTTP surface.

mod chat;
mod health;
mod models;
mod search;

use crate::app::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health))
        .route("/web-search", post(search::web_search))
        .route("/image-search", post(search::image_search))
        .route("/v1/chat/completions", post(chat::chat_completions))
        .route("/v1/models", get(models::list_models))
        .route("/v1/models/{id}", get(models::get_model))
}
