//! Application state and router assembly (C9): CORS, request logging, the
//! global error envelope, and endpoint mounting.

use crate::billing::BillingService;
use crate::config::{Config, EnvMode};
use crate::credentials::CredentialRegistry;
use crate::error::GatewayError;
use crate::llm::LlmProxy;
use crate::providers::ProviderRegistry;
use crate::search::{ImageSearchAdapter, WebSearchAdapter};
use axum::http::{HeaderValue, Method};
use axum::response::IntoResponse;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub env_mode: EnvMode,
    pub providers: Arc<ProviderRegistry>,
    pub billing: Arc<BillingService>,
    pub llm: Arc<LlmProxy>,
    pub credentials: Option<CredentialRegistry>,
    pub web_search: Option<WebSearchAdapter>,
    pub image_search: Option<ImageSearchAdapter>,
    /// Whether a bearer token with no credential-store match is treated as
    /// a raw account id. Disabled by default once the deployment is
    /// `production`.
    pub allow_legacy_account_fallback: bool,
}

/// Known localhost origins always allowed in dev mode, in addition to
/// whatever the deployment names explicitly via its origin allow-list.
const DEV_LOCALHOST_ORIGINS: &[&str] = &["http://localhost:3000", "http://127.0.0.1:3000"];

fn cors_layer(env_mode: EnvMode, allowed_origins: &[String]) -> CorsLayer {
    let mut layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any);

    let mut origins: Vec<HeaderValue> = allowed_origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()).collect();
    if env_mode.is_dev_mode() {
        origins.extend(DEV_LOCALHOST_ORIGINS.iter().filter_map(|o| HeaderValue::from_str(o).ok()));
    }

    if origins.is_empty() {
        layer
    } else {
        layer = layer.allow_origin(origins);
        layer
    }
}

async fn not_found() -> impl IntoResponse {
    GatewayError::NotFound("no such route".to_string()).into_response()
}

/// Builds the fully-wired application state from process configuration.
/// Fallible only on the pieces that are strictly required to boot (the LLM
/// proxy always needs a provider registry and a billing service; both can
/// be constructed even with zero providers configured, deferring the
/// "no provider" failure to request time.
pub fn build_state(config: &Config) -> Arc<AppState> {
    let providers = Arc::new(ProviderRegistry::from_env(config));

    let ledger: Arc<dyn crate::ledger::LedgerAdapter> = if config.has_direct_ledger() {
        Arc::new(crate::ledger::DirectLedger::new(
            config.supabase_url.clone().unwrap_or_default(),
            config.supabase_service_role_key.clone().unwrap_or_default(),
        ))
    } else if config.has_http_ledger() {
        Arc::new(crate::ledger::HttpLedger::new(
            config.backend_api_url.clone().unwrap_or_default(),
            config.backend_api_key.clone(),
        ))
    } else {
        log::warn!("no ledger configured; all non-test, non-dev-mode billing will report insufficient credits");
        Arc::new(crate::ledger::HttpLedger::new(String::new(), None))
    };

    let billing = Arc::new(BillingService::new(ledger, config.env_mode));
    let llm = Arc::new(LlmProxy::new(providers.clone(), billing.clone()));

    let credentials = if config.has_direct_ledger() && config.api_key_secret.is_some() {
        let store = crate::credentials::SupabaseCredentialStore::new(
            config.supabase_url.clone().unwrap_or_default(),
            config.supabase_service_role_key.clone().unwrap_or_default(),
        );
        let crypto = crate::crypto::Crypto::new(config.api_key_secret.clone().unwrap_or_default());
        Some(CredentialRegistry::new(Box::new(store), crypto))
    } else {
        None
    };

    let web_search = config
        .provider("brave")
        .and_then(|e| e.api_key.clone())
        .map(WebSearchAdapter::new);
    let image_search = config
        .provider("brave")
        .and_then(|e| e.api_key.clone())
        .map(ImageSearchAdapter::new);

    Arc::new(AppState {
        env_mode: config.env_mode,
        providers,
        billing,
        llm,
        credentials,
        web_search,
        image_search,
        allow_legacy_account_fallback: !matches!(config.env_mode, EnvMode::Production),
    })
}

pub fn build_router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    let cors = cors_layer(state.env_mode, allowed_origins);

    crate::routes::router()
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

