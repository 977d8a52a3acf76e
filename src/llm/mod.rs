//! LLM proxy (C7): model resolution, request translation, streaming
//! passthrough, and usage-driven billing — the hard part of the gateway.

pub mod streaming;
pub mod translate;
pub mod usage;

use crate::billing::BillingService;
use crate::error::GatewayError;
use crate::http_client::shared_http_client;
use crate::providers::{AuthStyle, Dialect, ProviderBinding, ProviderRegistry};
use crate::types::ChatRequest;
use axum::body::Body;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::sync::Arc;
use usage::UsageCapture;

const PROVIDER_HEADER: &str = "x-kortix-provider";

pub struct LlmProxy {
    providers: Arc<ProviderRegistry>,
    billing: Arc<BillingService>,
}

impl LlmProxy {
    pub fn new(providers: Arc<ProviderRegistry>, billing: Arc<BillingService>) -> Self {
        Self { providers, billing }
    }

    /// Single entry point; diverges on `request.stream`.
    pub async fn proxy(&self, request: ChatRequest, account_id: &str) -> Result<Response, GatewayError> {
        let resolved = self
            .providers
            .resolve(&request.model)
            .ok_or_else(|| GatewayError::Upstream { status: 502, snippet: "no provider configured".to_string() })?;

        let binding = self
            .providers
            .binding(&resolved.provider)
            .ok_or_else(|| GatewayError::Config(format!("unknown provider {}", resolved.provider)))?;

        let (input_per_1m, output_per_1m) = resolved
            .model_config
            .as_ref()
            .map(|c| (c.input_per_1m_tokens, c.output_per_1m_tokens))
            .unwrap_or((0.0, 0.0));
        let is_aggregator = resolved.provider == crate::providers::AGGREGATOR;

        if request.stream {
            self.proxy_streaming(
                request,
                &resolved.provider_model_id,
                binding,
                account_id,
                is_aggregator,
                input_per_1m,
                output_per_1m,
            )
            .await
        } else {
            self.proxy_non_streaming(
                request,
                &resolved.provider_model_id,
                binding,
                account_id,
                is_aggregator,
                input_per_1m,
                output_per_1m,
            )
            .await
        }
    }

    fn apply_auth(binding: &ProviderBinding, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = binding.api_key.as_deref().unwrap_or("");
        req = match &binding.auth_style {
            AuthStyle::Bearer => req.header("Authorization", format!("Bearer {key}")),
            AuthStyle::ApiKeyHeader { header_name } => req.header(*header_name, key),
            AuthStyle::None => req,
        };
        for (name, value) in &binding.extra_headers {
            req = req.header(name.as_str(), value.as_str());
        }
        req
    }

    /// Builds the upstream JSON body for the OpenAI-compatible dialect:
    /// pass through unchanged except `model` rewritten and `session_id`
    /// stripped.
    fn openai_compatible_body(request: &ChatRequest, provider_model_id: &str) -> Result<Value, GatewayError> {
        let mut body = serde_json::to_value(request).map_err(|e| GatewayError::Internal(e.to_string()))?;
        body["model"] = Value::String(provider_model_id.to_string());
        if let Value::Object(map) = &mut body {
            map.remove("session_id");
        }
        Ok(body)
    }

    async fn proxy_non_streaming(
        &self,
        request: ChatRequest,
        provider_model_id: &str,
        binding: &ProviderBinding,
        account_id: &str,
        is_aggregator: bool,
        input_per_1m: f64,
        output_per_1m: f64,
    ) -> Result<Response, GatewayError> {
        let session_id = request.session_id.clone();
        let markup = crate::providers::pricing::DEFAULT_MARKUP;

        let (url, body, dialect) = match binding.dialect {
            Dialect::Anthropic => (
                format!("{}/messages", binding.base_url),
                translate::request_to_anthropic(&request),
                Dialect::Anthropic,
            ),
            Dialect::OpenAiCompatible => (
                format!("{}/chat/completions", binding.base_url),
                Self::openai_compatible_body(&request, provider_model_id)?,
                Dialect::OpenAiCompatible,
            ),
        };

        let req = Self::apply_auth(binding, shared_http_client().post(&url)).json(&body);
        let resp = req.send().await.map_err(|e| GatewayError::Internal(e.to_string()))?;
        let status = resp.status();

        if !status.is_success() {
            let snippet: String = resp.text().await.unwrap_or_default().chars().take(500).collect();
            return Err(GatewayError::Upstream { status: status.as_u16(), snippet });
        }

        let upstream_body: Value = resp.json().await.map_err(|e| GatewayError::Internal(e.to_string()))?;

        let (response_body, token_usage) = match dialect {
            Dialect::Anthropic => translate::anthropic_response_to_openai(&upstream_body, &request.model),
            Dialect::OpenAiCompatible => {
                let usage = translate::extract_openai_usage(&upstream_body);
                (upstream_body, usage)
            }
        };

        let cost = crate::providers::pricing::calculate_llm_cost(
            is_aggregator,
            token_usage.input_tokens,
            token_usage.output_tokens,
            token_usage.provider_reported_cost,
            input_per_1m,
            output_per_1m,
            markup,
        );
        let description = BillingService::llm_description(&request.model, token_usage.input_tokens, token_usage.output_tokens);
        let debit = self.billing.deduct_credits(account_id, cost, &description, session_id.as_deref()).await;
        if !debit.success {
            log::warn!("non-streaming LLM debit failed for {account_id}: {:?}", debit.reason);
        }

        let mut response = axum::Json(response_body).into_response();
        response.headers_mut().insert(
            PROVIDER_HEADER,
            HeaderValue::from_str(&binding.name).unwrap_or_else(|_| HeaderValue::from_static("unknown")),
        );
        Ok(response)
    }

    async fn proxy_streaming(
        &self,
        request: ChatRequest,
        provider_model_id: &str,
        binding: &ProviderBinding,
        account_id: &str,
        is_aggregator: bool,
        input_per_1m: f64,
        output_per_1m: f64,
    ) -> Result<Response, GatewayError> {
        let session_id = request.session_id.clone();
        let markup = crate::providers::pricing::DEFAULT_MARKUP;
        let model_name = request.model.clone();

        let (url, body, dialect) = match binding.dialect {
            Dialect::Anthropic => (
                format!("{}/messages", binding.base_url),
                translate::request_to_anthropic(&request),
                Dialect::Anthropic,
            ),
            Dialect::OpenAiCompatible => (
                format!("{}/chat/completions", binding.base_url),
                Self::openai_compatible_body(&request, provider_model_id)?,
                Dialect::OpenAiCompatible,
            ),
        };

        let req = Self::apply_auth(binding, shared_http_client().post(&url)).json(&body);
        let resp = req.send().await.map_err(|e| GatewayError::Internal(e.to_string()))?;
        let status = resp.status();

        // If the upstream fails before the first chunk, a 502 envelope is
        // returned instead of starting a stream.
        if !status.is_success() {
            let snippet: String = resp.text().await.unwrap_or_default().chars().take(500).collect();
            return Err(GatewayError::Upstream { status: status.as_u16(), snippet });
        }

        let usage = UsageCapture::new();
        let guard = StreamBillingGuard {
            billing: self.billing.clone(),
            account: account_id.to_string(),
            model: model_name,
            is_aggregator,
            pricing: (input_per_1m, output_per_1m, markup),
            session_id,
            usage: usage.clone(),
        };

        let inner: std::pin::Pin<Box<dyn futures_util::Stream<Item = Result<bytes::Bytes, std::io::Error>> + Send>> =
            match dialect {
                Dialect::Anthropic => Box::pin(streaming::anthropic_to_openai_stream(resp, usage, request.model.clone())),
                Dialect::OpenAiCompatible => Box::pin(streaming::openai_passthrough_stream(resp, usage)),
            };

        let billed = Billed { inner, _guard: guard };
        let body = Body::from_stream(billed);

        let mut response = Response::new(body);
        *response.status_mut() = StatusCode::OK;
        response.headers_mut().insert("content-type", HeaderValue::from_static("text/event-stream"));
        response.headers_mut().insert(
            PROVIDER_HEADER,
            HeaderValue::from_str(&binding.name).unwrap_or_else(|_| HeaderValue::from_static("unknown")),
        );
        Ok(response)
    }
}

/// Fires the post-stream billing debit when dropped — covers both a clean
/// stream end (the wrapping `Billed` stream is dropped once `Body` finishes
/// consuming it) and client cancellation (the body, and this guard with it,
/// is dropped early). Best-effort: bills whatever usage was captured,
/// never blocking or failing the response.
struct StreamBillingGuard {
    billing: Arc<BillingService>,
    account: String,
    model: String,
    is_aggregator: bool,
    pricing: (f64, f64, f64),
    session_id: Option<String>,
    usage: UsageCapture,
}

impl Drop for StreamBillingGuard {
    fn drop(&mut self) {
        let billing = self.billing.clone();
        let account = self.account.clone();
        let model = self.model.clone();
        let usage = self.usage.snapshot();
        let is_aggregator = self.is_aggregator;
        let (input_per_1m, output_per_1m, markup) = self.pricing;
        let session_id = self.session_id.clone();

        tokio::spawn(async move {
            let cost = crate::providers::pricing::calculate_llm_cost(
                is_aggregator,
                usage.input_tokens,
                usage.output_tokens,
                usage.provider_reported_cost,
                input_per_1m,
                output_per_1m,
                markup,
            );
            let description = BillingService::llm_description(&model, usage.input_tokens, usage.output_tokens);
            let result = billing.deduct_credits(&account, cost, &description, session_id.as_deref()).await;
            if !result.success {
                log::warn!("streaming LLM debit failed for {account}: {:?}", result.reason);
            }
        });
    }
}

struct Billed {
    inner: std::pin::Pin<Box<dyn futures_util::Stream<Item = Result<bytes::Bytes, std::io::Error>> + Send>>,
    _guard: StreamBillingGuard,
}

impl futures_util::Stream for Billed {
    type Item = Result<bytes::Bytes, std::io::Error>;

    fn poll_next(self: std::pin::Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> std::task::Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.inner.as_mut().poll_next(cx)
    }
}
