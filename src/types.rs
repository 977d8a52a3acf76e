//! Shared data model (spec §3): plain `serde`-derived values with no
//! behavior of their own. Component-specific logic lives in each
//! component's own module; this file only holds the shapes they pass
//! between each other and across the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque billable identity. The gateway reads it from credentials and
/// mutates nothing about it.
pub type AccountId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    Active,
    Revoked,
    Expired,
}

/// A credential record as read from the credential store. `secret_hash` is
/// immutable once created; `status` only ever progresses
/// `Active -> Revoked` or `Active -> Expired`; `last_used_at` is
/// monotonically non-decreasing per `key_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub key_id: String,
    pub public_prefix: String,
    pub secret_hash: String,
    pub account_id: AccountId,
    pub status: CredentialStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Derived balance snapshot. Never cached beyond the call scope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CreditBalance {
    pub balance: f64,
    pub expiring_credits: f64,
    pub non_expiring_credits: f64,
    pub daily_balance: f64,
    /// Set only by [`CreditBalance::unknown`]: the HTTP ledger fail-open
    /// path, where `balance` is a placeholder rather than a real read.
    /// Billing's credit check must treat this as "has credits" regardless
    /// of `balance`'s numeric value, or a ledger outage fails requests
    /// closed instead of open.
    #[serde(default)]
    pub is_unknown: bool,
}

impl CreditBalance {
    /// Used by the HTTP-ledger fail-open path: a balance with no real data
    /// behind it, treated as "has credits" by the caller regardless of the
    /// `min` threshold.
    pub fn unknown() -> Self {
        Self {
            balance: 0.0,
            expiring_credits: 0.0,
            non_expiring_credits: 0.0,
            daily_balance: 0.0,
            is_unknown: true,
        }
    }
}

/// Pricing for one named billable tool. `cost = (base + per_result *
/// result_count) * markup`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ToolPricing {
    pub base_cost: f64,
    pub per_result_cost: f64,
    pub markup_multiplier: f64,
}

impl ToolPricing {
    pub fn cost(&self, result_count: usize) -> f64 {
        (self.base_cost + self.per_result_cost * result_count as f64) * self.markup_multiplier
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Free,
    Paid,
}

/// Catalog entry for one model id. `provider_binding` names which
/// `ProviderBinding` serves this model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider_binding: String,
    pub input_per_1m_tokens: f64,
    pub output_per_1m_tokens: f64,
    pub context_window: u32,
    pub tier: ModelTier,
}

/// OpenAI-style normalized chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_function")]
    pub kind: String,
    pub function: ToolCallFunction,
}

fn default_function() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "tool_call_id", skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, rename = "tool_calls", skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    /// Flattens `content` (string or mixed parts) into a single string for
    /// providers that don't accept multi-part content (Anthropic translation
    /// in particular).
    pub fn content_as_text(&self) -> String {
        match &self.content {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Array(parts)) => parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join(""),
            _ => String::new(),
        }
    }
}

/// Normalized request body for `/v1/chat/completions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, rename = "top_p", skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, rename = "max_tokens", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<serde_json::Value>,
    #[serde(default, rename = "tool_choice", skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<serde_json::Value>,
    #[serde(default, rename = "presence_penalty", skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default, rename = "frequency_penalty", skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Consumed by the gateway, never forwarded upstream.
    #[serde(default, rename = "session_id", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_reported_cost: Option<f64>,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            provider_reported_cost: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub published_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResult {
    pub title: String,
    pub url: String,
    pub thumbnail_url: String,
    pub source_url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}
