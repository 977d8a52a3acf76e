//! Shared mutable usage capture for the streaming proxy (spec §4.7.3/§4.7.4).
//!
//! One `UsageCapture` is created per request and cloned into whichever task
//! needs to update it; mirrors the teacher's
//! `token_usage: Mutex<Option<TokenUsage>>` single-purpose lock, generalized
//! to a plain (non-`Option`) running total since the gateway always has a
//! zeroed starting point to report even on total failure.

use crate::types::TokenUsage;
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct UsageCapture(Arc<Mutex<TokenUsage>>);

impl UsageCapture {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(TokenUsage::default())))
    }

    pub fn snapshot(&self) -> TokenUsage {
        *self.0.lock().expect("usage capture mutex is never poisoned across its short critical sections")
    }

    pub fn set(&self, usage: TokenUsage) {
        *self.0.lock().expect("usage capture mutex is never poisoned across its short critical sections") = usage;
    }

    /// Inspects a forwarded OpenAI-shape chunk's top-level `usage` object, if
    /// present, and records it (spec §4.7.3: "typically only the final chunk
    /// carries it").
    pub fn observe_openai_chunk(&self, chunk: &Value) {
        let Some(usage) = chunk.get("usage") else { return };
        let prompt = usage.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0);
        let completion = usage.get("completion_tokens").and_then(Value::as_u64).unwrap_or(0);
        let total_cost = usage.get("total_cost").and_then(Value::as_f64);
        let mut usage = TokenUsage::new(prompt, completion);
        usage.provider_reported_cost = total_cost;
        self.set(usage);
    }
}

impl Default for UsageCapture {
    fn default() -> Self {
        Self::new()
    }
}
