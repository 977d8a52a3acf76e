//! OpenAI <-> Anthropic Messages translation, both request shaping and
//! non-streaming response translation.

use crate::types::{ChatRequest, Role, TokenUsage};
use serde_json::{json, Value};
use uuid::Uuid;

/// Anthropic requires `max_tokens`; the OpenAI shape has no default, so the
/// proxy supplies one when the client didn't set it.
pub const ANTHROPIC_DEFAULT_MAX_TOKENS: u32 = 4096;
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Builds the Anthropic Messages request body from a normalized
/// `ChatRequest`. System messages are joined with newlines into the
/// top-level `system` field; the rest become `messages[]` with tool-role
/// content folded into `user`.
pub fn request_to_anthropic(req: &ChatRequest) -> Value {
    let mut system_parts = Vec::new();
    let mut messages = Vec::new();

    for m in &req.messages {
        match m.role {
            Role::System => system_parts.push(m.content_as_text()),
            Role::User | Role::Tool => messages.push(json!({
                "role": "user",
                "content": m.content_as_text(),
            })),
            Role::Assistant => messages.push(json!({
                "role": "assistant",
                "content": m.content_as_text(),
            })),
        }
    }

    let mut body = json!({
        "model": req.model,
        "messages": messages,
        "max_tokens": req.max_tokens.unwrap_or(ANTHROPIC_DEFAULT_MAX_TOKENS),
        "stream": req.stream,
    });

    if !system_parts.is_empty() {
        body["system"] = Value::String(system_parts.join("\n"));
    }
    if let Some(temperature) = req.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(top_p) = req.top_p {
        body["top_p"] = json!(top_p);
    }
    if let Some(stop) = &req.stop {
        let sequences = match stop {
            Value::Array(_) => stop.clone(),
            Value::String(s) => json!([s]),
            other => other.clone(),
        };
        body["stop_sequences"] = sequences;
    }

    body
}

/// Maps an Anthropic `stop_reason` to the OpenAI `finish_reason` vocabulary:
/// `end_turn -> stop`, others pass through unchanged.
pub fn translate_stop_reason(stop_reason: &str) -> String {
    match stop_reason {
        "end_turn" => "stop".to_string(),
        other => other.to_string(),
    }
}

/// Translates a non-streaming Anthropic response into an OpenAI
/// chat-completion body.
pub fn anthropic_response_to_openai(anthropic: &Value, model: &str) -> (Value, TokenUsage) {
    let text = anthropic["content"]
        .as_array()
        .and_then(|blocks| blocks.iter().find(|b| b["type"] == "text"))
        .and_then(|b| b["text"].as_str())
        .unwrap_or("")
        .to_string();

    let finish_reason = anthropic["stop_reason"]
        .as_str()
        .map(translate_stop_reason)
        .unwrap_or_else(|| "stop".to_string());

    let input_tokens = anthropic["usage"]["input_tokens"].as_u64().unwrap_or(0);
    let output_tokens = anthropic["usage"]["output_tokens"].as_u64().unwrap_or(0);
    let usage = TokenUsage::new(input_tokens, output_tokens);

    let id = anthropic["id"].as_str().map(|s| s.to_string()).unwrap_or_else(|| format!("chatcmpl-{}", Uuid::new_v4()));

    let body = json!({
        "id": id,
        "object": "chat.completion",
        "model": model,
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": text },
            "finish_reason": finish_reason,
        }],
        "usage": {
            "prompt_tokens": input_tokens,
            "completion_tokens": output_tokens,
            "total_tokens": input_tokens + output_tokens,
        },
    });

    (body, usage)
}

/// Extracts `{prompt_tokens, completion_tokens, total_tokens, total_cost?}`
/// from an OpenAI-shape non-streaming body. Missing fields default to zero.
pub fn extract_openai_usage(body: &Value) -> TokenUsage {
    let usage = &body["usage"];
    let mut tokens = TokenUsage::new(
        usage["prompt_tokens"].as_u64().unwrap_or(0),
        usage["completion_tokens"].as_u64().unwrap_or(0),
    );
    tokens.provider_reported_cost = usage["total_cost"].as_f64();
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;

    fn msg(role: Role, content: &str) -> ChatMessage {
        ChatMessage {
            role,
            content: Some(Value::String(content.to_string())),
            name: None,
            tool_call_id: None,
            tool_calls: None,
        }
    }

    #[test]
    fn request_to_anthropic_hoists_system_and_defaults_max_tokens() {
        let req = ChatRequest {
            model: "claude-3-5-sonnet".to_string(),
            messages: vec![msg(Role::System, "s"), msg(Role::User, "u")],
            temperature: None,
            top_p: None,
            max_tokens: None,
            stream: false,
            tools: None,
            tool_choice: None,
            stop: None,
            presence_penalty: None,
            frequency_penalty: None,
            user: None,
            session_id: None,
        };
        let body = request_to_anthropic(&req);
        assert_eq!(body["system"], "s");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "u");
        assert_eq!(body["max_tokens"], ANTHROPIC_DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn anthropic_response_translates_to_openai_shape() {
        let anthropic = json!({
            "id": "msg_1",
            "content": [{ "type": "text", "text": "T" }],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 7, "output_tokens": 5 },
        });
        let (body, usage) = anthropic_response_to_openai(&anthropic, "claude-3-5-sonnet");
        assert_eq!(body["choices"][0]["message"]["content"], "T");
        assert_eq!(body["choices"][0]["finish_reason"], "stop");
        assert_eq!(body["usage"]["prompt_tokens"], 7);
        assert_eq!(body["usage"]["completion_tokens"], 5);
        assert_eq!(body["usage"]["total_tokens"], 12);
        assert_eq!(usage.total_tokens, 12);
    }

    #[test]
    fn missing_openai_usage_fields_default_to_zero() {
        let body = json!({ "choices": [] });
        let usage = extract_openai_usage(&body);
        assert_eq!(usage.total_tokens, 0);
    }
}
