//! Streaming passthrough for both upstream dialects.
//!
//! Both functions here are pull-based readers directly over
//! `reqwest::Response::bytes_stream()` rather than a decoder that buffers a
//! whole response into a parsed `Vec` before handing back a stream — bytes
//! flow to the client as soon as the upstream emits them, with no
//! whole-response buffering in between.

use super::translate::translate_stop_reason;
use super::usage::UsageCapture;
use crate::error::GatewayError;
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use serde_json::{json, Value};
use std::io;
use uuid::Uuid;

fn find_double_newline(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

/// Pulls one complete `\n\n`-terminated SSE record (including the
/// terminator) from `buf`, refilling from `upstream` as needed. Returns
/// `None` once the upstream has closed and `buf` is drained.
async fn next_frame(
    upstream: &mut (impl Stream<Item = reqwest::Result<Bytes>> + Unpin),
    buf: &mut BytesMut,
    closed: &mut bool,
) -> Option<Result<Bytes, io::Error>> {
    loop {
        if let Some(idx) = find_double_newline(buf) {
            let frame = buf.split_to(idx + 2);
            return Some(Ok(frame.freeze()));
        }
        if *closed {
            if buf.is_empty() {
                return None;
            }
            let rest = buf.split_to(buf.len());
            return Some(Ok(rest.freeze()));
        }
        match upstream.next().await {
            Some(Ok(bytes)) => buf.extend_from_slice(&bytes),
            Some(Err(e)) => return Some(Err(io::Error::new(io::ErrorKind::Other, e.to_string()))),
            None => *closed = true,
        }
    }
}

/// Extracts the `data:` payload from a raw SSE frame, if any.
fn data_payload(frame: &[u8]) -> Option<&str> {
    std::str::from_utf8(frame).ok()?.lines().find_map(|line| line.strip_prefix("data:")).map(|s| s.trim())
}

fn event_type(frame: &[u8]) -> Option<&str> {
    std::str::from_utf8(frame).ok()?.lines().find_map(|line| line.strip_prefix("event:")).map(|s| s.trim())
}

/// Aggregator/OpenAI-family passthrough: forwards each complete event
/// verbatim, inspecting JSON payloads for a trailing `usage` object as it
/// goes.
pub fn openai_passthrough_stream(
    resp: reqwest::Response,
    usage: UsageCapture,
) -> impl Stream<Item = Result<Bytes, io::Error>> {
    let upstream = resp.bytes_stream();
    futures_util::stream::unfold(
        (upstream, BytesMut::new(), false),
        move |(mut upstream, mut buf, mut closed)| {
            let usage = usage.clone();
            async move {
                let frame = next_frame(&mut upstream, &mut buf, &mut closed).await?;
                if let Ok(bytes) = &frame {
                    if let Some(data) = data_payload(bytes) {
                        if data != "[DONE]" {
                            if let Ok(parsed) = serde_json::from_str::<Value>(data) {
                                usage.observe_openai_chunk(&parsed);
                            }
                        }
                    }
                }
                Some((frame, (upstream, buf, closed)))
            }
        },
    )
}

fn sse_frame(value: &Value) -> Bytes {
    Bytes::from(format!("data: {}\n\n", value))
}

pub const DONE_FRAME: &[u8] = b"data: [DONE]\n\n";

/// Anthropic event-typed state machine, translating each relevant event
/// into zero or one OpenAI-chunk frame.
struct AnthropicStreamState {
    message_id: String,
    model: String,
}

enum Action {
    Emit(Bytes),
    Skip,
    Abort,
}

impl AnthropicStreamState {
    fn new(model: &str) -> Self {
        Self {
            message_id: format!("chatcmpl-{}", Uuid::new_v4()),
            model: model.to_string(),
        }
    }

    fn chunk(&self, delta: Value, finish_reason: Option<&str>) -> Bytes {
        sse_frame(&json!({
            "id": self.message_id,
            "object": "chat.completion.chunk",
            "model": self.model,
            "choices": [{ "index": 0, "delta": delta, "finish_reason": finish_reason }],
        }))
    }

    fn handle(&mut self, event: &str, data: &Value, usage: &UsageCapture) -> Action {
        match event {
            "message_start" => {
                if let Some(id) = data["message"]["id"].as_str() {
                    self.message_id = id.to_string();
                }
                let input_tokens = data["message"]["usage"]["input_tokens"].as_u64().unwrap_or(0);
                usage.set(crate::types::TokenUsage::new(input_tokens, 0));
                Action::Skip
            }
            "content_block_delta" => {
                if data["delta"]["type"] == "text_delta" {
                    let text = data["delta"]["text"].as_str().unwrap_or("");
                    Action::Emit(self.chunk(json!({ "content": text }), None))
                } else {
                    Action::Skip
                }
            }
            "message_delta" => {
                let output_tokens = data["usage"]["output_tokens"].as_u64().unwrap_or(0);
                let mut snapshot = usage.snapshot();
                snapshot.output_tokens = output_tokens;
                snapshot.total_tokens = snapshot.input_tokens + output_tokens;
                usage.set(snapshot);

                match data["delta"]["stop_reason"].as_str() {
                    Some(reason) => Action::Emit(self.chunk(json!({}), Some(&translate_stop_reason(reason)))),
                    None => Action::Skip,
                }
            }
            "message_stop" => Action::Skip,
            "error" => Action::Abort,
            _ => Action::Skip,
        }
    }
}

enum Phase {
    Streaming { upstream: reqwest::Response, buf: BytesMut, closed: bool },
    SendDone,
    Finished,
}

/// Translates an Anthropic event stream into OpenAI-shape chunks, emitting
/// `data: [DONE]\n\n` on a clean or truncated close and nothing further on
/// an `error` event.
pub fn anthropic_to_openai_stream(
    resp: reqwest::Response,
    usage: UsageCapture,
    model: String,
) -> impl Stream<Item = Result<Bytes, io::Error>> {
    let upstream = resp.bytes_stream();
    let state = AnthropicStreamState::new(&model);
    futures_util::stream::unfold(
        (Phase::Streaming { upstream, buf: BytesMut::new(), closed: false }, state),
        move |(mut phase, mut state)| {
            let usage = usage.clone();
            async move {
                loop {
                    phase = match phase {
                        Phase::Finished => return None,
                        Phase::SendDone => {
                            return Some((Ok(Bytes::from_static(DONE_FRAME)), (Phase::Finished, state)));
                        }
                        Phase::Streaming { mut upstream, mut buf, mut closed } => {
                            match next_frame(&mut upstream, &mut buf, &mut closed).await {
                                None => Phase::SendDone,
                                Some(Err(e)) => return Some((Err(e), (Phase::Finished, state))),
                                Some(Ok(frame)) => {
                                    let event = event_type(&frame).unwrap_or("").to_string();
                                    let data = data_payload(&frame).and_then(|d| serde_json::from_str::<Value>(d).ok());

                                    let action = match &data {
                                        Some(data) => state.handle(&event, data, &usage),
                                        None => Action::Skip,
                                    };

                                    match action {
                                        Action::Emit(bytes) => {
                                            return Some((Ok(bytes), (Phase::Streaming { upstream, buf, closed }, state)));
                                        }
                                        Action::Skip => Phase::Streaming { upstream, buf, closed },
                                        Action::Abort => {
                                            log::warn!("anthropic stream aborted by upstream error event");
                                            return None;
                                        }
                                    }
                                }
                            }
                        }
                    };
                }
            }
        },
    )
}

/// Parses an OpenAI-shape non-streaming error body's status/snippet into a
/// `GatewayError::Upstream` the way both streaming entry points do before
/// the first chunk is forwarded: if the upstream fails before the first
/// chunk, a 502 envelope is returned instead of starting a stream.
pub fn upstream_error(status: u16, body: &str) -> GatewayError {
    let snippet: String = body.chars().take(500).collect();
    GatewayError::Upstream { status, snippet }
}
