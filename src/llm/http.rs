//! HTTP-backed [`LlmAdapter`] (spec §4.2 C13, §6), grounded in the teacher's
//! streaming chat actor (`src-tauri/src/actors/foundry_actor.rs`): a
//! `reqwest` POST against a streaming chat completion endpoint, read chunk
//! by chunk, with a running tool-call accumulator keyed by content-block
//! index.

use std::time::Duration;

use serde_json::{json, Value};

use super::events::{Aggregator, Event, LlmResponse};
use super::{BoxFuture, LlmAdapter};
use crate::protocol::{ContentBlock, Message, MessageContent, Role, ToolCall, ToolSchema};
use crate::tools::ToolRegistry;
use crate::{log_debug, log_info};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

pub struct HttpLlmAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpLlmAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn build_request_body(&self, messages: &[Message], tool_schemas: &[ToolSchema]) -> Value {
        let (system, rest) = split_system(messages);
        let tools: Vec<Value> = tool_schemas
            .iter()
            .map(|schema| {
                json!({
                    "name": schema.name,
                    "description": schema.description,
                    "input_schema": schema.input_schema,
                })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "max_tokens": 4096,
            "messages": rest.iter().map(message_to_json).collect::<Vec<_>>(),
            "stream": true,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools);
        }
        if let Some(system) = system {
            body["system"] = Value::String(system);
        }
        body
    }
}

/// Anthropic's Messages API takes `system` out-of-band; fold any leading
/// `Role::System` messages into a single string and return the rest.
fn split_system(messages: &[Message]) -> (Option<String>, Vec<Message>) {
    let mut system_parts = Vec::new();
    let mut rest = Vec::new();
    for message in messages {
        match (&message.role, &message.content) {
            (Role::System, MessageContent::Text(text)) => system_parts.push(text.clone()),
            _ => rest.push(message.clone()),
        }
    }
    let system = if system_parts.is_empty() { None } else { Some(system_parts.join("\n\n")) };
    (system, rest)
}

fn message_to_json(message: &Message) -> Value {
    let role = match message.role {
        Role::System => "user",
        Role::User => "user",
        Role::Assistant => "assistant",
    };
    let content = match &message.content {
        MessageContent::Text(text) => Value::String(text.clone()),
        MessageContent::Blocks(blocks) => Value::Array(blocks.iter().map(block_to_json).collect()),
    };
    json!({"role": role, "content": content})
}

fn block_to_json(block: &ContentBlock) -> Value {
    match block {
        ContentBlock::Text { text } => json!({"type": "text", "text": text}),
        ContentBlock::ToolUse { id, name, input } => json!({"type": "tool_use", "id": id, "name": name, "input": input}),
        ContentBlock::ToolResult { tool_use_id, content } => json!({"type": "tool_result", "tool_use_id": tool_use_id, "content": content}),
    }
}

/// Map one SSE `data:` payload into zero or more internal [`Event`]s.
/// Mirrors the Anthropic Messages streaming event shapes:
/// `message_start`, `content_block_start`, `content_block_delta`
/// (`text_delta` / `input_json_delta`), `content_block_stop`,
/// `message_delta` (carries final `usage`), `message_stop`.
fn parse_event(event_type: &str, data: &Value) -> Vec<Event> {
    match event_type {
        "message_start" => data
            .pointer("/message/model")
            .and_then(Value::as_str)
            .map(|m| vec![Event::Model(m.to_string())])
            .unwrap_or_default(),
        "content_block_start" => {
            let block = data.get("content_block");
            if block.and_then(|b| b.get("type")).and_then(Value::as_str) == Some("tool_use") {
                let id = block.and_then(|b| b.get("id")).and_then(Value::as_str).unwrap_or_default();
                let name = block.and_then(|b| b.get("name")).and_then(Value::as_str).unwrap_or_default();
                vec![Event::ToolStart { id: id.to_string(), name: name.to_string() }]
            } else {
                Vec::new()
            }
        }
        "content_block_delta" => {
            let delta = data.get("delta");
            match delta.and_then(|d| d.get("type")).and_then(Value::as_str) {
                Some("text_delta") => delta
                    .and_then(|d| d.get("text"))
                    .and_then(Value::as_str)
                    .map(|t| vec![Event::Text(t.to_string())])
                    .unwrap_or_default(),
                Some("input_json_delta") => delta
                    .and_then(|d| d.get("partial_json"))
                    .and_then(Value::as_str)
                    .map(|t| vec![Event::ToolInputDelta(t.to_string())])
                    .unwrap_or_default(),
                _ => Vec::new(),
            }
        }
        "content_block_stop" => vec![Event::ToolReady],
        "message_delta" => {
            let usage = data.get("usage");
            let output = usage.and_then(|u| u.get("output_tokens")).and_then(Value::as_u64).unwrap_or(0);
            let input = usage.and_then(|u| u.get("input_tokens")).and_then(Value::as_u64).unwrap_or(0);
            vec![Event::Tokens { total: input + output, input, output, cost: 0.0 }]
        }
        "message_stop" => vec![Event::Done],
        _ => Vec::new(),
    }
}

impl LlmAdapter for HttpLlmAdapter {
    fn call<'a>(
        &'a self,
        messages: &'a [Message],
        tool_schemas: &'a [ToolSchema],
        registry: &'a ToolRegistry,
    ) -> BoxFuture<'a, LlmResponse> {
        Box::pin(async move {
            let body = self.build_request_body(messages, tool_schemas);
            let response = self
                .client
                .post(&self.base_url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await;

            let mut response = match response {
                Ok(r) if r.status().is_success() => r,
                Ok(r) => {
                    let status = r.status();
                    let text = r.text().await.unwrap_or_default();
                    return LlmResponse::error(format!("llm transport error: {status} {text}"));
                }
                Err(e) => return LlmResponse::error(format!("llm transport error: {e}")),
            };

            let mut aggregator = Aggregator::new();
            let mut leftover = String::new();
            let mut current_event = String::new();

            loop {
                let chunk = match response.chunk().await {
                    Ok(Some(chunk)) => chunk,
                    Ok(None) => break,
                    Err(e) => return LlmResponse::error(format!("llm stream read error: {e}")),
                };
                leftover.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(pos) = leftover.find('\n') {
                    let line = leftover[..pos].trim_end_matches('\r').to_string();
                    leftover.drain(..=pos);

                    if let Some(rest) = line.strip_prefix("event:") {
                        current_event = rest.trim().to_string();
                        continue;
                    }
                    let Some(rest) = line.strip_prefix("data:") else { continue };
                    let payload = rest.trim();
                    if payload.is_empty() {
                        continue;
                    }
                    let data: Value = match serde_json::from_str(payload) {
                        Ok(v) => v,
                        Err(e) => {
                            log_debug!("llm", "failed to decode SSE payload: {e}");
                            continue;
                        }
                    };
                    for event in parse_event(&current_event, &data) {
                        if let Some((id, name, input)) = aggregator.ingest(event) {
                            log_info!("llm", "dispatching tool call {name} ({id})");
                            let result = registry.execute(&name, input.clone()).await;
                            aggregator.push_tool_call(ToolCall { id, name, input, result: Some(result) });
                        }
                    }
                }
            }

            aggregator.finish()
        })
    }
}

pub fn read_api_key_from_env() -> Option<String> {
    std::env::var("ANTHROPIC_API_KEY").ok().or_else(|| std::env::var("SQLTRACE_LLM_API_KEY").ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_delta_into_text_event() {
        let data = json!({"delta": {"type": "text_delta", "text": "hi"}});
        let events = parse_event("content_block_delta", &data);
        assert_eq!(events, vec![Event::Text("hi".to_string())]);
    }

    #[test]
    fn parses_tool_use_start() {
        let data = json!({"content_block": {"type": "tool_use", "id": "t1", "name": "text_search"}});
        let events = parse_event("content_block_start", &data);
        assert_eq!(events, vec![Event::ToolStart { id: "t1".to_string(), name: "text_search".to_string() }]);
    }

    #[test]
    fn parses_message_delta_usage() {
        let data = json!({"usage": {"input_tokens": 10, "output_tokens": 5}});
        let events = parse_event("message_delta", &data);
        assert_eq!(events, vec![Event::Tokens { total: 15, input: 10, output: 5, cost: 0.0 }]);
    }

    #[test]
    fn unknown_event_type_yields_no_events() {
        assert!(parse_event("ping", &json!({})).is_empty());
    }

    #[test]
    fn split_system_folds_leading_system_messages() {
        let messages = vec![
            Message { role: Role::System, content: MessageContent::Text("be terse".to_string()) },
            Message { role: Role::User, content: MessageContent::Text("hi".to_string()) },
        ];
        let (system, rest) = split_system(&messages);
        assert_eq!(system.as_deref(), Some("be terse"));
        assert_eq!(rest.len(), 1);
    }
}
