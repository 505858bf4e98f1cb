//! LLM transport event stream and aggregator (spec §2 C13, §6, §9 "LLM
//! events as a tagged iterator").
//!
//! The adapter consumes a lazy sequence of typed [`Event`]s rather than
//! having callers pick through partial JSON; [`Aggregator`] owns the
//! current-tool-use buffer and accumulates events into an [`LlmResponse`].

use serde_json::Value;

use crate::protocol::ToolCall;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Model(String),
    Text(String),
    ToolStart { id: String, name: String },
    ToolInputDelta(String),
    ToolReady,
    Tokens { total: u64, input: u64, output: u64, cost: f64 },
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub total: u64,
    pub input: u64,
    pub output: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub model: Option<String>,
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub tokens: TokenUsage,
    pub cost: f64,
    pub error: Option<String>,
}

impl LlmResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            model: None,
            text: String::new(),
            tool_calls: Vec::new(),
            tokens: TokenUsage::default(),
            cost: 0.0,
            error: Some(message.into()),
        }
    }
}

struct OpenTool {
    id: String,
    name: String,
    buffer: String,
}

pub struct Aggregator {
    model: Option<String>,
    text: String,
    tool_calls: Vec<ToolCall>,
    open: Option<OpenTool>,
    tokens: TokenUsage,
    cost: f64,
    saw_done: bool,
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            model: None,
            text: String::new(),
            tool_calls: Vec::new(),
            open: None,
            tokens: TokenUsage::default(),
            cost: 0.0,
            saw_done: false,
        }
    }

    /// Feed one event. Returns `Some((id, name, input))` exactly when a
    /// `ToolReady` event closes an open tool-use aggregator, so the caller
    /// can dispatch the call to the executor before recording its result
    /// with [`Aggregator::push_tool_call`] (spec §6 `tool_ready`).
    pub fn ingest(&mut self, event: Event) -> Option<(String, String, Value)> {
        match event {
            Event::Model(name) => {
                self.model = Some(name);
                None
            }
            Event::Text(chunk) => {
                self.text.push_str(&chunk);
                None
            }
            Event::ToolStart { id, name } => {
                self.open = Some(OpenTool { id, name, buffer: String::new() });
                None
            }
            Event::ToolInputDelta(part) => {
                if let Some(open) = &mut self.open {
                    open.buffer.push_str(&part);
                }
                None
            }
            Event::ToolReady => {
                let open = self.open.take()?;
                let input = serde_json::from_str(&open.buffer).unwrap_or(Value::Null);
                Some((open.id, open.name, input))
            }
            Event::Tokens { total, input, output, cost } => {
                self.tokens = TokenUsage { total, input, output };
                self.cost = cost;
                None
            }
            Event::Done => {
                self.saw_done = true;
                None
            }
        }
    }

    pub fn push_tool_call(&mut self, call: ToolCall) {
        self.tool_calls.push(call);
    }

    /// A missing `done` event yields a populated `error` (spec §6).
    pub fn finish(self) -> LlmResponse {
        let error = if self.saw_done { None } else { Some("missing done event or decode failure".to_string()) };
        LlmResponse {
            model: self.model,
            text: self.text,
            tool_calls: self.tool_calls,
            tokens: self.tokens,
            cost: self.cost,
            error,
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}
