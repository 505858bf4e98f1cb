//! LLM adapter (spec §2 C13, §6): a single `call` operation that turns a
//! message history and tool schema list into an aggregated [`LlmResponse`],
//! dispatching tool calls against the registry as they complete inside the
//! event stream (spec §6: `tool_ready` "is parsed... and dispatched to the
//! executor; the result is captured into the ToolCall").

pub mod events;
pub mod http;
pub mod mock;

use std::future::Future;
use std::pin::Pin;

pub use events::{Aggregator, Event, LlmResponse, TokenUsage};
pub use http::HttpLlmAdapter;
pub use mock::MockLlmAdapter;

use crate::protocol::{Message, ToolSchema};
use crate::tools::ToolRegistry;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait LlmAdapter: Send + Sync {
    fn call<'a>(
        &'a self,
        messages: &'a [Message],
        tool_schemas: &'a [ToolSchema],
        registry: &'a ToolRegistry,
    ) -> BoxFuture<'a, LlmResponse>;
}
