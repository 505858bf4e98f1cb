//! Scripted [`LlmAdapter`] test double (spec §8 end-to-end scenarios): feeds
//! back a fixed sequence of responses so the ReAct loop can be exercised
//! without a live model.

use std::sync::Mutex;

use super::events::LlmResponse;
use super::{BoxFuture, LlmAdapter};
use crate::protocol::{Message, ToolSchema};
use crate::tools::ToolRegistry;

pub struct MockLlmAdapter {
    responses: Mutex<Vec<LlmResponse>>,
}

impl MockLlmAdapter {
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        Self { responses: Mutex::new(responses) }
    }
}

impl LlmAdapter for MockLlmAdapter {
    fn call<'a>(
        &'a self,
        _messages: &'a [Message],
        _tool_schemas: &'a [ToolSchema],
        registry: &'a ToolRegistry,
    ) -> BoxFuture<'a, LlmResponse> {
        Box::pin(async move {
            let mut response = {
                let mut responses = self.responses.lock().unwrap();
                if responses.is_empty() {
                    return LlmResponse::error("mock adapter exhausted its scripted responses");
                }
                responses.remove(0)
            };
            for call in &mut response.tool_calls {
                if call.result.is_none() {
                    call.result = Some(registry.execute(&call.name, call.input.clone()).await);
                }
            }
            response
        })
    }
}
