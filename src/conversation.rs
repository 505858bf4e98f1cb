//! Conversation history with token-budget compression (spec §2 C14, §4.3).
//!
//! Holds the full message list and compresses older tool results once the
//! estimated token count clears `max_history_tokens`: every tool-result
//! block older than the newest `recent_tool_results` is replaced by a
//! single-line summary.

use crate::config::Config;
use crate::protocol::{ContentBlock, Message, MessageContent, Role};

const PREVIEW_CHARS: usize = 160;

pub struct Conversation {
    messages: Vec<Message>,
    max_history_tokens: usize,
    recent_tool_results: usize,
}

impl Conversation {
    pub fn new(config: &Config) -> Self {
        Self {
            messages: Vec::new(),
            max_history_tokens: config.max_history_tokens,
            recent_tool_results: config.recent_tool_results,
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.compress_if_needed();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Rough token estimate: four characters per token, summed over every
    /// text/tool-use/tool-result block (spec §4.3 "char-count / 4").
    fn estimate_tokens(&self) -> usize {
        self.messages.iter().map(message_chars).sum::<usize>() / 4
    }

    fn compress_if_needed(&mut self) {
        if self.estimate_tokens() <= self.max_history_tokens {
            return;
        }

        let tool_result_indices: Vec<usize> = self
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| has_tool_result(m))
            .map(|(i, _)| i)
            .collect();

        if tool_result_indices.len() <= self.recent_tool_results {
            return;
        }

        let cutoff = tool_result_indices.len() - self.recent_tool_results;
        for &idx in &tool_result_indices[..cutoff] {
            compress_message(&mut self.messages[idx]);
        }
    }
}

fn has_tool_result(message: &Message) -> bool {
    matches!(&message.content, MessageContent::Blocks(blocks) if blocks.iter().any(|b| matches!(b, ContentBlock::ToolResult { .. })))
}

fn message_chars(message: &Message) -> usize {
    match &message.content {
        MessageContent::Text(s) => s.len(),
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .map(|b| match b {
                ContentBlock::Text { text } => text.len(),
                ContentBlock::ToolUse { input, .. } => input.to_string().len(),
                ContentBlock::ToolResult { content, .. } => content.len(),
            })
            .sum(),
    }
}

/// Replace every `ToolResult` block in `message` with a one-line preview,
/// tagged as compressed. The tool name in the summary is recovered from the
/// sibling `ToolUse` block sharing the same `tool_use_id` when present.
fn compress_message(message: &mut Message) {
    let MessageContent::Blocks(blocks) = &mut message.content else { return };
    let tool_names: Vec<(String, String)> = blocks
        .iter()
        .filter_map(|b| match b {
            ContentBlock::ToolUse { id, name, .. } => Some((id.clone(), name.clone())),
            _ => None,
        })
        .collect();

    for block in blocks.iter_mut() {
        if let ContentBlock::ToolResult { tool_use_id, content } = block {
            let tool_name = tool_names
                .iter()
                .find(|(id, _)| id == tool_use_id)
                .map(|(_, name)| name.as_str())
                .unwrap_or("tool");
            *content = format!("{tool_name}: {}", preview(content));
        }
    }
}

fn preview(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= PREVIEW_CHARS {
        trimmed.to_string()
    } else {
        let truncated: String = trimmed.chars().take(PREVIEW_CHARS).collect();
        format!("{truncated}…")
    }
}

/// `Message` carries no metadata field, so "compressed" is a structural
/// property: true when every `ToolResult` block in `message` has the
/// `"<tool>: <preview>"` prefix shape `compress_message` produces.
pub fn is_compressed(message: &Message) -> bool {
    match &message.content {
        MessageContent::Blocks(blocks) => blocks.iter().all(|b| match b {
            ContentBlock::ToolResult { content, .. } => content.splitn(2, ": ").count() == 2,
            _ => true,
        }) && has_tool_result(message),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Role;
    use serde_json::json;

    fn tool_result_message(id: &str, name: &str, content: &str) -> Message {
        Message {
            role: Role::Assistant,
            content: MessageContent::Blocks(vec![
                ContentBlock::ToolUse { id: id.to_string(), name: name.to_string(), input: json!({}) },
                ContentBlock::ToolResult { tool_use_id: id.to_string(), content: content.to_string() },
            ]),
        }
    }

    fn small_config() -> Config {
        Config {
            max_history_tokens: 50,
            recent_tool_results: 1,
            ..Config::default()
        }
    }

    #[test]
    fn stays_uncompressed_under_budget() {
        let mut conv = Conversation::new(&Config::default());
        conv.push(Message::user("short query"));
        conv.push(tool_result_message("1", "text_search", "small result"));
        assert!(!is_compressed(&conv.messages()[1]));
    }

    #[test]
    fn compresses_oldest_tool_results_beyond_recent_window() {
        let mut conv = Conversation::new(&small_config());
        let long_content = "x".repeat(400);
        conv.push(tool_result_message("1", "text_search", &long_content));
        conv.push(tool_result_message("2", "file_reader", &long_content));
        conv.push(tool_result_message("3", "model_analyzer", &long_content));

        assert!(is_compressed(&conv.messages()[0]));
        assert!(!is_compressed(&conv.messages()[2]));
    }

    #[test]
    fn compressed_summary_stays_within_preview_budget_and_names_tool() {
        let mut conv = Conversation::new(&small_config());
        let long_content = "y".repeat(1000);
        conv.push(tool_result_message("1", "sql_rails_search", &long_content));
        conv.push(tool_result_message("2", "file_reader", &long_content));
        conv.push(tool_result_message("3", "model_analyzer", &long_content));

        let MessageContent::Blocks(blocks) = &conv.messages()[0].content else { panic!() };
        let ContentBlock::ToolResult { content, .. } = &blocks[1] else { panic!() };
        assert!(content.starts_with("sql_rails_search: "));
        assert!(content.chars().count() <= PREVIEW_CHARS + "sql_rails_search: ".len() + 1);
    }
}
