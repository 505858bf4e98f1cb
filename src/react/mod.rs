//! ReAct state machine (spec §2 C15, §4.1): drives one query through
//! repeated LLM calls and tool dispatches, bounded by `max_steps`, with
//! stuck detection, a post-finalization timeout, final-answer detection,
//! a finalization nudge, and a tool-repetition guard.

pub mod state;

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::config::Config;
use crate::conversation::Conversation;
use crate::llm::{LlmAdapter, LlmResponse};
use crate::protocol::{ContentBlock, Message};
use crate::tools::ToolRegistry;
use crate::{log_debug, log_info};

use state::{ReActState, StepKind};

const SYSTEM_PROMPT: &str = "You are a ReAct agent that traces SQL statements back to the exact Rails \
application code that generated them. Use the available tools to search the \
project's source; when you have located the generating code, state it plainly \
and cite the file and line, e.g. `app/models/member.rb:42`.";

/// Closed set of fully-fixed final-answer marker phrases (spec §4.1 step
/// 9a), the union of the source's two coexisting agents' heuristics.
const FINAL_ANSWER_MARKERS: &[&str] = &[
    "i found the source code at",
    "the exact code that generates this sql is",
    "## final answer",
    "## conclusion",
];

/// Marker phrases with a genericized slot in the middle (spec §4.1 step 9a
/// "Located the … code in", "Here is the specific … method", "Found the …
/// source:" — only the framework name is generic; prefix and suffix are
/// fixed). Matched as prefix-then-suffix, not a bare-prefix substring, so
/// ordinary prose like "still haven't found the right file" doesn't count.
const SLOTTED_FINAL_ANSWER_MARKERS: &[(&str, &str)] = &[
    ("located the ", " code in"),
    ("here is the specific ", " method"),
    ("found the ", " source:"),
];

const STRUCTURAL_KEYWORDS: &[&str] = &["def ", "class ", "scope ", "where(", "validates"];

const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.80;

fn location_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"app/[\w./]+\.rb:\d+").unwrap())
}

pub struct ReActEngine<'a> {
    config: &'a Config,
    adapter: &'a dyn LlmAdapter,
    registry: &'a ToolRegistry,
}

impl<'a> ReActEngine<'a> {
    pub fn new(config: &'a Config, adapter: &'a dyn LlmAdapter, registry: &'a ToolRegistry) -> Self {
        Self { config, adapter, registry }
    }

    pub async fn process(&self, query: &str) -> String {
        let mut conversation = Conversation::new(self.config);
        conversation.push(Message::user(query));

        let mut state = ReActState::new();
        let schemas = self.registry.schemas();

        while !state.should_stop && state.current_step < self.config.max_steps {
            self.run_step(&mut conversation, &mut state, &schemas).await;
        }

        final_response(&state)
    }

    async fn run_step(&self, conversation: &mut Conversation, state: &mut ReActState, schemas: &[crate::protocol::ToolSchema]) {
        // Step 1: build the message list.
        let mut messages = vec![Message::system(SYSTEM_PROMPT)];
        messages.extend(conversation.messages().iter().cloned());

        // Step 2: call the adapter.
        let response: LlmResponse = self.adapter.call(&messages, schemas, self.registry).await;

        // Step 3: transport error aborts without retry.
        if let Some(error) = &response.error {
            state.record(StepKind::Thought, format!("llm error: {error}"));
            state.should_stop = true;
            state.stop_reason = Some(format!("llm_error: {error}"));
            return;
        }

        // Step 4: record tool-call-history, updating stuck-detection counter.
        let had_tool_calls = !response.tool_calls.is_empty();
        state.record_tool_call_history(had_tool_calls);

        // Step 5: non-empty text becomes a THOUGHT.
        if !response.text.trim().is_empty() {
            state.record(StepKind::Thought, response.text.clone());
            conversation.push(Message::assistant_text(&response.text));
        }

        // Step 6: append each tool-use/tool-result pair; stop on tool error.
        let mut best_confidence: Option<f64> = None;
        for call in &response.tool_calls {
            let result = call.result.clone().unwrap_or_default();
            log_debug!("react", "tool {} -> {result}", call.name);

            conversation.push(Message::assistant_blocks(vec![ContentBlock::ToolUse {
                id: call.id.clone(),
                name: call.name.clone(),
                input: call.input.clone(),
            }]));
            conversation.push(Message::user_blocks(vec![ContentBlock::ToolResult {
                tool_use_id: call.id.clone(),
                content: result.clone(),
            }]));

            state.record(StepKind::Action, format!("{}({})", call.name, call.input));
            state.record_action(&call.name, &call.input);

            if let Some(error) = tool_result_error(&result) {
                state.should_stop = true;
                state.stop_reason = Some(format!("tool_error: {}: {error}", call.name));
                return;
            }

            state.record(StepKind::Observation, result.clone());
            best_confidence = max_option(best_confidence, highest_confidence(&result));
        }

        // Step 7: stuck detection.
        if state.consecutive_no_tool_calls >= 2 {
            match state.last_thought() {
                Some(thought) if !thought.trim().is_empty() => {
                    let thought = thought.to_string();
                    state.record(StepKind::Answer, thought);
                }
                _ => state.stop_reason = Some("stuck_without_tools".to_string()),
            }
            state.should_stop = true;
            return;
        }

        // Step 8: post-finalization timeout.
        if state.finalize_requested && state.steps_since_finalization >= self.config.finalization_threshold {
            if let Some(thought) = state.last_thought() {
                let thought = thought.to_string();
                state.record(StepKind::Answer, thought);
            } else {
                state.stop_reason = Some("finalization_timeout".to_string());
            }
            state.should_stop = true;
            return;
        }

        // Step 9: final-answer detection.
        if is_final_answer(&response.text, best_confidence) {
            state.record(StepKind::Answer, response.text.clone());
            state.should_stop = true;
            return;
        }

        // Step 10: finalization request.
        if had_tool_calls && !state.finalize_requested && best_confidence.is_some_and(|c| c >= HIGH_CONFIDENCE_THRESHOLD) {
            conversation.push(Message::user(
                "Based on the high-confidence results above, please provide a concrete final answer citing the file and line.",
            ));
            state.finalize_requested = true;
            log_info!("react", "finalization requested at step {}", state.current_step);
        }

        // Step 11: tool-repetition guard.
        if state.is_repeating_tools(self.config.tool_repetition_limit) {
            let forbidden = state.forbidden_tool_names(self.config.tool_repetition_limit);
            let remaining: Vec<&str> = schemas.iter().map(|s| s.name.as_str()).filter(|n| !forbidden.iter().any(|f| f == n)).collect();
            conversation.push(Message::user(format!(
                "Do not call {} again. Try one of the remaining tools instead: {}.",
                forbidden.join(", "),
                remaining.join(", ")
            )));
        }

        // Step 12: advance counters.
        state.current_step += 1;
        if state.finalize_requested {
            state.steps_since_finalization += 1;
        }
    }
}

fn max_option(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (Some(x), None) => Some(x),
        (None, y) => y,
    }
}

fn tool_result_error(result: &str) -> Option<String> {
    let value: Value = serde_json::from_str(result).ok()?;
    value.get("error").and_then(Value::as_str).map(str::to_string)
}

/// Confidence of the best match in a `sql_rails_search` result, if any
/// (spec §4.1 steps 9c/10, §4.5).
fn highest_confidence(result: &str) -> Option<f64> {
    let value: Value = serde_json::from_str(result).ok()?;
    value
        .get("matches")?
        .as_array()?
        .iter()
        .filter_map(|m| m.get("confidence").and_then(Value::as_f64))
        .fold(None, |acc, c| Some(acc.map_or(c, |a: f64| a.max(c))))
}

fn is_final_answer(text: &str, best_confidence: Option<f64>) -> bool {
    if best_confidence.is_some_and(|c| c >= HIGH_CONFIDENCE_THRESHOLD) {
        return true;
    }
    let lower = text.to_lowercase();
    if FINAL_ANSWER_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return true;
    }
    if SLOTTED_FINAL_ANSWER_MARKERS.iter().any(|(prefix, suffix)| {
        lower.find(prefix).is_some_and(|start| lower[start + prefix.len()..].contains(suffix))
    }) {
        return true;
    }
    if location_marker_regex().is_match(text) && STRUCTURAL_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return true;
    }
    false
}

/// Step 12 (loop exit): last ANSWER, else a timeout summary, else a
/// fallback thought/action/observation trail (spec §4.1, §7).
fn final_response(state: &ReActState) -> String {
    if let Some(answer) = state.last_answer() {
        return answer.to_string();
    }

    let stop_reason = state.stop_reason.clone().unwrap_or_else(|| "max_steps_reached".to_string());
    if !state.steps.is_empty() {
        let trail: Vec<String> = state
            .steps
            .iter()
            .map(|s| format!("{}: {}", s.kind.label(), preview(&s.content, 100)))
            .collect();
        return format!(
            "Analysis Timeout — Partial Results\nstop_reason: {stop_reason}\nactions: {}\n{}",
            state.action_count(),
            trail.join("\n")
        );
    }

    format!("Analysis error: {stop_reason}")
}

fn preview(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        trimmed.to_string()
    } else {
        let truncated: String = trimmed.chars().take(max_chars).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_explicit_marker_phrase_case_insensitively() {
        assert!(is_final_answer("## Final Answer: it's in member.rb", None));
    }

    #[test]
    fn detects_location_plus_structural_keyword() {
        assert!(is_final_answer("The method is defined at app/models/member.rb:42 def active", None));
    }

    #[test]
    fn detects_slotted_marker_with_arbitrary_text_in_between() {
        assert!(is_final_answer("Located the Rails code in app/models/member.rb", None));
        assert!(is_final_answer("Found the ActiveRecord source: app/models/member.rb", None));
    }

    #[test]
    fn ordinary_prose_containing_a_marker_prefix_is_not_final() {
        assert!(!is_final_answer("I haven't found the right file yet, still searching", None));
    }

    #[test]
    fn bare_location_without_structural_keyword_is_not_final() {
        assert!(!is_final_answer("see app/models/member.rb:42 for details", None));
    }

    #[test]
    fn high_confidence_tool_result_is_final() {
        assert!(is_final_answer("still searching", Some(0.85)));
    }

    #[test]
    fn tool_result_error_extracts_message() {
        let result = serde_json::json!({"error": "internal: boom"}).to_string();
        assert_eq!(tool_result_error(&result).as_deref(), Some("internal: boom"));
    }

    #[test]
    fn highest_confidence_picks_max_across_matches() {
        let result = serde_json::json!({"matches": [{"confidence": 0.3}, {"confidence": 0.9}]}).to_string();
        assert_eq!(highest_confidence(&result), Some(0.9));
    }

    #[test]
    fn final_response_prefers_last_answer() {
        let mut state = ReActState::new();
        state.record(StepKind::Thought, "thinking");
        state.record(StepKind::Answer, "it's in app/models/member.rb:10");
        assert_eq!(final_response(&state), "it's in app/models/member.rb:10");
    }

    #[test]
    fn final_response_falls_back_to_timeout_summary() {
        let mut state = ReActState::new();
        state.stop_reason = Some("stuck_without_tools".to_string());
        state.record(StepKind::Thought, "still looking");
        let response = final_response(&state);
        assert!(response.contains("Analysis Timeout"));
        assert!(response.contains("stuck_without_tools"));
    }

    #[test]
    fn final_response_falls_back_to_error_block_when_no_steps() {
        let mut state = ReActState::new();
        state.stop_reason = Some("llm_error: boom".to_string());
        assert_eq!(final_response(&state), "Analysis error: llm_error: boom");
    }
}
