//! ReAct step log and loop-local bookkeeping (spec §4.1 C15, GLOSSARY
//! "ReAct step").

use std::collections::HashSet;

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Thought,
    Action,
    Observation,
    Answer,
}

impl StepKind {
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::Thought => "THOUGHT",
            StepKind::Action => "ACTION",
            StepKind::Observation => "OBSERVATION",
            StepKind::Answer => "ANSWER",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Step {
    pub kind: StepKind,
    pub content: String,
}

impl Step {
    pub fn new(kind: StepKind, content: impl Into<String>) -> Self {
        Self { kind, content: content.into() }
    }
}

/// Per-query mutable state the driver threads through one `process` call
/// (spec §5 "Per-query state ... owned by exactly one driver").
#[derive(Debug, Default)]
pub struct ReActState {
    pub steps: Vec<Step>,
    pub current_step: usize,
    pub should_stop: bool,
    pub stop_reason: Option<String>,
    pub finalize_requested: bool,
    pub steps_since_finalization: usize,
    pub consecutive_no_tool_calls: usize,
    tools_used: Vec<String>,
    last_two_actions: Vec<(String, Value)>,
}

impl ReActState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: StepKind, content: impl Into<String>) {
        self.steps.push(Step::new(kind, content));
    }

    /// Step 4: record whether this step issued any tool calls and update the
    /// consecutive-no-tool-call counter used by stuck detection (step 7).
    pub fn record_tool_call_history(&mut self, had_tool_calls: bool) {
        if had_tool_calls {
            self.consecutive_no_tool_calls = 0;
        } else {
            self.consecutive_no_tool_calls += 1;
        }
    }

    /// Step 11 bookkeeping: track every tool name used this query and the
    /// last two `(name, input)` action pairs, for the repetition guard.
    pub fn record_action(&mut self, tool_name: &str, input: &Value) {
        self.tools_used.push(tool_name.to_string());
        self.last_two_actions.push((tool_name.to_string(), input.clone()));
        if self.last_two_actions.len() > 2 {
            self.last_two_actions.remove(0);
        }
    }

    pub fn last_thought(&self) -> Option<&str> {
        self.steps.iter().rev().find(|s| s.kind == StepKind::Thought).map(|s| s.content.as_str())
    }

    pub fn last_answer(&self) -> Option<&str> {
        self.steps.iter().rev().find(|s| s.kind == StepKind::Answer).map(|s| s.content.as_str())
    }

    pub fn action_count(&self) -> usize {
        self.steps.iter().filter(|s| s.kind == StepKind::Action).count()
    }

    /// Step 11: true once a single tool name has been used
    /// `tool_repetition_limit` times total, or the last two actions are an
    /// identical `(name, input)` pair (spec §9 "the spec makes
    /// `tool_repetition_limit` authoritative for step 11").
    pub fn is_repeating_tools(&self, tool_repetition_limit: usize) -> bool {
        let single_tool_repeated = self.tools_used.len() >= tool_repetition_limit
            && self.tools_used.iter().collect::<HashSet<_>>().len() == 1;

        let last_two_identical = match self.last_two_actions.as_slice() {
            [a, b] => a == b,
            _ => false,
        };

        single_tool_repeated || last_two_identical
    }

    /// Tool names to forbid in the repetition-guard constraint message: the
    /// single repeated name, or both of the last two identical action names.
    pub fn forbidden_tool_names(&self, tool_repetition_limit: usize) -> Vec<String> {
        if !self.is_repeating_tools(tool_repetition_limit) {
            return Vec::new();
        }
        let mut names: Vec<String> = self.tools_used.iter().cloned().collect::<HashSet<_>>().into_iter().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stuck_detection_counts_consecutive_no_tool_steps() {
        let mut state = ReActState::new();
        state.record_tool_call_history(false);
        state.record_tool_call_history(false);
        assert_eq!(state.consecutive_no_tool_calls, 2);
        state.record_tool_call_history(true);
        assert_eq!(state.consecutive_no_tool_calls, 0);
    }

    #[test]
    fn single_tool_repeated_up_to_limit_triggers_guard() {
        let mut state = ReActState::new();
        state.record_action("text_search", &json!({"pattern": "a"}));
        state.record_action("text_search", &json!({"pattern": "b"}));
        assert!(!state.is_repeating_tools(3));
        state.record_action("text_search", &json!({"pattern": "c"}));
        assert!(state.is_repeating_tools(3));
    }

    #[test]
    fn identical_last_two_actions_trigger_guard() {
        let mut state = ReActState::new();
        state.record_action("text_search", &json!({"pattern": "a"}));
        state.record_action("file_reader", &json!({"path": "x"}));
        assert!(!state.is_repeating_tools(3));
        state.record_action("file_reader", &json!({"path": "x"}));
        assert!(state.is_repeating_tools(3));
    }
}
