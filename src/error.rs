//! Error taxonomy (spec §7).
//!
//! Only the errors that are fatal to a whole query or to the process live
//! here as a typed enum. Everything a tool can fail on mid-query is encoded
//! as a `{"error": "..."}` JSON object instead (see `tools::ToolOutcome`) so
//! that the ReAct loop can observe it as data rather than unwind the stack.

use thiserror::Error;

/// Fatal errors: raised at construction, or (for `Project*`) on first use.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("project error: {0}")]
    Project(#[from] ProjectError),
}

/// Invalid `max_steps`, timeout, or an empty tool set. Raised at construction.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("max_steps must be >= 1, got {0}")]
    InvalidMaxSteps(usize),
    #[error("tool_repetition_limit must be >= 1, got {0}")]
    InvalidRepetitionLimit(usize),
    #[error("finalization_threshold must be >= 1, got {0}")]
    InvalidFinalizationThreshold(usize),
    #[error("timeout_secs must be > 0, got {0}")]
    InvalidTimeout(u64),
    #[error("tool set cannot be empty")]
    EmptyToolSet,
}

/// Project root missing or lacking framework-layout markers (spec §7 #2, #7).
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project root not found: {0}")]
    NotFound(String),
    #[error("project root is not a directory: {0}")]
    NotADirectory(String),
    #[error("project root does not look like a Rails project (no app/models or app/controllers): {0}")]
    NotRails(String),
}
