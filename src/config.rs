//! Agent configuration (spec §6 Environment, §7 ConfigurationError/ProjectError).
//!
//! Modeled on the teacher's `cli.rs` (`clap::Parser` with `env = "..."`
//! per-field overrides) and on `original_source/agent/config.py` (silent
//! fallback to defaults on invalid environment values).

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::error::{ConfigurationError, ProjectError};

/// CLI arguments for the thin `sqltrace-agent` binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "sqltrace-agent", about = "Trace a SQL statement back to the Rails code that generated it")]
pub struct CliArgs {
    /// Root of the Rails project to analyze
    #[arg(long, value_name = "DIR", env = "SQLTRACE_PROJECT_ROOT")]
    pub project_root: PathBuf,

    /// The user's question, e.g. "what generates this SQL: SELECT ..."
    #[arg(long, value_name = "QUERY")]
    pub query: String,

    /// Override the ReAct step cap
    #[arg(long, value_name = "INT", env = "SQLTRACE_MAX_STEPS")]
    pub max_steps: Option<usize>,

    /// Override the per-tool-call timeout, in seconds
    #[arg(long, value_name = "SECS", env = "SQLTRACE_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
}

/// Immutable agent configuration, validated once at construction.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_root: PathBuf,
    pub max_steps: usize,
    pub tool_repetition_limit: usize,
    pub finalization_threshold: usize,
    pub timeout_secs: u64,
    pub max_history_tokens: usize,
    pub recent_tool_results: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            max_steps: 10,
            tool_repetition_limit: 3,
            finalization_threshold: 2,
            timeout_secs: 30,
            max_history_tokens: 10_000,
            recent_tool_results: 2,
        }
    }
}

impl Config {
    /// Build configuration from environment variables, applying CLI overrides
    /// last (highest precedence). Invalid env values are ignored in favor of
    /// defaults (spec §6: "Invalid values fall back to defaults without
    /// error"); explicit CLI overrides are validated and rejected loudly.
    pub fn from_env_and_args(project_root: PathBuf, overrides: ConfigOverrides) -> Result<Self, ConfigurationError> {
        let mut cfg = Self {
            project_root,
            ..Self::default()
        };

        if let Ok(raw) = std::env::var("AGENT_MAX_STEPS") {
            if let Ok(v) = raw.parse::<usize>() {
                cfg.max_steps = v;
            }
        }
        if let Ok(raw) = std::env::var("AGENT_TIMEOUT") {
            if let Ok(v) = raw.parse::<u64>() {
                cfg.timeout_secs = v;
            }
        }

        if let Some(v) = overrides.max_steps {
            cfg.max_steps = v;
        }
        if let Some(v) = overrides.timeout_secs {
            cfg.timeout_secs = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_steps < 1 {
            return Err(ConfigurationError::InvalidMaxSteps(self.max_steps));
        }
        if self.tool_repetition_limit < 1 {
            return Err(ConfigurationError::InvalidRepetitionLimit(self.tool_repetition_limit));
        }
        if self.finalization_threshold < 1 {
            return Err(ConfigurationError::InvalidFinalizationThreshold(self.finalization_threshold));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigurationError::InvalidTimeout(self.timeout_secs));
        }
        Ok(())
    }

    /// Verify that `project_root` exists and looks like a Rails project
    /// (spec §6 File-system surface, §7 ProjectError/ProjectNotFoundError/
    /// ProjectNotRailsError).
    pub fn verify_project_root(&self) -> Result<(), ProjectError> {
        verify_rails_project_root(&self.project_root)
    }
}

/// CLI-sourced overrides layered on top of environment/defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub max_steps: Option<usize>,
    pub timeout_secs: Option<u64>,
}

pub(crate) fn verify_rails_project_root(root: &Path) -> Result<(), ProjectError> {
    if !root.exists() {
        return Err(ProjectError::NotFound(root.display().to_string()));
    }
    if !root.is_dir() {
        return Err(ProjectError::NotADirectory(root.display().to_string()));
    }
    let has_models = root.join("app").join("models").is_dir();
    let has_controllers = root.join("app").join("controllers").is_dir();
    if !has_models && !has_controllers {
        return Err(ProjectError::NotRails(root.display().to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let cfg = Config::from_env_and_args(PathBuf::from("."), ConfigOverrides::default());
        assert!(cfg.is_ok());
    }

    #[test]
    fn zero_max_steps_override_is_rejected() {
        let cfg = Config::from_env_and_args(
            PathBuf::from("."),
            ConfigOverrides {
                max_steps: Some(0),
                ..Default::default()
            },
        );
        assert!(matches!(cfg, Err(ConfigurationError::InvalidMaxSteps(0))));
    }

    #[test]
    fn verify_project_root_rejects_missing_dir() {
        let err = verify_rails_project_root(Path::new("/nonexistent/path/xyz")).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound(_)));
    }
}
