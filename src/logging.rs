//! Process-wide logging configuration.
//!
//! Mirrors the teacher's `is_verbose_logging_enabled` pattern in `lib.rs`:
//! a `OnceLock`-cached flag derived from environment variables, consulted by
//! a thin `log_line!` macro rather than a full tracing backend (the logging
//! backend itself is an external collaborator per spec §1).

use std::sync::OnceLock;

/// Recognized log levels (spec §6 Environment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn from_env_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARNING" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Whether per-tool I/O debug logging is enabled, read from `SQLTRACE_DEBUG`
/// or `AGENT_TOOL_DEBUG`. Invalid/missing values fall back to `false`.
pub fn is_debug_logging_enabled() -> bool {
    static FLAG: OnceLock<bool> = OnceLock::new();
    *FLAG.get_or_init(|| {
        std::env::var("SQLTRACE_DEBUG")
            .or_else(|_| std::env::var("AGENT_TOOL_DEBUG"))
            .map(|v| {
                matches!(
                    v.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on" | "debug"
                )
            })
            .unwrap_or(false)
    })
}

/// The configured log level, read from `SQLTRACE_LOG_LEVEL` or
/// `AGENT_LOG_LEVEL`. Invalid values fall back to `Info` without error.
pub fn log_level() -> LogLevel {
    static LEVEL: OnceLock<LogLevel> = OnceLock::new();
    *LEVEL.get_or_init(|| {
        std::env::var("SQLTRACE_LOG_LEVEL")
            .or_else(|_| std::env::var("AGENT_LOG_LEVEL"))
            .ok()
            .and_then(|v| LogLevel::from_env_str(&v))
            .unwrap_or(LogLevel::Info)
    })
}

/// Print a line tagged with `component` when `level` clears the configured
/// threshold. Not a replacement for a real logging backend — just enough
/// structure to keep tool I/O traceable during development, matching the
/// teacher's `println!("[Component] ...")` convention.
pub fn log_line(component: &str, level: LogLevel, message: &str) {
    if level >= log_level() {
        println!("[{component}] {message}");
    }
}

#[macro_export]
macro_rules! log_debug {
    ($component:expr, $($arg:tt)*) => {
        if $crate::logging::is_debug_logging_enabled() {
            $crate::logging::log_line($component, $crate::logging::LogLevel::Debug, &format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($component:expr, $($arg:tt)*) => {
        $crate::logging::log_line($component, $crate::logging::LogLevel::Info, &format!($($arg)*));
    };
}
