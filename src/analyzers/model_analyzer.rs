//! Model analyzer (spec §4.6).

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    pub raw: String,
    pub on: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Callback {
    pub kind: String,
    pub event: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    pub class_method: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAnalysis {
    pub class_definition: String,
    pub associations: Vec<Association>,
    pub validations: Vec<Validation>,
    pub callbacks: Vec<Callback>,
    pub methods: Vec<MethodSignature>,
    pub concerns: Vec<String>,
    pub summary: String,
}

fn class_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*class\s+\S+.*$").unwrap())
}

fn association_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(belongs_to|has_one|has_many|has_and_belongs_to_many)\s+:(\w+)").unwrap())
}

fn validation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*(validates?\S*\s+.*)$").unwrap())
}

fn validation_on_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"on:\s*:(\w+)").unwrap())
}

fn callback_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(before|after|around)_(\w+)\s+:(\w+)").unwrap())
}

fn method_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*def\s+(self\.)?(\w+[?!]?)").unwrap())
}

fn concern_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*include\s+(\w+)").unwrap())
}

/// Parse `path` as a Rails model file. Returns `Err` (never panics) on
/// "file not found" or any I/O failure; the tool boundary turns that into
/// `{error: ...}` (spec §4.6).
pub fn analyze_model(path: &Path) -> Result<ModelAnalysis, String> {
    let source = std::fs::read_to_string(path).map_err(|e| format!("could not read {}: {e}", path.display()))?;

    let class_definition = class_re().find(&source).map(|m| m.as_str().trim().to_string()).unwrap_or_default();

    let associations: Vec<Association> = association_re()
        .captures_iter(&source)
        .map(|c| Association {
            kind: c[1].to_string(),
            name: c[2].to_string(),
        })
        .collect();

    let validations: Vec<Validation> = validation_re()
        .captures_iter(&source)
        .map(|c| {
            let raw = c[1].trim().to_string();
            let on = validation_on_re().captures(&raw).map(|oc| oc[1].to_string());
            Validation { raw, on }
        })
        .collect();

    let callbacks: Vec<Callback> = callback_re()
        .captures_iter(&source)
        .map(|c| Callback {
            kind: c[1].to_string(),
            event: c[2].to_string(),
            method: c[3].to_string(),
        })
        .collect();

    let methods: Vec<MethodSignature> = method_re()
        .captures_iter(&source)
        .map(|c| MethodSignature {
            name: c[2].to_string(),
            class_method: c.get(1).is_some(),
        })
        .collect();

    let concerns: Vec<String> = concern_re().captures_iter(&source).map(|c| c[1].to_string()).collect();

    let summary = format!(
        "{} association(s), {} validation(s), {} callback(s), {} method(s)",
        associations.len(),
        validations.len(),
        callbacks.len(),
        methods.len()
    );

    Ok(ModelAnalysis {
        class_definition,
        associations,
        validations,
        callbacks,
        methods,
        concerns,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn extracts_associations_validations_callbacks_methods() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "class Member < ApplicationRecord\n\
             include Trackable\n\
             belongs_to :company\n\
             has_many :sessions\n\
             validates :email, presence: true, on: :create\n\
             before_save :normalize_email\n\
             def self.find_all_active\n\
             end\n\
             def full_name\n\
             end\n\
             end\n",
        )
        .unwrap();

        let analysis = analyze_model(file.path()).unwrap();
        assert!(analysis.class_definition.starts_with("class Member"));
        assert_eq!(analysis.associations.len(), 2);
        assert_eq!(analysis.validations[0].on.as_deref(), Some("create"));
        assert_eq!(analysis.callbacks[0].method, "normalize_email");
        assert_eq!(analysis.methods.len(), 2);
        assert!(analysis.methods[0].class_method);
        assert_eq!(analysis.concerns, vec!["Trackable".to_string()]);
    }

    #[test]
    fn missing_file_returns_error_not_panic() {
        let result = analyze_model(Path::new("/nonexistent/model.rb"));
        assert!(result.is_err());
    }
}
