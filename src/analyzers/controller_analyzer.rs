//! Controller analyzer (spec §4.6).

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
    Protected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerMethod {
    pub name: String,
    pub class_method: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub kind: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerAnalysis {
    pub class_definition: String,
    pub actions: Vec<ControllerMethod>,
    pub filters: Vec<Filter>,
    pub private_methods: Vec<ControllerMethod>,
    pub protected_methods: Vec<ControllerMethod>,
    pub concerns: Vec<String>,
}

fn class_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*class\s+\S+.*$").unwrap())
}

fn filter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(before|after|around)_action\s+:(\w+)").unwrap())
}

fn method_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^(\s*)def\s+(self\.)?(\w+[?!]?)").unwrap())
}

fn visibility_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*(private|protected|public)\s*$").unwrap())
}

fn concern_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*include\s+(\w+)").unwrap())
}

/// Parse `path` as a Rails controller file. Visibility is tracked by a
/// running `private`/`protected` cursor: any `def` encountered after such a
/// marker in source order is classified accordingly, until the next marker
/// (spec §4.6).
pub fn analyze_controller(path: &Path) -> Result<ControllerAnalysis, String> {
    let source = std::fs::read_to_string(path).map_err(|e| format!("could not read {}: {e}", path.display()))?;

    let class_definition = class_re().find(&source).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
    let filters = filter_re()
        .captures_iter(&source)
        .map(|c| Filter {
            kind: format!("{}_action", &c[1]),
            method: c[2].to_string(),
        })
        .collect();
    let concerns = concern_re().captures_iter(&source).map(|c| c[1].to_string()).collect();

    let mut markers: Vec<(usize, Visibility)> = visibility_re()
        .captures_iter(&source)
        .map(|c| {
            let visibility = match &c[1] {
                "private" => Visibility::Private,
                "protected" => Visibility::Protected,
                _ => Visibility::Public,
            };
            (c.get(0).unwrap().start(), visibility)
        })
        .collect();
    markers.sort_by_key(|(pos, _)| *pos);

    let mut actions = Vec::new();
    let mut private_methods = Vec::new();
    let mut protected_methods = Vec::new();

    for m in method_re().captures_iter(&source) {
        let pos = m.get(0).unwrap().start();
        let visibility = markers.iter().rev().find(|(mpos, _)| *mpos < pos).map(|(_, v)| *v).unwrap_or(Visibility::Public);
        let entry = ControllerMethod {
            name: m[3].to_string(),
            class_method: m.get(2).is_some(),
        };
        match visibility {
            Visibility::Public => actions.push(entry),
            Visibility::Private => private_methods.push(entry),
            Visibility::Protected => protected_methods.push(entry),
        }
    }

    Ok(ControllerAnalysis {
        class_definition,
        actions,
        filters,
        private_methods,
        protected_methods,
        concerns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn classifies_methods_by_visibility_cursor() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "class MembersController < ApplicationController\n\
             before_action :authenticate\n\
             def index\n\
             end\n\
             private\n\
             def load_member\n\
             end\n\
             protected\n\
             def render_error\n\
             end\n\
             end\n",
        )
        .unwrap();

        let analysis = analyze_controller(file.path()).unwrap();
        assert_eq!(analysis.actions.len(), 1);
        assert_eq!(analysis.actions[0].name, "index");
        assert_eq!(analysis.private_methods.len(), 1);
        assert_eq!(analysis.private_methods[0].name, "load_member");
        assert_eq!(analysis.protected_methods.len(), 1);
        assert_eq!(analysis.filters[0].method, "authenticate");
    }

    #[test]
    fn missing_file_returns_error_not_panic() {
        assert!(analyze_controller(Path::new("/nonexistent/controller.rb")).is_err());
    }
}
