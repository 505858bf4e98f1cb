//! Route analyzer (spec §4.6).

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub verb: String,
    pub path: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAnalysis {
    pub resources: Vec<String>,
    pub namespaces: Vec<String>,
    pub routes: Vec<Route>,
    pub root: Option<String>,
}

fn resource_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bresources?\s+:(\w+)").unwrap())
}

fn namespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bnamespace\s+:(\w+)").unwrap())
}

fn verb_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\b(get|post|put|patch|delete|match)\s+["']([^"']+)["']\s*(?:,\s*to:\s*)?=>\s*["']([^"']+)["']"#).unwrap())
}

fn root_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\broot\s+(?:to:\s*)?["']?([\w#/]+)["']?"#).unwrap())
}

/// Parse `path` as `config/routes.rb`. `controller_filter`, when given,
/// restricts `routes` to entries whose target contains it as a substring
/// (spec §4.6).
pub fn analyze_routes(path: &Path, controller_filter: Option<&str>) -> Result<RouteAnalysis, String> {
    let source = std::fs::read_to_string(path).map_err(|e| format!("could not read {}: {e}", path.display()))?;

    let resources = resource_re().captures_iter(&source).map(|c| c[1].to_string()).collect();
    let namespaces = namespace_re().captures_iter(&source).map(|c| c[1].to_string()).collect();
    let root = root_re().captures(&source).map(|c| c[1].to_string());

    let mut routes: Vec<Route> = verb_re()
        .captures_iter(&source)
        .map(|c| Route {
            verb: c[1].to_string(),
            path: c[2].to_string(),
            target: c[3].to_string(),
        })
        .collect();

    if let Some(filter) = controller_filter {
        routes.retain(|r| r.target.contains(filter));
    }

    Ok(RouteAnalysis {
        resources,
        namespaces,
        routes,
        root,
    })
}
