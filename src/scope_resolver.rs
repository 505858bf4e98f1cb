//! Scope & finder resolver (spec §2 C6, §3 Scope/MethodInfo, §4.4 Pass B.2/B.3).
//!
//! Reads a model file once per query, extracts `scope :name, -> { ... }`
//! definitions and instance/class methods, and resolves a scope name to its
//! transitive set of normalized `WHERE` clauses by following chained scope
//! references within the same model.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::inflector::model_to_snake_case;
use crate::rails_dsl::is_framework_method;
use crate::ruby_where::extract_where_calls;
use crate::sql::Condition;

/// A hashable `{column, operator, value?}` projection (spec §3 NormalizedClause).
/// `Condition` already holds exactly those fields and normalizes them at
/// construction, so it doubles as its own normalized form.
pub type NormalizedClause = Condition;

/// A named query fragment defined on a model class (spec §3 Scope).
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub name: String,
    pub where_clauses: HashSet<NormalizedClause>,
    pub composed_from: Vec<String>,
    pub source_line: usize,
    pub raw_definition: String,
}

/// An instance or class method and whether it returns a query relation
/// (spec §3 MethodInfo).
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub name: String,
    pub body: String,
    pub returns_relation: bool,
    pub file_path: String,
}

/// Per-query cache of model source, scope resolutions, and method lookups.
/// Keyed on `model_name` and `model_name.scope_name` per spec §3 Lifecycle.
pub struct ScopeResolver {
    project_root: PathBuf,
    source_cache: RefCell<HashMap<String, Option<String>>>,
    scope_cache: RefCell<HashMap<String, Option<Scope>>>,
    method_cache: RefCell<HashMap<String, Option<MethodInfo>>>,
}

impl ScopeResolver {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            source_cache: RefCell::new(HashMap::new()),
            scope_cache: RefCell::new(HashMap::new()),
            method_cache: RefCell::new(HashMap::new()),
        }
    }

    fn model_path(&self, model: &str) -> PathBuf {
        self.project_root
            .join("app")
            .join("models")
            .join(format!("{}.rb", model_to_snake_case(model)))
    }

    fn model_source(&self, model: &str) -> Option<String> {
        if let Some(cached) = self.source_cache.borrow().get(model) {
            return cached.clone();
        }
        let content = std::fs::read_to_string(self.model_path(model)).ok();
        self.source_cache.borrow_mut().insert(model.to_string(), content.clone());
        content
    }

    /// Resolve `model.scope_name`, following any chained scope references
    /// the scope body starts with. Returns `None` when no scope of that
    /// name is defined (the caller falls back to heuristic inference,
    /// spec §4.4 Pass B.2).
    pub fn resolve_scope(&self, model: &str, scope_name: &str) -> Option<Scope> {
        let key = format!("{model}.{scope_name}");
        if let Some(cached) = self.scope_cache.borrow().get(&key) {
            return cached.clone();
        }

        // Insert a placeholder to break cycles (a scope that references itself).
        self.scope_cache.borrow_mut().insert(key.clone(), None);

        let resolved = self.resolve_scope_uncached(model, scope_name);
        self.scope_cache.borrow_mut().insert(key, resolved.clone());
        resolved
    }

    fn resolve_scope_uncached(&self, model: &str, scope_name: &str) -> Option<Scope> {
        let source = self.model_source(model)?;
        let (source_line, body) = find_scope_definition(&source, scope_name)?;

        let mut composed_from = Vec::new();
        let mut clauses: HashSet<NormalizedClause> = HashSet::new();

        for referenced in leading_chain_idents(&body) {
            if referenced == scope_name {
                continue;
            }
            if let Some(parent) = self.resolve_scope(model, &referenced) {
                composed_from.push(referenced);
                clauses.extend(parent.where_clauses.iter().cloned());
            }
        }

        clauses.extend(extract_where_calls(&body));

        Some(Scope {
            name: scope_name.to_string(),
            where_clauses: clauses,
            composed_from,
            source_line,
            raw_definition: body,
        })
    }

    /// Resolve an instance/class method on `model`, reporting whether its
    /// last expression returns a query relation (spec §4.4 Pass B.3).
    pub fn resolve_method(&self, model: &str, method_name: &str) -> Option<MethodInfo> {
        let key = format!("{model}.{method_name}");
        if let Some(cached) = self.method_cache.borrow().get(&key) {
            return cached.clone();
        }

        let source = self.model_source(model)?;
        let resolved = find_method_definition(&source, method_name).map(|(body, _line)| {
            let file_path = self.model_path(model).display().to_string();
            MethodInfo {
                name: method_name.to_string(),
                returns_relation: method_returns_relation(&body),
                body,
                file_path,
            }
        });

        self.method_cache.borrow_mut().insert(key, resolved.clone());
        resolved
    }
}

/// Find `scope :name, -> { ... }` (or `lambda { ... }`) and return its
/// source line (1-based) and brace-balanced body.
fn find_scope_definition(source: &str, scope_name: &str) -> Option<(usize, String)> {
    let needle = format!("scope :{scope_name}");
    let start = source.find(&needle)?;
    let line = source[..start].matches('\n').count() + 1;

    let brace_open = source[start..].find('{')? + start;
    let body = extract_braced_body(source, brace_open)?;
    Some((line, body))
}

/// Find `def name(...) ... end` (self. or instance) and return the body
/// (everything between the signature line and the matching `end`).
fn find_method_definition(source: &str, method_name: &str) -> Option<(String, usize)> {
    for needle in [format!("def {method_name}"), format!("def self.{method_name}")] {
        if let Some(start) = source.find(&needle) {
            let line = source[..start].matches('\n').count() + 1;
            let sig_end = source[start..].find('\n').map(|i| start + i + 1).unwrap_or(source.len());
            let body_end = find_matching_end(source, sig_end)?;
            return Some((source[sig_end..body_end].trim().to_string(), line));
        }
    }
    None
}

/// Scan forward from `from` counting Ruby block openers (`def`, `do`, `if`,
/// `case`, `unless`) against `end` to find the `end` matching the method
/// signature at `from`.
fn find_matching_end(source: &str, from: usize) -> Option<usize> {
    let mut depth = 1i32;
    let mut idx = from;
    let bytes = source.as_bytes();
    while idx < bytes.len() {
        if source[idx..].starts_with("end") && word_boundary(source, idx, 3) {
            depth -= 1;
            if depth == 0 {
                return Some(idx);
            }
            idx += 3;
            continue;
        }
        let mut matched_opener = false;
        for opener in ["def ", "do\n", "do |", "do ", "if ", "unless ", "case "] {
            if source[idx..].starts_with(opener) && word_boundary(source, idx, 0) {
                depth += 1;
                idx += opener.len();
                matched_opener = true;
                break;
            }
        }
        if matched_opener {
            continue;
        }
        idx += 1;
    }
    None
}

fn word_boundary(source: &str, idx: usize, len: usize) -> bool {
    let before_ok = idx == 0 || !source.as_bytes()[idx - 1].is_ascii_alphanumeric();
    let after_idx = idx + len;
    let after_ok = after_idx >= source.len() || !source.as_bytes()[after_idx].is_ascii_alphanumeric();
    before_ok && after_ok
}

/// Extract the text inside a `{ ... }` block starting at `open_idx` (which
/// must point at the opening brace), honoring nested braces.
fn extract_braced_body(source: &str, open_idx: usize) -> Option<String> {
    let bytes = source.as_bytes();
    let mut depth = 0i32;
    let mut idx = open_idx;
    let mut inner_start = None;
    while idx < bytes.len() {
        match bytes[idx] {
            b'{' => {
                depth += 1;
                if depth == 1 {
                    inner_start = Some(idx + 1);
                }
            }
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let start = inner_start?;
                    return Some(source[start..idx].trim().to_string());
                }
            }
            _ => {}
        }
        idx += 1;
    }
    None
}

/// Leading dot-chain of bare identifiers before the first framework-method
/// call or parenthesized expression (spec §4.4 Pass B.2 scope composition).
fn leading_chain_idents(body: &str) -> Vec<String> {
    let mut idents = Vec::new();
    for segment in body.trim_start().split('.') {
        let seg = segment.trim();
        if seg.is_empty() || seg.contains('(') {
            break;
        }
        if !seg.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '?') {
            break;
        }
        if is_framework_method(seg) {
            break;
        }
        idents.push(seg.to_string());
    }
    idents
}

/// A method "returns a query relation" if its last non-comment line chains
/// through an association, a scope-shaped call, or an explicit query
/// method (spec §3 MethodInfo, §4.4 Pass B.3 "detected by scanning the last
/// non-comment expression").
fn method_returns_relation(body: &str) -> bool {
    let last_line = body
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'));
    let Some(last_line) = last_line else {
        return false;
    };
    if last_line.contains(".where")
        || last_line.contains(".active")
        || last_line.contains(".order")
        || last_line.contains(".scope")
        || last_line.contains(".all")
        || last_line.contains(".includes")
    {
        return true;
    }
    // A bare association access like `members.active` or `members` on its
    // own line is conventionally a relation too.
    !last_line.starts_with("return nil") && last_line.chars().next().is_some_and(|c| c.is_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_model(dir: &TempDir, name: &str, body: &str) {
        let models_dir = dir.path().join("app").join("models");
        fs::create_dir_all(&models_dir).unwrap();
        fs::write(models_dir.join(format!("{name}.rb")), body).unwrap();
    }

    #[test]
    fn resolves_simple_scope() {
        let dir = TempDir::new().unwrap();
        write_model(
            &dir,
            "member",
            "class Member < ApplicationRecord\n  scope :all_canonical, -> { where.not(login_handle: nil).where(owner_id: nil) }\nend\n",
        );
        let resolver = ScopeResolver::new(dir.path());
        let scope = resolver.resolve_scope("Member", "all_canonical").unwrap();
        assert_eq!(scope.where_clauses.len(), 2);
    }

    #[test]
    fn resolves_chained_scope_composition_transitively() {
        let dir = TempDir::new().unwrap();
        write_model(
            &dir,
            "member",
            "class Member < ApplicationRecord\n\
             scope :all_canonical, -> { where.not(login_handle: nil).where(owner_id: nil) }\n\
             scope :not_disabled, -> { all_canonical.where(disabler_id: nil) }\n\
             scope :active, -> { not_disabled.where.not(first_login_at: nil) }\n\
             end\n",
        );
        let resolver = ScopeResolver::new(dir.path());
        let scope = resolver.resolve_scope("Member", "active").unwrap();
        assert_eq!(scope.where_clauses.len(), 4);
        assert!(scope.composed_from.contains(&"not_disabled".to_string()));
    }

    #[test]
    fn missing_scope_returns_none() {
        let dir = TempDir::new().unwrap();
        write_model(&dir, "account", "class Account < ApplicationRecord\nend\n");
        let resolver = ScopeResolver::new(dir.path());
        assert!(resolver.resolve_scope("Account", "for_custom_domain").is_none());
    }

    #[test]
    fn resolves_custom_finder_method_as_relation() {
        let dir = TempDir::new().unwrap();
        write_model(
            &dir,
            "company",
            "class Company < ApplicationRecord\n  def find_all_active\n    members.active\n  end\nend\n",
        );
        let resolver = ScopeResolver::new(dir.path());
        let method = resolver.resolve_method("Company", "find_all_active").unwrap();
        assert!(method.returns_relation);
        assert_eq!(method.body, "members.active");
    }
}
