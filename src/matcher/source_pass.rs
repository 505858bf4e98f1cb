//! Source snippet → normalized `Condition`s (spec §4.4 Pass B).
//!
//! Walks method-chain expressions in an expanded source snippet and unions
//! conditions from association implication (B.1), scope resolution with
//! heuristic fallback (B.2), custom-finder expansion (B.3, recursing at
//! most once), and literal `.where` calls (B.4, delegated to
//! [`crate::ruby_where`]).

use crate::inflector::{singularize, table_to_model};
use crate::rails_dsl::is_framework_method;
use crate::ruby_where::extract_where_calls;
use crate::scope_resolver::ScopeResolver;
use crate::sql::{Condition, Operator};

struct ChainSegment {
    name: String,
    args: Option<String>,
}

struct Chain {
    receiver: String,
    segments: Vec<ChainSegment>,
}

/// Extract conditions from `snippet`, a source fragment believed to produce
/// `model`'s query (the model is used only as a hint; each discovered
/// method chain resolves its own target model from its receiver).
pub fn extract_conditions(snippet: &str, model: &str, resolver: &ScopeResolver) -> Vec<Condition> {
    extract_conditions_at_depth(snippet, model, resolver, 0)
}

fn extract_conditions_at_depth(snippet: &str, model: &str, resolver: &ScopeResolver, depth: usize) -> Vec<Condition> {
    let mut conditions = extract_where_calls(snippet);
    for chain in find_chains(snippet) {
        conditions.extend(process_chain(&chain, model, resolver, depth));
    }
    conditions
}

fn process_chain(chain: &Chain, _default_model: &str, resolver: &ScopeResolver, depth: usize) -> Vec<Condition> {
    let mut conditions = Vec::new();
    let receiver_is_model = chain.receiver.chars().next().is_some_and(|c| c.is_uppercase());
    let target_model = if receiver_is_model {
        chain.receiver.clone()
    } else {
        table_to_model(strip_sigil(&chain.receiver))
    };

    let mut idx = 0;
    while idx < chain.segments.len() {
        let seg = &chain.segments[idx];
        if is_framework_method(&seg.name) {
            idx += 1;
            continue;
        }

        let resolved_method = resolver.resolve_method(&target_model, &seg.name);

        if idx == 0 && !receiver_is_model {
            let plural = is_plural(&seg.name);
            let finder_relation = resolved_method.as_ref().is_some_and(|m| m.returns_relation);
            if plural || finder_relation {
                conditions.push(Condition::new(format!("{}_id", strip_sigil(&chain.receiver)), Operator::Eq, None));
            }
        }

        if depth < 1 {
            if let Some(method) = resolved_method.as_ref().filter(|m| m.returns_relation) {
                let remaining = render_segments(&chain.segments[idx + 1..]);
                let expanded = format!("{}{}", method.body, remaining);
                conditions.extend(extract_conditions_at_depth(&expanded, &target_model, resolver, depth + 1));
                return conditions;
            }
        }

        if let Some(scope) = resolver.resolve_scope(&target_model, &seg.name) {
            conditions.extend(scope.where_clauses.iter().cloned());
        } else if let Some(cond) = heuristic_scope_inference(&seg.name) {
            conditions.push(cond);
        }

        idx += 1;
    }

    conditions
}

/// `for_X`, `by_X`, `with_X` → `X = ?`; `X_is` → `X = ?`; `having_X` →
/// `X IS NOT NULL`; `without_X` → `X IS NULL` (spec §4.4 Pass B.2 heuristic).
fn heuristic_scope_inference(scope_name: &str) -> Option<Condition> {
    for prefix in ["for_", "by_", "with_"] {
        if let Some(rest) = scope_name.strip_prefix(prefix).filter(|r| !r.is_empty()) {
            return Some(Condition::new(rest, Operator::Eq, None));
        }
    }
    if let Some(rest) = scope_name.strip_suffix("_is").filter(|r| !r.is_empty()) {
        return Some(Condition::new(rest, Operator::Eq, None));
    }
    if let Some(rest) = scope_name.strip_prefix("having_").filter(|r| !r.is_empty()) {
        return Some(Condition::new(rest, Operator::IsNotNull, None));
    }
    if let Some(rest) = scope_name.strip_prefix("without_").filter(|r| !r.is_empty()) {
        return Some(Condition::new(rest, Operator::IsNull, None));
    }
    None
}

fn is_plural(word: &str) -> bool {
    singularize(word) != word.to_lowercase()
}

fn strip_sigil(receiver: &str) -> &str {
    receiver.trim_start_matches('@')
}

fn render_segments(segments: &[ChainSegment]) -> String {
    segments
        .iter()
        .map(|s| match &s.args {
            Some(args) => format!(".{}({})", s.name, args),
            None => format!(".{}", s.name),
        })
        .collect()
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn read_ident(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() && is_ident_char(chars[end]) {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}

fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut i = open;
    while i < chars.len() {
        match chars[i] {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Find every `receiver.seg1(args1).seg2(args2)…` chain in `snippet`,
/// tracking nested-paren argument spans so pagination expressions like
/// `.offset((page-1)*page_size)` don't truncate the chain scan.
fn find_chains(snippet: &str) -> Vec<Chain> {
    let chars: Vec<char> = snippet.chars().collect();
    let mut chains = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let is_sigil = chars[i] == '@';
        let ident_start = if is_sigil { i + 1 } else { i };
        let starts_ident = (chars[i].is_alphabetic() || chars[i] == '_' || is_sigil)
            && (i == 0 || !is_ident_char(chars[i - 1]));

        if !starts_ident || ident_start >= chars.len() || !is_ident_char(chars[ident_start]) {
            i += 1;
            continue;
        }

        let (recv_name, after_recv) = read_ident(&chars, ident_start);
        let mut j = after_recv;
        let mut segments = Vec::new();

        while j < chars.len() && chars[j] == '.' {
            let seg_start = j + 1;
            if seg_start >= chars.len() || !(chars[seg_start].is_alphabetic() || chars[seg_start] == '_') {
                break;
            }
            let (mut seg_name, mut k) = read_ident(&chars, seg_start);
            if k < chars.len() && (chars[k] == '!' || chars[k] == '?') {
                seg_name.push(chars[k]);
                k += 1;
            }
            let mut args = None;
            if k < chars.len() && chars[k] == '(' {
                if let Some(end) = matching_paren(&chars, k) {
                    args = Some(chars[k + 1..end].iter().collect());
                    k = end + 1;
                }
            }
            segments.push(ChainSegment { name: seg_name, args });
            j = k;
        }

        if !segments.is_empty() {
            let receiver = if is_sigil { format!("@{recv_name}") } else { recv_name };
            chains.push(Chain { receiver, segments });
        }

        i = j.max(after_recv);
    }

    chains
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn member_model() -> &'static str {
        "class Member < ApplicationRecord\n\
         scope :all_canonical, -> { where.not(login_handle: nil).where(owner_id: nil) }\n\
         scope :not_disabled, -> { all_canonical.where(disabler_id: nil) }\n\
         scope :active, -> { not_disabled.where.not(first_login_at: nil) }\n\
         end\n"
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let models = dir.path().join("app").join("models");
        fs::create_dir_all(&models).unwrap();
        fs::write(models.join("member.rb"), member_model()).unwrap();
        fs::write(
            models.join("company.rb"),
            "class Company < ApplicationRecord\n  has_many :members\n  def find_all_active\n    members.active\n  end\nend\n",
        )
        .unwrap();
        fs::write(models.join("account.rb"), "class Account < ApplicationRecord\nend\n").unwrap();
        dir
    }

    #[test]
    fn s1_perfect_scope_match_yields_five_conditions() {
        let dir = fixture();
        let resolver = ScopeResolver::new(dir.path());
        let snippet = "Member.where(company_id: 32546).active.offset((page-1)*page_size).limit(page_size).order(id: :asc)";
        let conditions = extract_conditions(snippet, "Member", &resolver);
        assert_eq!(conditions.len(), 5);
    }

    #[test]
    fn s2_missing_where_trap_yields_four_conditions() {
        let dir = fixture();
        let resolver = ScopeResolver::new(dir.path());
        let snippet = r#"@company.members.where("first_login_at IS NOT NULL AND login_handle IS NOT NULL AND owner_id IS NULL").offset(0).limit(500).order(id: :asc)"#;
        let conditions = extract_conditions(snippet, "Member", &resolver);
        assert_eq!(conditions.len(), 4);
        assert!(conditions.iter().any(|c| c.column == "company_id"));
    }

    #[test]
    fn s4_heuristic_scope_inference() {
        let dir = fixture();
        let resolver = ScopeResolver::new(dir.path());
        let snippet = r#"Account.for_custom_domain("example.com").first"#;
        let conditions = extract_conditions(snippet, "Account", &resolver);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].column, "custom_domain");
        assert_eq!(conditions[0].operator, Operator::Eq);
        assert_eq!(conditions[0].value, None);
    }

    #[test]
    fn s5_custom_finder_expansion_yields_five_conditions() {
        let dir = fixture();
        let resolver = ScopeResolver::new(dir.path());
        let snippet = "company.find_all_active.offset((page-1)*page_size).limit(page_size).order(id: :asc)";
        let conditions = extract_conditions(snippet, "Company", &resolver);
        assert_eq!(conditions.len(), 5);
        assert!(conditions.iter().any(|c| c.column == "company_id"));
    }
}
