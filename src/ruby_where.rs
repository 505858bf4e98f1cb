//! Shared parsing for Ruby `.where` call forms (spec §4.4 Pass B.4).
//!
//! Used by both the scope resolver (C6), which needs to turn a scope body
//! into conditions, and the matcher's source pass (C7 Pass B), which needs
//! the same thing for an arbitrary source snippet. Kept separate from both
//! so neither depends on the other.

use std::sync::OnceLock;

use regex::Regex;

use crate::sql::{self, Condition, Operator};

fn string_where_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?s)\.where(?:\.not)?\(\s*["']([^"']*)["']\s*\)"#).unwrap())
}

fn hash_where_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\.where(\.not)?\(([^\"'][^)]*)\)").unwrap())
}

fn symbol_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^:(\w+)$").unwrap())
}

fn quoted_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^(?:'([^']*)'|"([^"]*)")$"#).unwrap())
}

fn numeric_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d+(\.\d+)?$").unwrap())
}

/// Find every `.where(...)`/`.where.not(...)` call in `snippet` and parse it
/// into `Condition`s, dispatching on string form vs. hash form.
pub fn extract_where_calls(snippet: &str) -> Vec<Condition> {
    let mut conditions = Vec::new();

    for caps in string_where_re().captures_iter(snippet) {
        conditions.extend(sql::parse_where_fragment(&caps[1]));
    }

    for caps in hash_where_re().captures_iter(snippet) {
        let negated = caps.get(1).is_some();
        conditions.extend(parse_hash_form(&caps[2], negated));
    }

    conditions
}

/// Parse a Ruby hash-literal argument list, e.g. `company_id: 32546, owner_id: nil`.
fn parse_hash_form(inner: &str, negated: bool) -> Vec<Condition> {
    sql::split_top_level(inner, ',')
        .into_iter()
        .filter_map(|pair| parse_hash_pair(pair.trim(), negated))
        .collect()
}

fn parse_hash_pair(pair: &str, negated: bool) -> Option<Condition> {
    let (key, value) = pair.split_once(':').or_else(|| pair.split_once("=>"))?;
    let column = key.trim().trim_matches(|c| c == '\'' || c == '"' || c == ':');
    if column.is_empty() {
        return None;
    }
    let value = value.trim().trim_end_matches(',').trim();

    if value == "nil" {
        let op = if negated { Operator::IsNotNull } else { Operator::IsNull };
        return Some(Condition::new(column, op, None));
    }

    let literal = if let Some(caps) = quoted_value_re().captures(value) {
        Some(
            caps.get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        )
    } else if let Some(caps) = symbol_value_re().captures(value) {
        Some(caps[1].to_string())
    } else if numeric_value_re().is_match(value) {
        Some(value.to_string())
    } else {
        None
    };

    let op = if negated { Operator::Ne } else { Operator::Eq };
    Some(Condition::new(column, op, literal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_form_where() {
        let conds = extract_where_calls(r#".where("owner_id IS NULL AND login_handle IS NOT NULL")"#);
        assert_eq!(conds.len(), 2);
    }

    #[test]
    fn parses_hash_form_nil_as_is_null() {
        let conds = extract_where_calls(".where(owner_id: nil)");
        assert_eq!(conds.len(), 1);
        assert_eq!(conds[0].operator, Operator::IsNull);
    }

    #[test]
    fn parses_hash_form_where_not_nil_as_is_not_null() {
        let conds = extract_where_calls(".where.not(login_handle: nil)");
        assert_eq!(conds.len(), 1);
        assert_eq!(conds[0].operator, Operator::IsNotNull);
    }

    #[test]
    fn parses_hash_form_numeric_literal() {
        let conds = extract_where_calls(".where(company_id: 32546)");
        assert_eq!(conds[0].operator, Operator::Eq);
        assert_eq!(conds[0].value.as_deref(), Some("32546"));
    }

    #[test]
    fn parses_hash_form_identifier_as_parameterized() {
        let conds = extract_where_calls(".where(custom_domain: domain_param)");
        assert_eq!(conds[0].operator, Operator::Eq);
        assert_eq!(conds[0].value, None);
    }
}
