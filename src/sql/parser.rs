//! SQL statement analyzer (spec §2 C4, §4.4 Pass A).
//!
//! Regex-driven, not a full parser — this mirrors the teacher's own
//! preference for targeted regexes over a grammar (`tool_parsing/*`), and is
//! exactly what spec §4.4 prescribes: "string-level split is acceptable
//! because nested OR/parentheses ... degrade gracefully into UNKNOWN
//! operators, which never match."

use std::sync::OnceLock;

use regex::Regex;

use super::types::{Condition, OrderKey, Operator, Statement, StatementKind};

fn where_clause_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)\bWHERE\b(.*?)(?:\bORDER\s+BY\b|\bLIMIT\b|\bOFFSET\b|\bGROUP\s+BY\b|$)").unwrap()
    })
}

fn order_by_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)\bORDER\s+BY\b(.*?)(?:\bLIMIT\b|\bOFFSET\b|$)").unwrap())
}

fn limit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bLIMIT\s+(\d+)").unwrap())
}

fn offset_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bOFFSET\s+(\d+)").unwrap())
}

fn from_table_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)\bFROM\s+["`]?([A-Za-z0-9_.]+)["`]?"#).unwrap())
}

fn select_columns_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)^\s*SELECT\s+(.*?)\s+FROM\b").unwrap())
}

fn is_not_null_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)^\s*([`"]?[A-Za-z0-9_.]+[`"]?)\s+IS\s+NOT\s+NULL\s*$"#).unwrap())
}

fn is_null_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)^\s*([`"]?[A-Za-z0-9_.]+[`"]?)\s+IS\s+NULL\s*$"#).unwrap())
}

fn binop_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)^\s*([`"]?[A-Za-z0-9_.]+[`"]?)\s*(!=|<>|<=|>=|=|<|>)\s*(.+?)\s*$"#).unwrap()
    })
}

fn multi_digit_numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d+(\.\d+)?$").unwrap())
}

/// Classify a SQL statement and extract its primary table, columns, and a
/// normalized `WHERE`/`ORDER`/`LIMIT`/`OFFSET` skeleton.
pub fn parse_sql(raw: &str) -> Statement {
    let kind = classify(raw);
    let primary_table = from_table_re()
        .captures(raw)
        .map(|c| c[1].to_lowercase());

    let columns = if matches!(kind, StatementKind::Select) {
        extract_columns(raw)
    } else {
        Vec::new()
    };

    let where_conditions = where_clause_re()
        .captures(raw)
        .map(|c| parse_where_fragment(&c[1]))
        .unwrap_or_default();

    let order_by = order_by_re()
        .captures(raw)
        .map(|c| parse_order_by(&c[1]))
        .unwrap_or_default();

    let limit_literal = limit_re().captures(raw).and_then(|c| c[1].parse::<i64>().ok());
    let offset_literal = offset_re().captures(raw).and_then(|c| c[1].parse::<i64>().ok());

    Statement {
        kind,
        primary_table,
        columns,
        where_conditions,
        order_by,
        has_limit: limit_re().is_match(raw),
        limit_literal,
        has_offset: offset_re().is_match(raw),
        offset_literal,
        raw: raw.to_string(),
    }
}

fn classify(raw: &str) -> StatementKind {
    let trimmed = raw.trim_start();
    let upper_prefix: String = trimmed
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_uppercase();
    match upper_prefix.as_str() {
        "SELECT" => StatementKind::Select,
        "INSERT" => StatementKind::Insert,
        "UPDATE" => StatementKind::Update,
        "DELETE" => StatementKind::Delete,
        "BEGIN" | "START" => StatementKind::Begin,
        "COMMIT" => StatementKind::Commit,
        "ROLLBACK" => StatementKind::Rollback,
        _ => StatementKind::Other,
    }
}

fn extract_columns(raw: &str) -> Vec<String> {
    let Some(caps) = select_columns_re().captures(raw) else {
        return Vec::new();
    };
    let column_list = caps[1].trim();
    if column_list == "*" {
        return vec!["*".to_string()];
    }
    split_top_level(column_list, ',')
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

fn parse_order_by(fragment: &str) -> Vec<OrderKey> {
    split_top_level(fragment, ',')
        .into_iter()
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let descending = part.to_uppercase().ends_with("DESC");
            let column = part
                .split_whitespace()
                .next()
                .unwrap_or("")
                .trim_matches(|c| c == '`' || c == '"')
                .rsplit('.')
                .next()
                .unwrap_or("")
                .to_lowercase();
            if column.is_empty() {
                None
            } else {
                Some(OrderKey { column, descending })
            }
        })
        .collect()
}

/// Split `WHERE` text at top-level `AND` and parse each fragment into a
/// `Condition` (spec §4.4 Pass A).
pub fn parse_where_fragment(fragment: &str) -> Vec<Condition> {
    split_top_level_and(fragment)
        .into_iter()
        .filter_map(|f| parse_single_condition(f.trim()))
        .collect()
}

fn parse_single_condition(fragment: &str) -> Option<Condition> {
    if fragment.is_empty() {
        return None;
    }

    if let Some(caps) = is_not_null_re().captures(fragment) {
        return Some(Condition::new(strip_ident(&caps[1]), Operator::IsNotNull, None));
    }
    if let Some(caps) = is_null_re().captures(fragment) {
        return Some(Condition::new(strip_ident(&caps[1]), Operator::IsNull, None));
    }
    if let Some(caps) = binop_re().captures(fragment) {
        let column = strip_ident(&caps[1]);
        let operator = match &caps[2] {
            "=" => Operator::Eq,
            "!=" | "<>" => Operator::Ne,
            "<=" => Operator::Le,
            ">=" => Operator::Ge,
            "<" => Operator::Lt,
            ">" => Operator::Gt,
            _ => Operator::Unknown,
        };
        let value = normalize_literal(caps[3].trim());
        return Some(Condition::new(column, operator, value));
    }

    // Anything we don't recognize (OR, parenthesized groups, IN/BETWEEN/LIKE
    // with complex RHS) degrades gracefully to UNKNOWN, which never matches.
    Some(Condition::new(fragment, Operator::Unknown, None))
}

/// Strip backticks/quotes and a table-qualifier prefix, lowercase.
fn strip_ident(raw: &str) -> String {
    let unquoted = raw.trim_matches(|c| c == '`' || c == '"');
    unquoted.rsplit('.').next().unwrap_or(unquoted).to_lowercase()
}

/// Stringify and trim a literal; multi-digit numeric literals are preserved
/// as-is, everything else that isn't a quoted literal becomes "parameterized"
/// (an absent value), per spec §4.4 Pass A.
fn normalize_literal(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if (raw.starts_with('\'') && raw.ends_with('\'') && raw.len() >= 2)
        || (raw.starts_with('"') && raw.ends_with('"') && raw.len() >= 2)
    {
        return Some(raw[1..raw.len() - 1].to_string());
    }
    if multi_digit_numeric_re().is_match(raw) {
        return Some(raw.to_string());
    }
    // Placeholders (?, $1, :name) and bare identifiers are parameterized.
    None
}

/// Split a string at top-level occurrences of a separator character,
/// respecting single/double-quote nesting and parentheses depth.
pub(crate) fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_single = false;
    let mut in_double = false;
    let mut current = String::new();

    for c in s.chars() {
        match c {
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(c);
            }
            '"' if !in_single => {
                in_double = !in_double;
                current.push(c);
            }
            '(' if !in_single && !in_double => {
                depth += 1;
                current.push(c);
            }
            ')' if !in_single && !in_double => {
                depth -= 1;
                current.push(c);
            }
            c if c == sep && depth == 0 && !in_single && !in_double => {
                parts.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() || !parts.is_empty() {
        parts.push(current);
    }
    parts
}

/// Split at top-level `AND` (case-insensitive word boundary), respecting
/// quote/paren nesting the same way `split_top_level` does.
fn split_top_level_and(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_single = false;
    let mut in_double = false;
    let bytes: Vec<char> = s.chars().collect();
    let mut current = String::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(c);
                i += 1;
            }
            '"' if !in_single => {
                in_double = !in_double;
                current.push(c);
                i += 1;
            }
            '(' if !in_single && !in_double => {
                depth += 1;
                current.push(c);
                i += 1;
            }
            ')' if !in_single && !in_double => {
                depth -= 1;
                current.push(c);
                i += 1;
            }
            _ if depth == 0
                && !in_single
                && !in_double
                && matches_and_keyword(&bytes, i) =>
            {
                parts.push(std::mem::take(&mut current));
                i += 3;
            }
            c => {
                current.push(c);
                i += 1;
            }
        }
    }
    parts.push(current);
    parts
}

fn matches_and_keyword(chars: &[char], i: usize) -> bool {
    if i + 3 > chars.len() {
        return false;
    }
    let word: String = chars[i..i + 3].iter().collect();
    if !word.eq_ignore_ascii_case("and") {
        return false;
    }
    let before_ok = i == 0 || chars[i - 1].is_whitespace();
    let after_ok = i + 3 == chars.len() || chars[i + 3].is_whitespace();
    before_ok && after_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statement_kinds() {
        assert_eq!(parse_sql("SELECT * FROM users").kind, StatementKind::Select);
        assert_eq!(parse_sql("INSERT INTO users VALUES (1)").kind, StatementKind::Insert);
        assert_eq!(parse_sql("UPDATE users SET x=1").kind, StatementKind::Update);
        assert_eq!(parse_sql("DELETE FROM users").kind, StatementKind::Delete);
        assert_eq!(parse_sql("COMMIT").kind, StatementKind::Commit);
    }

    #[test]
    fn extracts_primary_table_and_star_columns() {
        let stmt = parse_sql("SELECT * FROM members WHERE id = 1");
        assert_eq!(stmt.primary_table.as_deref(), Some("members"));
        assert_eq!(stmt.columns, vec!["*".to_string()]);
    }

    #[test]
    fn parses_full_s1_statement() {
        let sql = "SELECT * FROM members WHERE company_id = 32546 AND login_handle IS NOT NULL \
                    AND owner_id IS NULL AND disabler_id IS NULL AND first_login_at IS NOT NULL \
                    ORDER BY id ASC LIMIT 500 OFFSET 1000";
        let stmt = parse_sql(sql);
        assert_eq!(stmt.where_conditions.len(), 5);
        assert_eq!(stmt.where_conditions[0].column, "company_id");
        assert_eq!(stmt.where_conditions[0].operator, Operator::Eq);
        assert_eq!(stmt.where_conditions[0].value.as_deref(), Some("32546"));
        assert_eq!(stmt.where_conditions[1].operator, Operator::IsNotNull);
        assert!(stmt.where_conditions[1].value.is_none());
        assert_eq!(stmt.order_by.len(), 1);
        assert_eq!(stmt.order_by[0].column, "id");
        assert!(!stmt.order_by[0].descending);
        assert!(stmt.has_limit);
        assert_eq!(stmt.limit_literal, Some(500));
        assert!(stmt.has_offset);
        assert_eq!(stmt.offset_literal, Some(1000));
    }

    #[test]
    fn strips_backticks_and_table_prefix() {
        let stmt = parse_sql("SELECT * FROM users WHERE `users`.`id` = 5");
        assert_eq!(stmt.where_conditions[0].column, "id");
    }

    #[test]
    fn parameterizes_non_numeric_non_quoted_values() {
        let stmt = parse_sql("SELECT * FROM users WHERE id = ?");
        assert_eq!(stmt.where_conditions[0].value, None);
    }

    #[test]
    fn quoted_string_literal_is_stringified() {
        let stmt = parse_sql("SELECT * FROM accounts WHERE custom_domain = 'example.com'");
        assert_eq!(stmt.where_conditions[0].value.as_deref(), Some("example.com"));
    }

    #[test]
    fn idempotent_on_reparse_of_normalized_form() {
        let sql = "SELECT * FROM members WHERE company_id = 32546 AND owner_id IS NULL ORDER BY id ASC LIMIT 10 OFFSET 20";
        let first = parse_sql(sql);
        // Reconstruct a normalized-ish SQL from the parsed fields and re-parse.
        let rebuilt = format!(
            "SELECT * FROM {} WHERE {} ORDER BY {} LIMIT {} OFFSET {}",
            first.primary_table.clone().unwrap(),
            first
                .where_conditions
                .iter()
                .map(|c| match c.operator {
                    Operator::Eq => format!("{} = {}", c.column, c.value.clone().unwrap()),
                    Operator::IsNull => format!("{} IS NULL", c.column),
                    _ => unreachable!(),
                })
                .collect::<Vec<_>>()
                .join(" AND "),
            first
                .order_by
                .iter()
                .map(|o| o.column.clone())
                .collect::<Vec<_>>()
                .join(", "),
            first.limit_literal.unwrap(),
            first.offset_literal.unwrap(),
        );
        let second = parse_sql(&rebuilt);
        assert_eq!(first.where_conditions, second.where_conditions);
        assert_eq!(first.order_by, second.order_by);
        assert_eq!(first.limit_literal, second.limit_literal);
        assert_eq!(first.offset_literal, second.offset_literal);
    }
}
