//! Pagination matcher (spec §2 C8, §4.5.1).

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::sql::Statement;
use crate::text_utils::find_call_args;

/// `(limit, offset, page_size)` extracted from one side of the comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaginationInfo {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub page_size: Option<i64>,
    /// Raw identifier passed to `.limit(...)`, when it's a bare name rather
    /// than a literal or resolved constant (source side only).
    pub limit_ident: Option<String>,
    /// Raw identifier captured as the `(page - 1) * <ident>` multiplier in
    /// the offset formula (source side only).
    pub offset_multiplier_ident: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatibilityLevel {
    Perfect,
    Compatible,
    Incompatible,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaginationResult {
    pub level: CompatibilityLevel,
    pub reason: Option<String>,
}

fn conventional_offset_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\(\s*[\w.]+\s*-\s*1\s*\)\s*\*\s*(\w+)\s*$").unwrap())
}

pub fn extract_sql_pagination(stmt: &Statement) -> PaginationInfo {
    PaginationInfo {
        limit: stmt.limit_literal,
        offset: stmt.offset_literal,
        page_size: stmt.limit_literal,
        limit_ident: None,
        offset_multiplier_ident: None,
    }
}

fn resolve(raw: &str, constants: &HashMap<String, i64>) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| constants.get(raw).copied())
}

/// A raw argument that's a bare identifier (`page_size`) rather than a
/// literal or expression — used to prove symbolic equality between two
/// occurrences of the same variable without resolving its value.
fn bare_identifier(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    let starts_ident = chars.next().is_some_and(|c| c.is_alphabetic() || c == '_');
    if starts_ident && chars.all(|c| c.is_alphanumeric() || c == '_') {
        Some(trimmed.to_string())
    } else {
        None
    }
}

/// Extract `(limit, offset, page_size)` from a source snippet: literal
/// arguments, named constants resolved through `constants`, or the
/// conventional `(page - 1) * size` offset form (spec §4.5.1).
pub fn extract_source_pagination(snippet: &str, constants: &HashMap<String, i64>) -> PaginationInfo {
    let limit_args = find_call_args(snippet, "limit");
    let offset_args = find_call_args(snippet, "offset");

    let limit_literal = limit_args.as_deref().and_then(|a| resolve(a, constants));
    let limit_ident = limit_args.as_deref().and_then(bare_identifier);

    let mut offset_literal = None;
    let mut page_size = None;
    let mut offset_multiplier_ident = None;
    if let Some(args) = &offset_args {
        if let Some(n) = resolve(args, constants) {
            offset_literal = Some(n);
        } else if let Some(caps) = conventional_offset_re().captures(args.trim()) {
            let ident = caps[1].to_string();
            page_size = resolve(&ident, constants);
            offset_multiplier_ident = Some(ident);
        }
    }

    if page_size.is_none() {
        page_size = limit_literal;
    }

    PaginationInfo {
        limit: limit_literal,
        offset: offset_literal,
        page_size,
        limit_ident,
        offset_multiplier_ident,
    }
}

/// Classify whether `source`'s pagination expression can actually produce
/// `sql`'s `LIMIT`/`OFFSET` (spec §4.5.1).
pub fn classify_pagination(sql: &PaginationInfo, source: &PaginationInfo) -> PaginationResult {
    if sql.limit.is_none() && sql.offset.is_none() {
        return PaginationResult {
            level: CompatibilityLevel::Perfect,
            reason: None,
        };
    }

    if sql.limit == source.limit && sql.offset == source.offset && (sql.limit.is_some() || sql.offset.is_some()) {
        return PaginationResult {
            level: CompatibilityLevel::Perfect,
            reason: None,
        };
    }

    let page_size = source.page_size.filter(|&p| p != 0);

    let Some(page_size) = page_size else {
        // The `.limit()` argument and the offset formula's multiplier are
        // the same bare identifier, so whatever value it takes at runtime,
        // SQL.LIMIT == page_size and SQL.OFFSET is a multiple of it by
        // construction — no numeric resolution needed to prove that.
        if let (Some(limit_ident), Some(offset_ident)) = (&source.limit_ident, &source.offset_multiplier_ident) {
            if limit_ident == offset_ident {
                return PaginationResult {
                    level: CompatibilityLevel::Compatible,
                    reason: None,
                };
            }
        }
        return PaginationResult {
            level: CompatibilityLevel::Unknown,
            reason: Some("source pagination is non-literal and no constant resolved".to_string()),
        };
    };

    let limit_ok = sql.limit.map_or(true, |l| l == page_size);
    let offset_ok = sql.offset.map_or(true, |o| o % page_size == 0);

    if limit_ok && offset_ok {
        return PaginationResult {
            level: CompatibilityLevel::Compatible,
            reason: None,
        };
    }

    let mut reasons = Vec::new();
    if let Some(o) = sql.offset {
        if o % page_size != 0 {
            reasons.push(format!("OFFSET incompatible: {o} is not a multiple of page_size={page_size}"));
        }
    }
    if let Some(l) = sql.limit {
        if l != page_size {
            reasons.push(format!("LIMIT {l} does not match page_size={page_size}"));
        }
    }

    PaginationResult {
        level: CompatibilityLevel::Incompatible,
        reason: Some(reasons.join("; ")),
    }
}
