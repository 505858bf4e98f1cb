//! Confidence scorer (spec §2 C9, §4.5 "Confidence scoring").

use crate::matcher::MatchResult;
use crate::pagination::{CompatibilityLevel, PaginationResult};
use crate::sql::Statement;

/// `{sql_has_*, code_has_*}` clause-presence record (spec GLOSSARY "Clause presence").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClausePresence {
    pub sql_has_where: bool,
    pub sql_has_order: bool,
    pub sql_has_limit: bool,
    pub sql_has_offset: bool,
    pub code_has_where: bool,
    pub code_has_order: bool,
    pub code_has_limit: bool,
    pub code_has_offset: bool,
}

/// Derive clause presence by literal substring checks over the expanded
/// snippet (spec §4.5: `.where(`, `.order(`, `.limit(`, `.offset(` and
/// `.take`/`.first`/`.last` as limit-equivalents).
pub fn derive_clause_presence(stmt: &Statement, snippet: &str) -> ClausePresence {
    ClausePresence {
        sql_has_where: stmt.has_where(),
        sql_has_order: stmt.has_order(),
        sql_has_limit: stmt.has_limit,
        sql_has_offset: stmt.has_offset,
        code_has_where: snippet.contains(".where("),
        code_has_order: snippet.contains(".order("),
        code_has_limit: snippet.contains(".limit(")
            || snippet.contains(".take")
            || snippet.contains(".first")
            || snippet.contains(".last"),
        code_has_offset: snippet.contains(".offset("),
    }
}

pub struct ScoreInput<'a> {
    pub match_result: &'a MatchResult,
    pub clause_presence: ClausePresence,
    pub pattern_distinctiveness: f64,
    pub matched_pattern_descriptions: &'a [String],
    pub pagination: Option<&'a PaginationResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceResult {
    pub confidence: f64,
    pub why: Vec<String>,
}

const WEIGHT_WHERE: f64 = 0.60;
const WEIGHT_ORDER: f64 = 0.15;
const WEIGHT_LIMIT: f64 = 0.10;
const WEIGHT_OFFSET: f64 = 0.10;
const WEIGHT_PATTERN: f64 = 0.05;

/// Combine `MatchResult`, clause presence, pattern distinctiveness, and
/// pagination compatibility into a single `[0,1]` score with an explanation
/// trail, under the strict caps of spec §4.5.
pub fn score(input: &ScoreInput) -> ConfidenceResult {
    let mut why = Vec::new();
    let cp = input.clause_presence;
    let mr = input.match_result;
    let sql_condition_count = mr.matched.len() + mr.missing.len();

    let where_score = if sql_condition_count == 0 {
        1.0
    } else if mr.is_complete() {
        if mr.extra.is_empty() {
            why.push(format!("✓ All {sql_condition_count} WHERE conditions matched"));
        } else {
            why.push(format!(
                "✓ All {sql_condition_count} WHERE conditions matched (note: {} extra condition(s) in code)",
                mr.extra.len()
            ));
        }
        1.0
    } else {
        why.push(format!("✗ Missing {}/{} WHERE conditions", mr.missing.len(), sql_condition_count));
        piecewise_where_score(mr.match_percentage)
    };

    let order_score = clause_component_score(cp.sql_has_order, cp.code_has_order, "ORDER BY", &mut why);
    let limit_score = clause_component_score(cp.sql_has_limit, cp.code_has_limit, "LIMIT", &mut why);
    let offset_score = clause_component_score(cp.sql_has_offset, cp.code_has_offset, "OFFSET", &mut why);
    let pattern_score = input.pattern_distinctiveness.min(1.0);

    let weighted = where_score * WEIGHT_WHERE
        + order_score * WEIGHT_ORDER
        + limit_score * WEIGHT_LIMIT
        + offset_score * WEIGHT_OFFSET
        + pattern_score * WEIGHT_PATTERN;

    let mut confidence = weighted;

    if !mr.missing.is_empty() {
        confidence = confidence.min(0.40);
        why.push("cap: missing WHERE condition(s) → confidence ≤ 0.40".to_string());
    }
    if (cp.sql_has_limit || cp.sql_has_offset) && cp.sql_has_order && !cp.code_has_order {
        confidence = confidence.min(0.60);
        why.push("cap: SQL paginates with ORDER BY but code lacks ORDER BY → confidence ≤ 0.60".to_string());
    }
    if let Some(pagination) = input.pagination {
        if pagination.level == CompatibilityLevel::Incompatible {
            confidence = confidence.min(0.50);
            why.push("cap: pagination incompatible → confidence ≤ 0.50".to_string());
            if let Some(reason) = &pagination.reason {
                why.push(reason.clone());
            }
        }
    }

    let missing_critical =
        mr.missing.len() + usize::from(cp.sql_has_order && !cp.code_has_order) + usize::from(cp.sql_has_limit && !cp.code_has_limit);
    if missing_critical >= 3 {
        confidence = confidence.min(0.25);
        why.push("cap: 3+ critical clauses missing → confidence ≤ 0.25".to_string());
    }

    confidence = confidence.clamp(0.0, 1.0);

    why.extend(input.matched_pattern_descriptions.iter().take(3).cloned());

    ConfidenceResult { confidence, why }
}

fn piecewise_where_score(m: f64) -> f64 {
    if m >= 0.75 {
        0.5 + (m - 0.75) * 0.8
    } else if m >= 0.50 {
        0.3 + (m - 0.50) * 0.8
    } else {
        m * 0.6
    }
}

fn clause_component_score(sql_has: bool, code_has: bool, label: &str, why: &mut Vec<String>) -> f64 {
    if !sql_has {
        return 1.0;
    }
    if code_has {
        why.push(format!("✓ {label} present"));
        1.0
    } else {
        why.push(format!("✗ {label} required by SQL but absent in code"));
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::match_conditions;
    use crate::sql::{Condition, Operator};

    fn presence_all_satisfied() -> ClausePresence {
        ClausePresence {
            sql_has_where: true,
            sql_has_order: true,
            sql_has_limit: true,
            sql_has_offset: true,
            code_has_where: true,
            code_has_order: true,
            code_has_limit: true,
            code_has_offset: true,
        }
    }

    #[test]
    fn perfect_match_scores_high() {
        let sql = vec![Condition::new("a", Operator::Eq, Some("1".into()))];
        let result = match_conditions(&sql, &sql);
        let score_result = score(&ScoreInput {
            match_result: &result,
            clause_presence: presence_all_satisfied(),
            pattern_distinctiveness: 1.0,
            matched_pattern_descriptions: &[],
            pagination: None,
        });
        assert!(score_result.confidence >= 0.85, "{}", score_result.confidence);
    }

    #[test]
    fn missing_where_caps_at_point_four() {
        let sql = vec![
            Condition::new("a", Operator::Eq, Some("1".into())),
            Condition::new("b", Operator::IsNull, None),
            Condition::new("c", Operator::IsNull, None),
            Condition::new("d", Operator::IsNull, None),
            Condition::new("e", Operator::IsNotNull, None),
        ];
        let code = vec![
            Condition::new("a", Operator::Eq, Some("1".into())),
            Condition::new("c", Operator::IsNull, None),
            Condition::new("d", Operator::IsNull, None),
            Condition::new("e", Operator::IsNotNull, None),
        ];
        let result = match_conditions(&sql, &code);
        let score_result = score(&ScoreInput {
            match_result: &result,
            clause_presence: presence_all_satisfied(),
            pattern_distinctiveness: 1.0,
            matched_pattern_descriptions: &[],
            pagination: None,
        });
        assert!(score_result.confidence <= 0.40);
        assert!(score_result.why.iter().any(|w| w.contains("Missing 1/5")));
    }

    #[test]
    fn monotone_in_matched_count() {
        let all_sql = vec![
            Condition::new("a", Operator::Eq, Some("1".into())),
            Condition::new("b", Operator::Eq, Some("2".into())),
            Condition::new("c", Operator::Eq, Some("3".into())),
            Condition::new("d", Operator::Eq, Some("4".into())),
        ];
        let mut prev = -1.0;
        for n in 0..=all_sql.len() {
            let code: Vec<_> = all_sql[..n].to_vec();
            let result = match_conditions(&all_sql, &code);
            let score_result = score(&ScoreInput {
                match_result: &result,
                clause_presence: presence_all_satisfied(),
                pattern_distinctiveness: 0.5,
                matched_pattern_descriptions: &[],
                pagination: None,
            });
            assert!(score_result.confidence >= prev, "confidence decreased at n={n}");
            prev = score_result.confidence;
        }
    }

    #[test]
    fn three_or_more_critical_missing_caps_at_quarter() {
        let sql = vec![Condition::new("a", Operator::Eq, Some("1".into()))];
        let result = match_conditions(&sql, &[]);
        let mut presence = presence_all_satisfied();
        presence.code_has_order = false;
        presence.code_has_limit = false;
        let score_result = score(&ScoreInput {
            match_result: &result,
            clause_presence: presence,
            pattern_distinctiveness: 0.0,
            matched_pattern_descriptions: &[],
            pagination: None,
        });
        assert!(score_result.confidence <= 0.25);
    }
}
