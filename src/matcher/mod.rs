//! WHERE-clause matcher (spec §2 C7, §3 MatchResult, §4.4).

mod source_pass;

pub use source_pass::extract_conditions;

use crate::sql::Condition;

/// Result of matching SQL conditions against code-derived conditions
/// (spec §3 MatchResult, §4.4 Pass C).
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub matched: Vec<Condition>,
    pub missing: Vec<Condition>,
    pub extra: Vec<Condition>,
    pub match_percentage: f64,
}

impl MatchResult {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Two conditions match iff their columns are equal (case-insensitively —
/// already normalized to lowercase), their operators are equal, and either
/// side is `IS_NULL`/`IS_NOT_NULL`, either value is absent (parameterized),
/// or the values are case-insensitive-equal (spec §4.4 Pass C `matches`).
fn matches(a: &Condition, b: &Condition) -> bool {
    use crate::sql::Operator::{IsNotNull, IsNull};

    if a.column != b.column || a.operator != b.operator {
        return false;
    }
    if matches!(a.operator, IsNull | IsNotNull) {
        return true;
    }
    match (&a.value, &b.value) {
        (None, _) | (_, None) => true,
        (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
    }
}

/// Greedy first-match of SQL conditions against the code-side multiset
/// (spec §4.4 Pass C). Each code-side condition is consumed by at most one
/// match, so `matched`/`missing` partition `sql_conditions` exactly.
pub fn match_conditions(sql_conditions: &[Condition], code_conditions: &[Condition]) -> MatchResult {
    let mut pool: Vec<Option<Condition>> = code_conditions.iter().cloned().map(Some).collect();
    let mut matched = Vec::new();
    let mut missing = Vec::new();

    for sql_cond in sql_conditions {
        let hit = pool.iter().position(|slot| slot.as_ref().is_some_and(|c| matches(sql_cond, c)));
        match hit {
            Some(idx) => {
                pool[idx] = None;
                matched.push(sql_cond.clone());
            }
            None => missing.push(sql_cond.clone()),
        }
    }

    let extra = pool.into_iter().flatten().collect();

    let match_percentage = if sql_conditions.is_empty() {
        1.0
    } else {
        matched.len() as f64 / sql_conditions.len() as f64
    };

    MatchResult {
        matched,
        missing,
        extra,
        match_percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Operator;

    fn cond(col: &str, op: Operator, val: Option<&str>) -> Condition {
        Condition::new(col, op, val.map(str::to_string))
    }

    #[test]
    fn perfect_match_has_no_missing_or_extra() {
        let sql = vec![cond("company_id", Operator::Eq, Some("1")), cond("owner_id", Operator::IsNull, None)];
        let code = sql.clone();
        let result = match_conditions(&sql, &code);
        assert_eq!(result.matched.len(), 2);
        assert!(result.missing.is_empty());
        assert!(result.extra.is_empty());
        assert_eq!(result.match_percentage, 1.0);
    }

    #[test]
    fn parameterized_code_value_matches_any_sql_literal() {
        let sql = vec![cond("custom_domain", Operator::Eq, Some("example.com"))];
        let code = vec![cond("custom_domain", Operator::Eq, None)];
        let result = match_conditions(&sql, &code);
        assert_eq!(result.matched.len(), 1);
    }

    #[test]
    fn missing_and_extra_are_disjoint_from_matched() {
        let sql = vec![cond("a", Operator::Eq, Some("1")), cond("b", Operator::IsNull, None)];
        let code = vec![cond("a", Operator::Eq, Some("1")), cond("c", Operator::IsNull, None)];
        let result = match_conditions(&sql, &code);
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.missing, vec![cond("b", Operator::IsNull, None)]);
        assert_eq!(result.extra, vec![cond("c", Operator::IsNull, None)]);
    }

    #[test]
    fn empty_sql_where_is_full_match() {
        let result = match_conditions(&[], &[cond("a", Operator::Eq, Some("1"))]);
        assert_eq!(result.match_percentage, 1.0);
        assert!(result.missing.is_empty());
        assert_eq!(result.extra.len(), 1);
    }

    #[test]
    fn duplicate_code_conditions_are_not_double_counted() {
        let sql = vec![cond("a", Operator::Eq, Some("1")), cond("a", Operator::Eq, Some("1"))];
        let code = vec![cond("a", Operator::Eq, Some("1"))];
        let result = match_conditions(&sql, &code);
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.missing.len(), 1);
    }
}
