//! Rule set (spec §2 C10, §4.5 "Pattern generation").
//!
//! Each rule is a pure function `Statement -> (patterns, locations)`. The
//! progressive search engine (`src/search/progressive.rs`) merges and sorts
//! their output.

use crate::sql::Statement;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchPattern {
    pub regex_or_substring: String,
    pub distinctiveness: f64,
    pub clause_type: String,
    pub optional: bool,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLocation<'a> {
    pub glob: &'a str,
    pub priority: i32,
}

const MODEL_GLOB: &str = "app/models/**/*.rb";
const CONTROLLER_GLOB: &str = "app/controllers/**/*.rb";
const WORKER_GLOB: &str = "app/{workers,jobs,services}/**/*.rb";

/// `(X-1)*size`/`(X - 1) * size` style offset expressions — the same shape
/// `pagination::extract_source_pagination` recognizes as the conventional
/// pagination formula.
fn is_known_pagination_formula(raw: &str) -> bool {
    raw.contains('*') && raw.contains('-') && raw.contains('1')
}

/// Emits a literal-limit pattern, and — when the offset expression looks like
/// a `(page - 1) * size` formula — an `offset((…)*…)` pattern (spec §4.5
/// LimitOffsetRule). Ranks worker/job/request-handler directories ahead of
/// models, since pagination rarely lives in a model.
pub fn limit_offset_rule(stmt: &Statement) -> (Vec<SearchPattern>, Vec<SearchLocation<'static>>) {
    let mut patterns = Vec::new();
    let locations = vec![
        SearchLocation { glob: WORKER_GLOB, priority: 0 },
        SearchLocation { glob: CONTROLLER_GLOB, priority: 1 },
        SearchLocation { glob: MODEL_GLOB, priority: 2 },
    ];

    if stmt.has_limit {
        if let Some(limit) = stmt.limit_literal {
            let distinctiveness = if [1, 10, 100].contains(&limit) { 0.6 } else { 0.9 };
            patterns.push(SearchPattern {
                regex_or_substring: format!(r"\.limit\(\s*{limit}\s*\)"),
                distinctiveness,
                clause_type: "limit".to_string(),
                optional: false,
                description: format!("literal LIMIT {limit}"),
            });
        }
    }

    if stmt.has_offset {
        if let Some(raw) = stmt.raw.split("OFFSET").nth(1) {
            if is_known_pagination_formula(raw) {
                patterns.push(SearchPattern {
                    regex_or_substring: r"\.offset\(\s*\(.*\)\s*\*.*\)".to_string(),
                    distinctiveness: 0.7,
                    clause_type: "offset".to_string(),
                    optional: false,
                    description: "conventional (page - 1) * size offset formula".to_string(),
                });
            }
        }
    }

    (patterns, locations)
}

/// For each WHERE column, guess a plausible scope name via the same
/// `having_<col>`/`without_<col>` heuristics the source-pass matcher uses in
/// reverse, and emit a `scope :<name>` pattern (spec §4.5 ScopeDefinitionRule).
pub fn scope_definition_rule(stmt: &Statement) -> (Vec<SearchPattern>, Vec<SearchLocation<'static>>) {
    let mut patterns = Vec::new();
    for cond in &stmt.where_conditions {
        for candidate in scope_name_candidates(&cond.column) {
            patterns.push(SearchPattern {
                regex_or_substring: format!(r"scope\s+:{candidate}\b"),
                distinctiveness: 0.6,
                clause_type: "scope".to_string(),
                optional: false,
                description: format!("scope :{candidate} definition"),
            });
        }
    }
    (patterns, vec![SearchLocation { glob: MODEL_GLOB, priority: 0 }])
}

fn scope_name_candidates(column: &str) -> Vec<String> {
    vec![format!("having_{column}"), format!("without_{column}"), format!("with_{column}"), format!("for_{column}")]
}

/// For each `<col>_id` WHERE column, emit `belongs_to :<col>` and
/// `has_many :<col>s` patterns (spec §4.5 AssociationRule).
pub fn association_rule(stmt: &Statement) -> (Vec<SearchPattern>, Vec<SearchLocation<'static>>) {
    let mut patterns = Vec::new();
    for cond in &stmt.where_conditions {
        if let Some(assoc) = cond.column.strip_suffix("_id") {
            patterns.push(SearchPattern {
                regex_or_substring: format!(r"belongs_to\s+:{assoc}\b"),
                distinctiveness: 0.5,
                clause_type: "association".to_string(),
                optional: false,
                description: format!("belongs_to :{assoc}"),
            });
            patterns.push(SearchPattern {
                regex_or_substring: format!(r"has_many\s+:{assoc}s\b"),
                distinctiveness: 0.5,
                clause_type: "association".to_string(),
                optional: false,
                description: format!("has_many :{assoc}s"),
            });
        }
    }
    (patterns, vec![SearchLocation { glob: MODEL_GLOB, priority: 0 }])
}

/// For each `ORDER BY <col>`, emit `.order(:<col>` and `.order("<col>`
/// patterns (spec §4.5 OrderByRule).
pub fn order_by_rule(stmt: &Statement) -> (Vec<SearchPattern>, Vec<SearchLocation<'static>>) {
    let mut patterns = Vec::new();
    for key in &stmt.order_by {
        patterns.push(SearchPattern {
            regex_or_substring: format!(r#"\.order\(:{}"#, key.column),
            distinctiveness: 0.4,
            clause_type: "order".to_string(),
            optional: false,
            description: format!("order by :{}", key.column),
        });
        patterns.push(SearchPattern {
            regex_or_substring: format!(r#"\.order\("{}"#, key.column),
            distinctiveness: 0.4,
            clause_type: "order".to_string(),
            optional: false,
            description: format!("order by \"{}\"", key.column),
        });
    }
    (
        patterns,
        vec![
            SearchLocation { glob: MODEL_GLOB, priority: 0 },
            SearchLocation { glob: CONTROLLER_GLOB, priority: 1 },
        ],
    )
}

/// For each WHERE column, emit a hash-form `<col>:` pattern and a
/// string-form `<col>\s*(=|IS|LIKE)` pattern (spec §4.5 GenericQueryRule).
pub fn generic_query_rule(stmt: &Statement) -> (Vec<SearchPattern>, Vec<SearchLocation<'static>>) {
    let mut patterns = Vec::new();
    for cond in &stmt.where_conditions {
        let col = &cond.column;
        patterns.push(SearchPattern {
            regex_or_substring: format!(r"\b{col}:"),
            distinctiveness: 0.4,
            clause_type: "where".to_string(),
            optional: false,
            description: format!("hash-form {col}:"),
        });
        patterns.push(SearchPattern {
            regex_or_substring: format!(r"{col}\s*(=|IS|LIKE)"),
            distinctiveness: 0.5,
            clause_type: "where".to_string(),
            optional: false,
            description: format!("string-form {col} comparison"),
        });
    }
    (
        patterns,
        vec![
            SearchLocation { glob: MODEL_GLOB, priority: 0 },
            SearchLocation { glob: CONTROLLER_GLOB, priority: 1 },
        ],
    )
}

/// Run every rule against `stmt`, deduplicate patterns by `(regex_or_substring,
/// clause_type)` keeping the highest distinctiveness and merging descriptions,
/// and merge locations unique by glob ascending priority (spec §4.5).
pub fn generate_patterns(stmt: &Statement) -> (Vec<SearchPattern>, Vec<SearchLocation<'static>>) {
    let rule_outputs = [
        limit_offset_rule(stmt),
        scope_definition_rule(stmt),
        association_rule(stmt),
        order_by_rule(stmt),
        generic_query_rule(stmt),
    ];

    let mut patterns: Vec<SearchPattern> = Vec::new();
    for (rule_patterns, _) in &rule_outputs {
        for candidate in rule_patterns {
            if let Some(existing) = patterns
                .iter_mut()
                .find(|p| p.regex_or_substring == candidate.regex_or_substring && p.clause_type == candidate.clause_type)
            {
                if candidate.distinctiveness > existing.distinctiveness {
                    existing.distinctiveness = candidate.distinctiveness;
                }
                if !existing.description.contains(&candidate.description) {
                    existing.description = format!("{}; {}", existing.description, candidate.description);
                }
            } else {
                patterns.push(candidate.clone());
            }
        }
    }

    let mut locations: Vec<SearchLocation<'static>> = Vec::new();
    for (_, rule_locations) in &rule_outputs {
        for loc in rule_locations {
            if !locations.iter().any(|l| l.glob == loc.glob) {
                locations.push(*loc);
            }
        }
    }
    locations.sort_by_key(|l| l.priority);

    patterns.sort_by(|a, b| b.distinctiveness.partial_cmp(&a.distinctiveness).unwrap());

    (patterns, locations)
}
