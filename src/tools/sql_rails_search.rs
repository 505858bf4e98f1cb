//! SQL→source search tool (spec §4.2): the single tool that composes the
//! SQL parser (C4), rule set (C10), progressive search engine (C11), scope
//! resolver (C6), WHERE matcher (C7), pagination matcher (C8), and
//! confidence scorer (C9) into one ranked result list.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{json, Value};

use super::{BoxFuture, Tool};
use crate::confidence::{self, ClausePresence, ScoreInput};
use crate::inflector::table_to_model;
use crate::matcher::{extract_conditions, match_conditions};
use crate::pagination;
use crate::scope_resolver::ScopeResolver;
use crate::search::search_progressive;
use crate::sql::parse_sql;

#[derive(Debug, Clone, Serialize)]
struct RankedMatch {
    file: String,
    line: usize,
    content: String,
    confidence: f64,
    why: Vec<String>,
}

pub struct SqlRailsSearchTool {
    project_root: PathBuf,
}

impl SqlRailsSearchTool {
    pub fn try_new(project_root: &Path) -> Result<Self, String> {
        Ok(Self {
            project_root: project_root.to_path_buf(),
        })
    }
}

impl Tool for SqlRailsSearchTool {
    fn name(&self) -> &str {
        "sql_rails_search"
    }

    fn description(&self) -> &str {
        "Trace a SQL statement back to the Rails source code most likely to have generated it, ranked by confidence."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sql": {"type": "string", "description": "The SQL statement to trace"},
                "model": {"type": "string", "description": "Model class hint; inferred from the SQL's FROM table when omitted"},
                "constants": {"type": "object", "description": "Named pagination constants resolved against the source, e.g. {\"VC_PAGE_SIZE\": 1000}"},
            },
            "required": ["sql"],
        })
    }

    fn execute<'a>(&'a self, _project_root: &'a Path, params: Value) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let Some(sql) = params.get("sql").and_then(Value::as_str) else {
                return json!({"error": "missing required parameter: sql"}).to_string();
            };

            let stmt = parse_sql(sql);
            let model = params
                .get("model")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| stmt.primary_table.as_deref().map(table_to_model).unwrap_or_default());

            let constants: HashMap<String, i64> = params
                .get("constants")
                .and_then(Value::as_object)
                .map(|obj| obj.iter().filter_map(|(k, v)| v.as_i64().map(|n| (k.clone(), n))).collect())
                .unwrap_or_default();

            let hits = match search_progressive(&self.project_root, &stmt).await {
                Ok(hits) => hits,
                Err(e) => return json!({"error": format!("internal: {e}")}).to_string(),
            };

            let resolver = ScopeResolver::new(&self.project_root);
            let sql_pagination = pagination::extract_sql_pagination(&stmt);

            let mut ranked: Vec<RankedMatch> = hits
                .iter()
                .map(|hit| {
                    let code_conditions = extract_conditions(&hit.content, &model, &resolver);
                    let match_result = match_conditions(&stmt.where_conditions, &code_conditions);
                    let clause_presence = ClausePresence {
                        sql_has_where: stmt.has_where(),
                        sql_has_order: stmt.has_order(),
                        sql_has_limit: stmt.has_limit,
                        sql_has_offset: stmt.has_offset,
                        code_has_where: hit.content.contains(".where("),
                        code_has_order: hit.content.contains(".order("),
                        code_has_limit: hit.content.contains(".limit(") || hit.content.contains(".take") || hit.content.contains(".first") || hit.content.contains(".last"),
                        code_has_offset: hit.content.contains(".offset("),
                    };
                    let source_pagination = pagination::extract_source_pagination(&hit.content, &constants);
                    let pagination_result = pagination::classify_pagination(&sql_pagination, &source_pagination);

                    let score_result = confidence::score(&ScoreInput {
                        match_result: &match_result,
                        clause_presence,
                        pattern_distinctiveness: hit.distinctiveness,
                        matched_pattern_descriptions: &hit.descriptions,
                        pagination: Some(&pagination_result),
                    });

                    RankedMatch {
                        file: hit.path.to_string_lossy().into_owned(),
                        line: hit.line,
                        content: hit.content.clone(),
                        confidence: score_result.confidence,
                        why: score_result.why,
                    }
                })
                .collect();

            ranked.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());

            json!({"matches": ranked}).to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_sql_param_returns_error() {
        let dir = TempDir::new().unwrap();
        let tool = SqlRailsSearchTool::try_new(dir.path()).unwrap();
        let result = tool.execute(dir.path(), json!({})).await;
        assert!(result.contains("missing required parameter"));
    }

    #[tokio::test]
    async fn ranks_matches_by_confidence_descending() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("app/models")).unwrap();
        std::fs::write(
            dir.path().join("app/models/member.rb"),
            "class Member < ApplicationRecord\n  scope :active, -> { where(disabled: nil) }\nend\n",
        )
        .unwrap();

        let tool = SqlRailsSearchTool::try_new(dir.path()).unwrap();
        let result = tool
            .execute(dir.path(), json!({"sql": "SELECT * FROM members WHERE disabled IS NULL"}))
            .await;
        let parsed: Value = serde_json::from_str(&result).unwrap();
        let matches = parsed["matches"].as_array().unwrap();
        for pair in matches.windows(2) {
            assert!(pair[0]["confidence"].as_f64().unwrap() >= pair[1]["confidence"].as_f64().unwrap());
        }
    }
}
