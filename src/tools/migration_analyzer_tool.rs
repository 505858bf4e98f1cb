//! Migration analyzer tool (spec §4.2, §4.6).

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use super::{BoxFuture, Tool};
use crate::analyzers::analyze_migrations;

pub struct MigrationAnalyzerTool {
    project_root: PathBuf,
}

impl MigrationAnalyzerTool {
    pub fn try_new(project_root: &Path) -> Result<Self, String> {
        Ok(Self {
            project_root: project_root.to_path_buf(),
        })
    }
}

impl Tool for MigrationAnalyzerTool {
    fn name(&self) -> &str {
        "migration_analyzer"
    }

    fn description(&self) -> &str {
        "Scan db/migrate newest-first and aggregate schema operations for a table."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "table": {"type": "string", "description": "Table name, e.g. \"members\""},
            },
            "required": ["table"],
        })
    }

    fn execute<'a>(&'a self, _project_root: &'a Path, params: Value) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let Some(table) = params.get("table").and_then(Value::as_str) else {
                return json!({"error": "missing required parameter: table"}).to_string();
            };
            let dir = self.project_root.join("db").join("migrate");
            match analyze_migrations(&dir, table) {
                Ok(analysis) => serde_json::to_string(&analysis).unwrap_or_else(|e| json!({"error": e.to_string()}).to_string()),
                Err(e) => json!({"error": e}).to_string(),
            }
        })
    }
}
