//! Text search tool (spec §4.2): a thin LLM-facing wrapper over
//! [`crate::search::text_search`].

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use super::{BoxFuture, Tool};
use crate::search::text_search;

pub struct TextSearchTool {
    project_root: PathBuf,
}

impl TextSearchTool {
    pub fn try_new(project_root: &Path) -> Result<Self, String> {
        Ok(Self {
            project_root: project_root.to_path_buf(),
        })
    }
}

impl Tool for TextSearchTool {
    fn name(&self) -> &str {
        "text_search"
    }

    fn description(&self) -> &str {
        "Search production source files for a regular expression, restricted to a glob pattern."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string", "description": "Regular expression to search for"},
                "glob": {"type": "string", "description": "Glob pattern restricting which files are searched, default \"**/*.rb\""},
            },
            "required": ["pattern"],
        })
    }

    fn execute<'a>(&'a self, _project_root: &'a Path, params: Value) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let Some(pattern) = params.get("pattern").and_then(Value::as_str) else {
                return json!({"error": "missing required parameter: pattern"}).to_string();
            };
            let glob = params.get("glob").and_then(Value::as_str).unwrap_or("**/*.rb");

            match text_search::search(&self.project_root, pattern, glob).await {
                Ok(hits) => {
                    let rows: Vec<Value> = hits
                        .into_iter()
                        .map(|h| json!({"path": h.path.to_string_lossy(), "line": h.line, "content": h.content}))
                        .collect();
                    json!({"hits": rows}).to_string()
                }
                Err(e) => json!({"error": e}).to_string(),
            }
        })
    }
}
