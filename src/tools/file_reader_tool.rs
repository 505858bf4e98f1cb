//! File reader tool (spec §4.2): a thin LLM-facing wrapper over
//! [`crate::file_reader`].

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use super::{BoxFuture, Tool};
use crate::file_reader;

pub struct FileReaderTool {
    project_root: PathBuf,
}

impl FileReaderTool {
    pub fn try_new(project_root: &Path) -> Result<Self, String> {
        Ok(Self {
            project_root: project_root.to_path_buf(),
        })
    }
}

impl Tool for FileReaderTool {
    fn name(&self) -> &str {
        "file_reader"
    }

    fn description(&self) -> &str {
        "Read a file rooted at the project root, with line-numbered content and an optional line range."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Path relative to the project root"},
                "line_start": {"type": "integer", "description": "1-indexed first line to return"},
                "line_end": {"type": "integer", "description": "1-indexed last line to return"},
            },
            "required": ["path"],
        })
    }

    fn execute<'a>(&'a self, _project_root: &'a Path, params: Value) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let Some(path) = params.get("path").and_then(Value::as_str) else {
                return json!({"error": "missing required parameter: path"}).to_string();
            };
            let line_start = params.get("line_start").and_then(Value::as_u64).map(|n| n as usize);
            let line_end = params.get("line_end").and_then(Value::as_u64).map(|n| n as usize);

            match file_reader::read(&self.project_root, Path::new(path), line_start, line_end) {
                Ok(result) => serde_json::to_string(&result).unwrap_or_else(|e| json!({"error": e.to_string()}).to_string()),
                Err(e) => json!({"error": e}).to_string(),
            }
        })
    }
}
