//! Model analyzer tool (spec §4.2, §4.6).

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use super::{BoxFuture, Tool};
use crate::analyzers::analyze_model;
use crate::inflector::model_to_snake_case;

pub struct ModelAnalyzerTool {
    project_root: PathBuf,
}

impl ModelAnalyzerTool {
    pub fn try_new(project_root: &Path) -> Result<Self, String> {
        Ok(Self {
            project_root: project_root.to_path_buf(),
        })
    }
}

impl Tool for ModelAnalyzerTool {
    fn name(&self) -> &str {
        "model_analyzer"
    }

    fn description(&self) -> &str {
        "Parse a model file into associations, validations, callbacks, methods, and concerns."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "model": {"type": "string", "description": "Model class name, e.g. \"Member\""},
            },
            "required": ["model"],
        })
    }

    fn execute<'a>(&'a self, _project_root: &'a Path, params: Value) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let Some(model) = params.get("model").and_then(Value::as_str) else {
                return json!({"error": "missing required parameter: model"}).to_string();
            };
            let path = self.project_root.join("app").join("models").join(format!("{}.rb", model_to_snake_case(model)));
            match analyze_model(&path) {
                Ok(analysis) => serde_json::to_string(&analysis).unwrap_or_else(|e| json!({"error": e.to_string()}).to_string()),
                Err(e) => json!({"error": e}).to_string(),
            }
        })
    }
}
