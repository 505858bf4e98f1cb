//! Controller analyzer tool (spec §4.2, §4.6).

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use super::{BoxFuture, Tool};
use crate::analyzers::analyze_controller;
use crate::inflector::model_to_snake_case;

pub struct ControllerAnalyzerTool {
    project_root: PathBuf,
}

impl ControllerAnalyzerTool {
    pub fn try_new(project_root: &Path) -> Result<Self, String> {
        Ok(Self {
            project_root: project_root.to_path_buf(),
        })
    }
}

impl Tool for ControllerAnalyzerTool {
    fn name(&self) -> &str {
        "controller_analyzer"
    }

    fn description(&self) -> &str {
        "Parse a controller file into actions, filters, private/protected methods, and concerns."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "controller": {"type": "string", "description": "Controller name without suffix, e.g. \"Members\""},
            },
            "required": ["controller"],
        })
    }

    fn execute<'a>(&'a self, _project_root: &'a Path, params: Value) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let Some(controller) = params.get("controller").and_then(Value::as_str) else {
                return json!({"error": "missing required parameter: controller"}).to_string();
            };
            let path = self
                .project_root
                .join("app")
                .join("controllers")
                .join(format!("{}_controller.rb", model_to_snake_case(controller)));
            match analyze_controller(&path) {
                Ok(analysis) => serde_json::to_string(&analysis).unwrap_or_else(|e| json!({"error": e.to_string()}).to_string()),
                Err(e) => json!({"error": e}).to_string(),
            }
        })
    }
}
