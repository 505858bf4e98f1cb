//! Route analyzer tool (spec §4.2, §4.6).

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use super::{BoxFuture, Tool};
use crate::analyzers::analyze_routes;

pub struct RouteAnalyzerTool {
    project_root: PathBuf,
}

impl RouteAnalyzerTool {
    pub fn try_new(project_root: &Path) -> Result<Self, String> {
        Ok(Self {
            project_root: project_root.to_path_buf(),
        })
    }
}

impl Tool for RouteAnalyzerTool {
    fn name(&self) -> &str {
        "route_analyzer"
    }

    fn description(&self) -> &str {
        "Parse config/routes.rb into resources, namespaces, verb routes, and the root route."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "controller_filter": {"type": "string", "description": "Restrict routes to targets containing this substring"},
            },
            "required": [],
        })
    }

    fn execute<'a>(&'a self, _project_root: &'a Path, params: Value) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let filter = params.get("controller_filter").and_then(Value::as_str);
            let path = self.project_root.join("config").join("routes.rb");
            match analyze_routes(&path, filter) {
                Ok(analysis) => serde_json::to_string(&analysis).unwrap_or_else(|e| json!({"error": e.to_string()}).to_string()),
                Err(e) => json!({"error": e}).to_string(),
            }
        })
    }
}
