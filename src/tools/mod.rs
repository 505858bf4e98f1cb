//! Tool registry and executor (spec §2 C12, §4.2).
//!
//! Holds a name→tool map, a synonym map resolved on lookup, and a list of
//! per-tool construction failures that never take down the rest of the
//! registry.

mod controller_analyzer_tool;
mod file_reader_tool;
mod migration_analyzer_tool;
mod model_analyzer_tool;
mod route_analyzer_tool;
mod sql_rails_search;
mod text_search;

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::protocol::ToolSchema;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A read-only analyzer exposed to the LLM (spec §9 "Dynamic tool registry
/// with unknown schemas").
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    fn execute<'a>(&'a self, project_root: &'a Path, params: Value) -> BoxFuture<'a, String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitializationError {
    pub name: String,
    pub error: String,
}

/// Tool names registered under another, more natural name a model might use
/// (spec §6 "Synonyms are accepted on dispatch but never advertised").
fn synonym_map() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("search", "text_search"),
        ("grep", "text_search"),
        ("sql_trace", "sql_rails_search"),
        ("trace_sql", "sql_rails_search"),
        ("read_file", "file_reader"),
        ("file_read", "file_reader"),
        ("analyze_model", "model_analyzer"),
        ("analyze_controller", "controller_analyzer"),
        ("analyze_routes", "route_analyzer"),
        ("analyze_migrations", "migration_analyzer"),
    ])
}

pub struct ToolRegistry {
    project_root: std::path::PathBuf,
    tools: HashMap<String, Arc<dyn Tool>>,
    synonyms: HashMap<&'static str, &'static str>,
    errors: Vec<InitializationError>,
}

type ToolConstructor = (&'static str, fn(&Path) -> Result<Arc<dyn Tool>, String>);

fn constructors() -> Vec<ToolConstructor> {
    vec![
        ("text_search", |root| text_search::TextSearchTool::try_new(root).map(|t| Arc::new(t) as Arc<dyn Tool>)),
        ("sql_rails_search", |root| sql_rails_search::SqlRailsSearchTool::try_new(root).map(|t| Arc::new(t) as Arc<dyn Tool>)),
        ("file_reader", |root| file_reader_tool::FileReaderTool::try_new(root).map(|t| Arc::new(t) as Arc<dyn Tool>)),
        ("model_analyzer", |root| model_analyzer_tool::ModelAnalyzerTool::try_new(root).map(|t| Arc::new(t) as Arc<dyn Tool>)),
        ("controller_analyzer", |root| controller_analyzer_tool::ControllerAnalyzerTool::try_new(root).map(|t| Arc::new(t) as Arc<dyn Tool>)),
        ("route_analyzer", |root| route_analyzer_tool::RouteAnalyzerTool::try_new(root).map(|t| Arc::new(t) as Arc<dyn Tool>)),
        ("migration_analyzer", |root| migration_analyzer_tool::MigrationAnalyzerTool::try_new(root).map(|t| Arc::new(t) as Arc<dyn Tool>)),
    ]
}

impl ToolRegistry {
    pub fn new(project_root: &Path) -> Self {
        let mut registry = Self {
            project_root: project_root.to_path_buf(),
            tools: HashMap::new(),
            synonyms: synonym_map(),
            errors: Vec::new(),
        };
        registry.refresh(project_root);
        registry
    }

    /// Rebuild the tool map, isolating each tool's construction so a single
    /// failure records an `InitializationError` rather than killing the
    /// registry (spec §4.2, §7 `ToolInitializationError`).
    pub fn refresh(&mut self, project_root: &Path) {
        self.project_root = project_root.to_path_buf();
        self.tools.clear();
        self.errors.clear();

        for (name, construct) in constructors() {
            match construct(project_root) {
                Ok(tool) => {
                    self.tools.insert(name.to_string(), tool);
                }
                Err(error) => self.errors.push(InitializationError { name: name.to_string(), error }),
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let resolved = self.synonyms.get(name).copied().unwrap_or(name);
        self.tools.get(resolved).cloned()
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut names: Vec<&String> = self.tools.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| {
                let tool = &self.tools[name];
                ToolSchema {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    input_schema: tool.input_schema(),
                }
            })
            .collect()
    }

    pub fn errors(&self) -> &[InitializationError] {
        &self.errors
    }

    /// Resolve and run `name` against `params`, returning the tool's result
    /// string, or a synthesized `{error: "tool not found: <name>"}` (spec §7
    /// `ToolExecutionError`).
    pub async fn execute(&self, name: &str, params: Value) -> String {
        match self.get(name) {
            Some(tool) => tool.execute(&self.project_root, params).await,
            None => serde_json::json!({"error": format!("tool not found: {name}")}).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn registers_all_seven_tools() {
        let dir = TempDir::new().unwrap();
        let registry = ToolRegistry::new(dir.path());
        assert!(registry.errors().is_empty());
        assert_eq!(registry.schemas().len(), 7);
    }

    #[tokio::test]
    async fn synonym_resolves_but_is_not_advertised() {
        let dir = TempDir::new().unwrap();
        let registry = ToolRegistry::new(dir.path());
        assert!(registry.get("grep").is_some());
        assert!(!registry.schemas().iter().any(|s| s.name == "grep"));
    }

    #[tokio::test]
    async fn unknown_tool_yields_error_result() {
        let dir = TempDir::new().unwrap();
        let registry = ToolRegistry::new(dir.path());
        let result = registry.execute("not_a_real_tool", serde_json::json!({})).await;
        assert!(result.contains("tool not found"));
    }

    #[tokio::test]
    async fn file_reader_tool_round_trips_through_registry() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("app/models")).unwrap();
        std::fs::write(dir.path().join("app/models/member.rb"), "class Member\nend\n").unwrap();
        let registry = ToolRegistry::new(dir.path());
        let result = registry.execute("file_reader", serde_json::json!({"path": "app/models/member.rb"})).await;
        assert!(result.contains("class Member"));
    }
}
