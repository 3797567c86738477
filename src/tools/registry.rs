//! Tool registry: name -> tool instance.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::settings::Settings;
use crate::tools::builtin::{Calculator, CalculatorTool, FileManager, FileTool, SearchTool};
use crate::tools::sandbox::PathSandbox;
use crate::tools::tool::{Tool, ToolSchema};

/// Holds the tools the dispatcher can route to. Built once at startup and
/// shared immutably; each tool is a plain service object with its
/// dependencies injected, not a global.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire up the three built-in tools from settings.
    pub fn builtin(settings: &Settings) -> Self {
        let sandbox = PathSandbox::from_settings(settings);

        let mut registry = Self::new();
        registry.register(Arc::new(CalculatorTool::new(Calculator::new(
            settings.max_precision,
        ))));
        registry.register(Arc::new(FileTool::new(FileManager::new(
            sandbox,
            settings.max_file_size,
        ))));
        registry.register(Arc::new(SearchTool::new(settings.search_timeout)));
        registry
    }

    /// Register a tool under its own name. Re-registering replaces.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Schemas for every registered tool, sorted by name.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<_> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Run every tool's self-test.
    pub async fn health(&self) -> BTreeMap<String, bool> {
        let mut checks = BTreeMap::new();
        for (name, tool) in &self.tools {
            checks.insert(name.clone(), tool.health_check().await);
        }
        checks
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
