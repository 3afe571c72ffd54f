//! Tool trait and registry
//!
//! Tools are external capabilities the reasoner may request. Registration
//! is a mapping from tool name to a capability interface, so new tools
//! never touch the loop's control flow.

use crate::models::ToolCall;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;

pub mod search;
pub use search::WebSearchTool;

/// Trait for a single tool invocation
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// One outbound call per invocation; no caching at this layer.
    async fn execute(&self, call: &ToolCall) -> Result<serde_json::Value>;
}

/// Name + description pair handed to the reasoner's system prompt.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
}

/// Tool registry for looking up and dispatching tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools
            .values()
            .map(|t| ToolSpec {
                name: t.name(),
                description: t.description(),
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the default registry with the HTTP-backed search tool.
pub fn create_default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(WebSearchTool::from_env()));
    registry
}
