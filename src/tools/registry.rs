//! Tool registry for dynamic tool registration and dispatch.

use crate::ai::ToolDefinition;
use crate::envelope::Envelope;
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// A named, argument-validated function exposed to the language model.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> ToolDefinition;
    async fn execute(&self, arguments: Value) -> Result<Value>;
}

pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
        }
    }

    pub fn register<T: ToolHandler + 'static>(&self, tool: T) {
        let definition = tool.definition();
        let name = definition.name.clone();
        debug!("Registering tool: {}", name);
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).map(|r| Arc::clone(&*r))
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|r| r.value().definition()).collect()
    }

    /// Execute a tool by name, converting every failure into an envelope.
    ///
    /// This is the single place the envelope invariant is enforced: an
    /// unknown name or a failing tool yields `{success:false, error}` and
    /// never aborts the caller's loop.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Envelope {
        let Some(tool) = self.get(name) else {
            return Envelope::failure(format!("Unknown tool: {name}"));
        };

        match tool.execute(arguments).await {
            Ok(payload) => Envelope::ok(payload),
            Err(e) => Envelope::failure(e.to_string()),
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ToolError};
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".into(),
                description: "Echo the input back".into(),
                parameters: json!({"type": "object", "properties": {}}),
            }
        }

        async fn execute(&self, arguments: Value) -> Result<Value> {
            Ok(json!({ "echo": arguments }))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl ToolHandler for FailingTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "failing".into(),
                description: "Always fails".into(),
                parameters: json!({"type": "object", "properties": {}}),
            }
        }

        async fn execute(&self, _arguments: Value) -> Result<Value> {
            Err(Error::Tool(ToolError::ExecutionFailed("boom".into())))
        }
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let registry = ToolRegistry::new();
        registry.register(EchoTool);
        let envelope = registry.dispatch("echo", json!({"x": 1})).await;
        assert!(envelope.success);
        assert_eq!(envelope.get("echo"), Some(&json!({"x": 1})));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool_is_failure_envelope() {
        let registry = ToolRegistry::new();
        let envelope = registry.dispatch("nope", json!({})).await;
        assert!(!envelope.success);
        assert!(envelope.error.as_deref().unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn test_dispatch_error_becomes_envelope() {
        let registry = ToolRegistry::new();
        registry.register(FailingTool);
        let envelope = registry.dispatch("failing", json!({})).await;
        assert!(!envelope.success);
        assert!(envelope.error.as_deref().unwrap().contains("boom"));
    }

    #[test]
    fn test_definitions_listing() {
        let registry = ToolRegistry::new();
        registry.register(EchoTool);
        registry.register(FailingTool);
        assert_eq!(registry.len(), 2);
        let mut names: Vec<_> = registry
            .definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["echo", "failing"]);
    }
}
