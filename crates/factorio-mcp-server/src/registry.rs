//! Tool registry
//!
//! An ordered table of tools, each a definition (name, description, input
//! schema) paired with the handler that runs it. Lookup is by name at call
//! time; listing preserves registration order.

use crate::error::{Result, ServerError};
use async_trait::async_trait;
use factorio_rcon::CommandExecutor;
use serde::Serialize;

/// Tool definition for MCP tools/list
#[derive(Debug, Clone, Serialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// Runs one tool against the game
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute with the raw JSON argument bag and return text for the agent
    async fn call(&self, rcon: &dyn CommandExecutor, args: serde_json::Value) -> Result<String>;
}

struct ToolEntry {
    definition: ToolDef,
    handler: Box<dyn ToolHandler>,
}

/// Registry of available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<ToolEntry>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. A tool registered under an existing name replaces it in place.
    pub fn register(&mut self, definition: ToolDef, handler: impl ToolHandler + 'static) {
        let entry = ToolEntry {
            definition,
            handler: Box::new(handler),
        };

        match self
            .tools
            .iter_mut()
            .find(|existing| existing.definition.name == entry.definition.name)
        {
            Some(existing) => *existing = entry,
            None => self.tools.push(entry),
        }
    }

    /// Definitions in registration order
    pub fn definitions(&self) -> Vec<&ToolDef> {
        self.tools.iter().map(|entry| &entry.definition).collect()
    }

    /// Look up a tool definition
    pub fn get(&self, name: &str) -> Option<&ToolDef> {
        self.find(name).map(|entry| &entry.definition)
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run the named tool
    pub async fn call(
        &self,
        name: &str,
        rcon: &dyn CommandExecutor,
        args: serde_json::Value,
    ) -> Result<String> {
        let entry = self
            .find(name)
            .ok_or_else(|| ServerError::UnknownTool(name.to_string()))?;
        entry.handler.call(rcon, args).await
    }

    fn find(&self, name: &str) -> Option<&ToolEntry> {
        self.tools.iter().find(|entry| entry.definition.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factorio_rcon::Result as RconResult;

    struct Echo;

    #[async_trait]
    impl CommandExecutor for Echo {
        async fn execute(&self, command: &str) -> RconResult<String> {
            Ok(command.to_string())
        }
    }

    struct Fixed(&'static str);

    #[async_trait]
    impl ToolHandler for Fixed {
        async fn call(&self, _rcon: &dyn CommandExecutor, _args: serde_json::Value) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn def(name: &str) -> ToolDef {
        ToolDef {
            name: name.to_string(),
            description: String::new(),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        }
    }

    #[tokio::test]
    async fn test_lookup_and_order() {
        let mut registry = ToolRegistry::new();
        registry.register(def("b"), Fixed("bee"));
        registry.register(def("a"), Fixed("ay"));

        let names: Vec<_> = registry.definitions().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(registry.get("b").map(|d| d.name.as_str()), Some("b"));
        assert!(registry.get("c").is_none());

        let out = registry.call("a", &Echo, serde_json::Value::Null).await.unwrap();
        assert_eq!(out, "ay");
    }

    #[tokio::test]
    async fn test_reregistering_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(def("a"), Fixed("old"));
        registry.register(def("b"), Fixed("bee"));
        registry.register(def("a"), Fixed("new"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.definitions()[0].name, "a");
        let out = registry.call("a", &Echo, serde_json::Value::Null).await.unwrap();
        assert_eq!(out, "new");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());

        let err = registry
            .call("nope", &Echo, serde_json::Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::UnknownTool(name) if name == "nope"));
    }
}
