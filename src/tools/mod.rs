pub mod document;
pub mod sql;
pub mod web_search;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub use document::DocumentQueryTool;
pub use sql::SqlQueryTool;
pub use web_search::WebSearchTool;

/// A callable tool the router workflow and the MCP server can both expose.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema for the tool's arguments.
    fn parameters(&self) -> Value;

    async fn call(&self, args: Value) -> Result<String>;
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// One line per tool, rendered into the router system prompt.
    pub fn catalog(&self) -> String {
        let mut desc = String::new();
        for name in self.list_names() {
            if let Some(tool) = self.tools.get(&name) {
                desc.push_str(&format!("- {}: {}\n", name, tool.description()));
            }
        }
        desc
    }
}

/// Standard schema for tools that take a single query string.
pub fn query_schema(description: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": description
            }
        },
        "required": ["query"]
    })
}

/// Pull the `query` argument out of a tool call's args.
pub fn query_arg(args: &Value) -> Option<String> {
    args.get("query")
        .and_then(|q| q.as_str())
        .map(|q| q.to_string())
        .filter(|q| !q.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the query back."
        }

        fn parameters(&self) -> Value {
            query_schema("Text to echo")
        }

        async fn call(&self, args: Value) -> Result<String> {
            Ok(query_arg(&args).unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn registry_round_trip() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        assert_eq!(registry.list_names(), vec!["echo"]);
        assert!(registry.catalog().contains("echo: Echo the query back."));

        let tool = registry.get("echo").unwrap();
        let out = tool
            .call(serde_json::json!({"query": "hello"}))
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn query_arg_rejects_blank_and_missing() {
        assert!(query_arg(&serde_json::json!({})).is_none());
        assert!(query_arg(&serde_json::json!({"query": "  "})).is_none());
        assert_eq!(
            query_arg(&serde_json::json!({"query": "q"})),
            Some("q".to_string())
        );
    }
}
