//! Tool registry: metadata plus the handler behind each tool name.
//!
//! Input schemas are generated from the argument structs with `schemars`, so
//! the advertised schema and the decoder can't drift apart.

use async_trait::async_trait;
use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::middleware::ToolCallContext;
use crate::types::{Error, Result};

// =============================================================================
// Handlers
// =============================================================================

/// The tool's own logic, run at the bottom of the middleware chain.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, ctx: &ToolCallContext) -> Result<Value>;
}

type ToolFn = dyn Fn(&ToolCallContext) -> BoxFuture<'static, Result<Value>> + Send + Sync;

/// Handler backed by a closure returning a boxed future.
pub struct FnTool {
    f: Box<ToolFn>,
}

impl FnTool {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ToolCallContext) -> BoxFuture<'static, Result<Value>> + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }
}

impl fmt::Debug for FnTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool").finish_non_exhaustive()
    }
}

#[async_trait]
impl ToolHandler for FnTool {
    async fn call(&self, ctx: &ToolCallContext) -> Result<Value> {
        (self.f)(ctx).await
    }
}

// =============================================================================
// Tool entry
// =============================================================================

/// Tool metadata as advertised by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolEntry {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolEntry {
    /// Build an entry whose input schema is derived from `A`.
    pub fn for_args<A: JsonSchema>(name: impl Into<String>, description: impl Into<String>) -> Result<Self> {
        let schema = schemars::schema_for!(A);
        let mut input_schema = serde_json::to_value(schema)?;
        if let Some(map) = input_schema.as_object_mut() {
            map.remove("$schema");
            map.remove("title");
        }
        Ok(Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        })
    }
}

// =============================================================================
// Registry
// =============================================================================

struct RegisteredTool {
    entry: ToolEntry,
    handler: Arc<dyn ToolHandler>,
}

/// In-memory tool registry.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Names must be non-empty and unique.
    pub fn register(&mut self, entry: ToolEntry, handler: Arc<dyn ToolHandler>) -> Result<()> {
        if entry.name.is_empty() {
            return Err(Error::validation("Tool name cannot be empty"));
        }
        if self.tools.contains_key(&entry.name) {
            return Err(Error::validation(format!(
                "Tool already registered: {}",
                entry.name
            )));
        }
        tracing::debug!(tool = %entry.name, "registered tool");
        self.tools
            .insert(entry.name.clone(), RegisteredTool { entry, handler });
        Ok(())
    }

    /// Get a tool's metadata by name.
    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.tools.get(name).map(|t| &t.entry)
    }

    /// Get a tool's handler by name.
    pub fn handler(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).map(|t| t.handler.clone())
    }

    /// Check if a tool exists.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// List all tool entries, sorted by name.
    pub fn list_entries(&self) -> Vec<&ToolEntry> {
        let mut entries: Vec<&ToolEntry> = self.tools.values().map(|t| &t.entry).collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct EchoArgs {
        /// Text to echo back
        text: String,
        times: Option<u32>,
    }

    fn echo_tool() -> Arc<dyn ToolHandler> {
        Arc::new(FnTool::new(|ctx| {
            let args = ctx.arguments().clone();
            async move { Ok::<_, Error>(args) }.boxed()
        }))
    }

    fn entry(name: &str) -> ToolEntry {
        ToolEntry::for_args::<EchoArgs>(name, "Echo the input").unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register(entry("echo"), echo_tool()).unwrap();

        assert!(registry.has_tool("echo"));
        assert!(!registry.has_tool("search_web"));
        assert_eq!(registry.get("echo").unwrap().description, "Echo the input");
        assert!(registry.handler("echo").is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = ToolRegistry::new();
        let err = registry.register(entry(""), echo_tool()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(entry("echo"), echo_tool()).unwrap();
        let err = registry.register(entry("echo"), echo_tool()).unwrap_err();
        assert_eq!(err.to_string(), "validation error: Tool already registered: echo");
    }

    #[test]
    fn test_list_entries_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(entry("b_tool"), echo_tool()).unwrap();
        registry.register(entry("a_tool"), echo_tool()).unwrap();

        let names: Vec<&str> = registry
            .list_entries()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["a_tool", "b_tool"]);
        assert_eq!(registry.names(), vec!["a_tool", "b_tool"]);
    }

    #[test]
    fn test_schema_generated_from_args() {
        let schema = &entry("echo").input_schema;
        assert_eq!(schema["type"], json!("object"));
        assert_eq!(schema["required"], json!(["text"]));
        assert_eq!(schema["properties"]["text"]["description"], json!("Text to echo back"));
        assert!(schema.get("$schema").is_none());
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let value = serde_json::to_value(entry("echo")).unwrap();
        assert!(value.get("inputSchema").is_some());
        assert!(value.get("input_schema").is_none());
    }

    #[tokio::test]
    async fn test_fn_tool_sees_arguments() {
        let ctx = ToolCallContext::new("echo", json!({"text": "hi"}));
        let value = echo_tool().call(&ctx).await.unwrap();
        assert_eq!(value, json!({"text": "hi"}));
    }
}
