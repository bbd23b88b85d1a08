//! Tool registry
//!
//! Maps tool names (and aliases) to [`Tool`] implementations, validates
//! calls against their definitions and produces the JSON Schema list handed
//! to the provider.

use crate::ports::tool::{Tool, ToolContext};
use conductor_domain::{
    DefaultToolValidator, ToolCall, ToolDefinition, ToolError, ToolResult, ToolSpec, ToolValidator,
};
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Aliases models commonly use for the built-in tools.
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("bash", "run_command"),
    ("shell", "run_command"),
    ("sh", "run_command"),
    ("exec", "run_command"),
    ("cat", "read_file"),
    ("view", "read_file"),
    ("open", "read_file"),
    ("edit", "write_file"),
    ("create_file", "write_file"),
    ("ls", "list_dir"),
    ("list_files", "list_dir"),
    ("rm", "delete_file"),
    ("grep", "grep_search"),
    ("rg", "grep_search"),
    ("search", "grep_search"),
    ("glob", "glob_search"),
    ("find", "glob_search"),
    ("find_files", "glob_search"),
    ("status", "git_status"),
    ("diff", "git_diff"),
];

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    spec: ToolSpec,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its definition's name.
    pub fn register(mut self, tool: Arc<dyn Tool>) -> Self {
        self.insert(tool);
        self
    }

    pub fn insert(&mut self, tool: Arc<dyn Tool>) {
        let definition = tool.definition().clone();
        self.tools.insert(definition.name.clone(), tool);
        self.spec.insert(definition);
    }

    pub fn register_alias(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.spec = self.spec.register_alias(alias, canonical);
        self
    }

    /// Register [`DEFAULT_ALIASES`].
    pub fn with_default_aliases(mut self) -> Self {
        self.spec = self.spec.register_aliases(DEFAULT_ALIASES.iter().copied());
        self
    }

    pub fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    pub fn names(&self) -> Vec<&str> {
        self.spec.names()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Canonical name for `name`, following aliases.
    pub fn resolve<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        self.spec.resolve(name)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.resolve(name).and_then(|canonical| self.tools.get(canonical))
    }

    pub fn definition(&self, name: &str) -> Option<&ToolDefinition> {
        self.spec.get_resolved(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registry restricted to `names`; aliases pointing at removed tools
    /// are dropped with them.
    pub fn subset(&self, names: &[&str]) -> ToolRegistry {
        let spec = self.spec.retain(names);
        let tools = self
            .tools
            .iter()
            .filter(|(name, _)| spec.get(name).is_some())
            .map(|(name, tool)| (name.clone(), tool.clone()))
            .collect();
        ToolRegistry { tools, spec }
    }

    /// Provider-neutral JSON Schema for every tool, sorted by name.
    pub fn schemas(&self) -> Vec<serde_json::Value> {
        let mut definitions: Vec<&ToolDefinition> = self.spec.all().collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions.into_iter().map(tool_schema).collect()
    }

    /// Execute a call.
    ///
    /// Unknown names yield a `NOT_FOUND` failure, invalid arguments an
    /// `INVALID_ARGUMENT` failure, and a panicking tool an
    /// `EXECUTION_FAILED` failure. The returned result carries the canonical
    /// tool name and the elapsed time.
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let Some(canonical) = self.resolve(&call.tool_name) else {
            debug!(tool = %call.tool_name, "Unknown tool requested");
            return ToolResult::failure(&call.tool_name, ToolError::tool_not_found(&call.tool_name));
        };
        let (Some(tool), Some(definition)) = (self.tools.get(canonical), self.spec.get(canonical)) else {
            return ToolResult::failure(&call.tool_name, ToolError::tool_not_found(&call.tool_name));
        };

        if let Err(message) = DefaultToolValidator.validate(call, definition) {
            return ToolResult::failure(canonical, ToolError::invalid_argument(message));
        }

        let call = if canonical != call.tool_name {
            let mut resolved = call.clone();
            resolved.tool_name = canonical.to_string();
            std::borrow::Cow::Owned(resolved)
        } else {
            std::borrow::Cow::Borrowed(call)
        };

        let started = Instant::now();
        let outcome = AssertUnwindSafe(tool.execute(&call, ctx)).catch_unwind().await;
        let elapsed = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(mut result) => {
                if result.metadata.duration_ms.is_none() {
                    result.metadata.duration_ms = Some(elapsed);
                }
                result
            }
            Err(_) => {
                warn!(tool = canonical, "Tool panicked during execution");
                ToolResult::failure(
                    canonical,
                    ToolError::execution_failed(format!("Tool '{}' panicked", canonical)),
                )
                .with_duration(elapsed)
            }
        }
    }
}

/// JSON Schema for a single definition.
///
/// `path` parameters map to `string`; unrecognised type hints fall back to
/// `string`.
pub fn tool_schema(definition: &ToolDefinition) -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();

    for param in &definition.parameters {
        let schema_type = match param.param_type.as_str() {
            "string" | "path" => "string",
            "number" => "number",
            "integer" => "integer",
            "boolean" => "boolean",
            "array" => "array",
            "object" => "object",
            _ => "string",
        };

        let mut prop = serde_json::Map::new();
        prop.insert("type".to_string(), serde_json::json!(schema_type));
        prop.insert(
            "description".to_string(),
            serde_json::json!(param.description),
        );
        properties.insert(param.name.clone(), serde_json::Value::Object(prop));

        if param.required {
            required.push(serde_json::json!(param.name));
        }
    }

    serde_json::json!({
        "name": definition.name,
        "description": definition.description,
        "input_schema": {
            "type": "object",
            "properties": properties,
            "required": required,
        }
    })
}
