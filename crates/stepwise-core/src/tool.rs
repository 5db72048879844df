//! Tool System
//!
//! Extensible tool framework for agent capabilities. Tools take a
//! positional JSON argument list and return text; the registry validates
//! schemas at registration time and arity at call time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::step::ToolCall;

/// Positional parameter definition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

/// Tool definition shown to the model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// Ordered parameter definitions; call arguments match this order
    pub parameters: Vec<ParameterSchema>,
}

impl ToolSchema {
    /// Render as a one-line signature, e.g.
    /// `get_weather(location: string): Returns the weather for a location.`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                if p.required {
                    format!("{}: {}", p.name, p.param_type)
                } else {
                    format!("{}?: {}", p.name, p.param_type)
                }
            })
            .collect();
        format!("{}({}): {}", self.name, params.join(", "), self.description)
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with positional arguments.
    ///
    /// The returned string is surfaced to the model verbatim as an
    /// observation; errors are surfaced as `Error: <message>`.
    async fn invoke(&self, args: &[serde_json::Value]) -> Result<String>;
}

/// Registry for available tools.
///
/// Populated at startup and fixed afterwards; the driver only reads it.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a new tool, validating its schema.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_boxed(Arc::new(tool))
    }

    /// Register a shared tool, validating its schema.
    pub fn register_boxed(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let schema = tool.schema();
        Self::validate_schema(&schema)?;
        if self.tools.contains_key(&schema.name) {
            return Err(AgentError::Config(format!(
                "duplicate tool name: {}",
                schema.name
            )));
        }
        self.tools.insert(schema.name, tool);
        Ok(())
    }

    fn validate_schema(schema: &ToolSchema) -> Result<()> {
        if schema.name.trim().is_empty() {
            return Err(AgentError::Config("tool name must not be empty".into()));
        }
        let mut seen = std::collections::HashSet::new();
        let mut optional_seen = false;
        for param in &schema.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(AgentError::Config(format!(
                    "tool {}: duplicate parameter {}",
                    schema.name, param.name
                )));
            }
            // Positional calling: a required parameter after an optional one
            // would be unreachable.
            if param.required && optional_seen {
                return Err(AgentError::Config(format!(
                    "tool {}: required parameter {} follows an optional one",
                    schema.name, param.name
                )));
            }
            optional_seen |= !param.required;
        }
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Execute a tool call: resolve, check arity, invoke.
    pub async fn invoke(&self, call: &ToolCall) -> Result<String> {
        let tool = self
            .get(&call.tool)
            .ok_or_else(|| AgentError::ToolNotFound(call.tool.clone()))?;

        let schema = tool.schema();
        let required = schema.parameters.iter().filter(|p| p.required).count();
        if call.args.len() < required || call.args.len() > schema.parameters.len() {
            return Err(AgentError::ToolValidation(format!(
                "{} expects {}..={} arguments, got {}",
                schema.name,
                required,
                schema.parameters.len(),
                call.args.len()
            )));
        }

        tool.invoke(&call.args).await
    }

    /// Get all tool schemas, sorted by name
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Generate the system prompt section listing available tools
    pub fn prompt_section(&self) -> String {
        let mut prompt = String::from("Available tools:\n");
        for schema in self.schemas() {
            prompt.push_str(&format!("- {}\n", schema.signature()));
        }
        prompt
    }
}
