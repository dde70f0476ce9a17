//! Tool types for Chatline
//!
//! This module defines the `Tool` trait every built-in tool implements, the
//! parameter contract tools advertise to the model, and the resolved
//! arguments handed to a tool for one invocation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{Result, ToolError};
use crate::providers::ToolDefinition;

/// One named parameter a tool accepts.
///
/// Every parameter is passed to the tool as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSpec {
    pub name: String,
    /// Shown to the model; usually includes an example value
    pub description: String,
    pub required: bool,
}

impl ParameterSpec {
    /// A parameter the model must always supply.
    pub fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
        }
    }

    /// A parameter the model may omit.
    pub fn optional(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: false,
        }
    }
}

/// Immutable description of a registered tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// Parameters in declaration order
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDescriptor {
    /// JSON Schema object for the parameters, as sent to the model.
    ///
    /// # Example
    /// ```
    /// use chatline::tools::{ParameterSpec, ToolDescriptor};
    ///
    /// let descriptor = ToolDescriptor {
    ///     name: "getWeather".into(),
    ///     description: "Current weather for a city".into(),
    ///     parameters: vec![ParameterSpec::required("city", "City name, e.g. Oslo")],
    /// };
    /// let schema = descriptor.schema();
    /// assert_eq!(schema["required"][0], "city");
    /// ```
    pub fn schema(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.parameters {
            properties.insert(
                p.name.clone(),
                json!({ "type": "string", "description": p.description }),
            );
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Convert into the provider-facing tool definition.
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::new(&self.name, &self.description, self.schema())
    }
}

/// Resolved arguments for one tool invocation: parameter name to string value.
///
/// Scalars are coerced to their string form; `null` counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolArguments {
    tool: String,
    values: BTreeMap<String, String>,
}

impl ToolArguments {
    /// Resolve raw model arguments for `tool`.
    ///
    /// Accepts a JSON object, or a JSON string containing an object (some
    /// models double-encode). Nested arrays and objects are rejected.
    pub fn from_json(tool: &str, raw: &Value) -> std::result::Result<Self, ToolError> {
        let invalid = |message: String| ToolError::InvalidArgument {
            tool: tool.to_string(),
            message,
        };

        let decoded;
        let object = match raw {
            Value::Null => {
                return Ok(Self {
                    tool: tool.to_string(),
                    values: BTreeMap::new(),
                })
            }
            Value::Object(map) => map,
            Value::String(s) if s.trim().is_empty() => {
                return Ok(Self {
                    tool: tool.to_string(),
                    values: BTreeMap::new(),
                })
            }
            Value::String(s) => {
                decoded = serde_json::from_str::<Value>(s)
                    .map_err(|e| invalid(format!("arguments are not valid JSON: {}", e)))?;
                decoded
                    .as_object()
                    .ok_or_else(|| invalid("arguments must be a JSON object".to_string()))?
            }
            _ => return Err(invalid("arguments must be a JSON object".to_string())),
        };

        let mut values = BTreeMap::new();
        for (key, value) in object {
            let text = match value {
                Value::Null => continue,
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(invalid(format!("parameter '{}' must be a scalar", key)))
                }
            };
            values.insert(key.clone(), text);
        }

        Ok(Self {
            tool: tool.to_string(),
            values,
        })
    }

    /// Build arguments directly from pairs.
    pub fn from_pairs(tool: &str, pairs: &[(&str, &str)]) -> Self {
        Self {
            tool: tool.to_string(),
            values: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Value of `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Value of `name`, or a `MissingArgument` error naming it.
    pub fn require(&self, name: &str) -> std::result::Result<&str, ToolError> {
        self.get(name).ok_or_else(|| ToolError::MissingArgument {
            tool: self.tool.clone(),
            parameter: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The trait that all tools must implement.
///
/// Tools are stateless with respect to the conversation: they may do I/O but
/// never touch conversation memory.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use chatline::tools::{ParameterSpec, Tool, ToolArguments};
/// use chatline::error::Result;
///
/// struct EchoTool;
///
/// #[async_trait]
/// impl Tool for EchoTool {
///     fn name(&self) -> &str { "echo" }
///     fn description(&self) -> &str { "Echoes the message back" }
///     fn parameters(&self) -> Vec<ParameterSpec> {
///         vec![ParameterSpec::required("message", "Text to echo")]
///     }
///     async fn execute(&self, args: &ToolArguments) -> Result<String> {
///         Ok(args.require("message")?.to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to call this tool.
    fn name(&self) -> &str;

    /// Human-readable description for the model's tool selection.
    fn description(&self) -> &str;

    /// Parameter contract, in declaration order.
    fn parameters(&self) -> Vec<ParameterSpec>;

    /// Run the tool. Required parameters are already validated.
    async fn execute(&self, args: &ToolArguments) -> Result<String>;

    /// Snapshot of this tool's descriptor.
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}
