//! Tool registry for Chatline
//!
//! This module provides the `ToolRegistry` struct for registering and invoking
//! tools. The registry is built once at startup and shared read-only.

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::{ChatlineError, ToolError};
use crate::providers::{LLMToolCall, ToolDefinition};

use super::{Tool, ToolArguments, ToolDescriptor};

/// Result of dispatching a model-issued tool call.
///
/// Failures are already rendered as text so the turn can continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Text handed back to the model as the tool result
    pub content: String,
    pub is_error: bool,
}

/// A registry that holds and invokes tools.
///
/// # Example
///
/// ```rust
/// use chatline::tools::{ToolRegistry, DatetimeTool};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let mut registry = ToolRegistry::new();
/// registry.register(Box::new(DatetimeTool)).unwrap();
///
/// assert!(registry.has("getDatetime"));
/// let result = registry.invoke("getDatetime", &json!({})).await.unwrap();
/// assert!(result.starts_with("The current date and time is"));
/// # });
/// ```
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. Names are unique; a second registration under the
    /// same name fails and leaves the first in place.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            warn!(tool = %name, "Rejected duplicate tool registration");
            return Err(ToolError::Duplicate(name));
        }
        info!(tool = %name, "Registering tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&i| self.tools[i].as_ref())
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    /// Tool catalog for LLM providers, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| t.descriptor().to_definition())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name.
    ///
    /// Resolves the arguments, checks that every required parameter is
    /// present, then runs the handler. Handler failures come back as
    /// `ToolError::Execution` unless the handler raised a more specific
    /// `ToolError` itself.
    pub async fn invoke(&self, name: &str, args: &Value) -> Result<String, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::Unknown(name.to_string()))?;

        let args = ToolArguments::from_json(name, args)?;
        for param in tool.parameters().iter().filter(|p| p.required) {
            args.require(&param.name)?;
        }

        let start = Instant::now();
        match tool.execute(&args).await {
            Ok(output) => {
                info!(
                    tool = name,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool executed successfully"
                );
                Ok(output)
            }
            Err(e) => {
                error!(
                    tool = name,
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool execution failed"
                );
                Err(match e {
                    ChatlineError::Tool(tool_error) => tool_error,
                    other => ToolError::execution(name, other.to_string()),
                })
            }
        }
    }

    /// Run a model-issued tool call, converting any failure into
    /// `Error: ...` text for the model.
    pub async fn dispatch(&self, call: &LLMToolCall) -> ToolOutcome {
        let raw = if call.arguments.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str::<Value>(&call.arguments) {
                Ok(v) => v,
                Err(e) => {
                    let err = ToolError::InvalidArgument {
                        tool: call.name.clone(),
                        message: format!("arguments are not valid JSON: {}", e),
                    };
                    warn!(tool = %call.name, error = %err, "Tool call rejected");
                    return ToolOutcome {
                        content: format!("Error: {}", err),
                        is_error: true,
                    };
                }
            }
        };

        match self.invoke(&call.name, &raw).await {
            Ok(content) => ToolOutcome {
                content,
                is_error: false,
            },
            Err(e) => {
                if matches!(e, ToolError::Unknown(_)) {
                    warn!(tool = %call.name, "Model requested an unregistered tool");
                }
                ToolOutcome {
                    content: format!("Error: {}", e),
                    is_error: true,
                }
            }
        }
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
    use crate::tools::ParameterSpec;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes the message back"
        }

        fn parameters(&self) -> Vec<ParameterSpec> {
            vec![
                ParameterSpec::required("message", "Text to echo"),
                ParameterSpec::optional("suffix", "Appended text"),
            ]
        }

        async fn execute(&self, args: &ToolArguments) -> crate::error::Result<String> {
            let message = args.require("message")?;
            Ok(format!("{}{}", message, args.get("suffix").unwrap_or("")))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "fail"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters(&self) -> Vec<ParameterSpec> {
            vec![]
        }

        async fn execute(&self, _args: &ToolArguments) -> crate::error::Result<String> {
            Err(ChatlineError::Provider("upstream down".into()))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        registry.register(Box::new(FailingTool)).unwrap();
        registry
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = registry();
        let err = registry.register(Box::new(EchoTool)).unwrap_err();
        assert_eq!(err, ToolError::Duplicate("echo".into()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_names_and_definitions_keep_registration_order() {
        let registry = registry();
        assert_eq!(registry.names(), vec!["echo", "fail"]);
        let defs = registry.definitions();
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[0].parameters["required"], json!(["message"]));
        assert_eq!(registry.descriptors()[1].name, "fail");
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let result = registry()
            .invoke("echo", &json!({"message": "hi", "suffix": "!"}))
            .await
            .unwrap();
        assert_eq!(result, "hi!");
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let err = registry()
            .invoke("unknown-tool", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::Unknown("unknown-tool".into()));
    }

    #[tokio::test]
    async fn test_invoke_missing_required_argument() {
        let err = registry()
            .invoke("echo", &json!({"suffix": "?"}))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ToolError::MissingArgument {
                tool: "echo".into(),
                parameter: "message".into()
            }
        );
    }

    #[tokio::test]
    async fn test_invoke_wraps_handler_failure() {
        let err = registry().invoke("fail", &json!({})).await.unwrap_err();
        match err {
            ToolError::Execution { tool, message } => {
                assert_eq!(tool, "fail");
                assert!(message.contains("upstream down"));
            }
            other => panic!("expected Execution, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_converts_errors_to_text() {
        let registry = registry();

        let ok = registry
            .dispatch(&LLMToolCall::new("1", "echo", r#"{"message":"yo"}"#))
            .await;
        assert_eq!(ok.content, "yo");
        assert!(!ok.is_error);

        let unknown = registry.dispatch(&LLMToolCall::new("2", "nope", "{}")).await;
        assert!(unknown.is_error);
        assert_eq!(unknown.content, "Error: Tool not found: nope");

        let bad_json = registry
            .dispatch(&LLMToolCall::new("3", "echo", "{not json"))
            .await;
        assert!(bad_json.is_error);
        assert!(bad_json.content.starts_with("Error: Invalid arguments"));

        let failed = registry.dispatch(&LLMToolCall::new("4", "fail", "")).await;
        assert!(failed.is_error);
        assert!(failed.content.starts_with("Error: Tool 'fail' failed"));
    }
}
