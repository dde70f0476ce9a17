//! Session types for Chatline
//!
//! This module defines the message types stored in conversation memory:
//! messages, roles, and the tool-call metadata attached to them.

use serde::{Deserialize, Serialize};

/// A single message in a conversation.
///
/// Messages are immutable once created; memory hands out clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender
    pub role: Role,
    /// The text content of the message
    pub content: String,
    /// Tool calls requested by the assistant (only on in-flight transcripts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// The call a tool result answers: id, tool name and arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
}

impl Message {
    /// Create a new user message.
    ///
    /// # Example
    /// ```
    /// use chatline::session::{Message, Role};
    ///
    /// let msg = Message::user("What's the weather in Oslo?");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: &str) -> Self {
        Self::plain(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: &str) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Create a new system message.
    ///
    /// System messages are injected per request and never stored.
    pub fn system(content: &str) -> Self {
        Self::plain(Role::System, content)
    }

    /// Create a tool result message answering `call`.
    ///
    /// # Example
    /// ```
    /// use chatline::session::{Message, Role, ToolCall};
    ///
    /// let call = ToolCall::new("call_1", "getWeather", r#"{"city":"Oslo"}"#);
    /// let msg = Message::tool_result(call, "Clear sky");
    /// assert_eq!(msg.role, Role::Tool);
    /// assert_eq!(msg.tool_call_id(), Some("call_1"));
    /// ```
    pub fn tool_result(call: ToolCall, content: &str) -> Self {
        Self {
            role: Role::Tool,
            content: content.to_string(),
            tool_calls: None,
            tool_call: Some(call),
        }
    }

    /// Create an assistant message that requests tool calls.
    pub fn assistant_with_tools(content: &str, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
            tool_calls: Some(tool_calls),
            tool_call: None,
        }
    }

    fn plain(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            tool_calls: None,
            tool_call: None,
        }
    }

    /// Check if this message has tool calls.
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls
            .as_ref()
            .map(|tc| !tc.is_empty())
            .unwrap_or(false)
    }

    /// Check if this is a tool result message.
    pub fn is_tool_result(&self) -> bool {
        self.role == Role::Tool && self.tool_call.is_some()
    }

    /// ID of the call this tool result answers.
    pub fn tool_call_id(&self) -> Option<&str> {
        self.tool_call.as_ref().map(|c| c.id.as_str())
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompts and instructions
    System,
    /// Messages from the user
    User,
    /// Messages from the AI assistant
    Assistant,
    /// Results from tool executions
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A tool call made by the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Name of the tool to call
    pub name: String,
    /// JSON-encoded arguments for the tool
    pub arguments: String,
}

impl ToolCall {
    /// Create a new tool call.
    pub fn new(id: &str, name: &str, arguments: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::user("hi").role, Role::User);
        assert_eq!(Message::assistant("hi").role, Role::Assistant);
        assert_eq!(Message::system("be brief").role, Role::System);
        assert!(!Message::user("hi").has_tool_calls());
    }

    #[test]
    fn test_tool_result_carries_call_metadata() {
        let call = ToolCall::new("call_9", "getDatetime", "{}");
        let msg = Message::tool_result(call.clone(), "2024-01-01 00:00:00");
        assert!(msg.is_tool_result());
        assert_eq!(msg.tool_call.as_ref(), Some(&call));
        assert_eq!(msg.tool_call_id(), Some("call_9"));
    }

    #[test]
    fn test_assistant_with_tools() {
        let msg = Message::assistant_with_tools(
            "",
            vec![ToolCall::new("call_1", "getWeather", r#"{"city":"Lima"}"#)],
        );
        assert!(msg.has_tool_calls());
        assert!(!msg.is_tool_result());
    }

    #[test]
    fn test_role_display_and_serde() {
        assert_eq!(Role::Tool.to_string(), "tool");
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn test_message_serialization_skips_empty_metadata() {
        let json = serde_json::to_value(Message::user("hello")).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("tool_calls").is_none());
        assert!(json.get("tool_call").is_none());
    }
}
