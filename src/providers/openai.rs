//! OpenAI Provider Implementation
//!
//! This module implements the `LLMProvider` trait for OpenAI-compatible Chat
//! Completions APIs, handling message conversion, tool calls, response parsing
//! and server-sent-event streaming.
//!
//! # Example
//!
//! ```rust,ignore
//! use chatline::providers::{openai::OpenAIProvider, ChatOptions, LLMProvider, StreamEvent};
//! use chatline::session::Message;
//!
//! async fn example() {
//!     let provider = OpenAIProvider::new("your-api-key");
//!     let messages = vec![
//!         Message::system("You are a helpful assistant."),
//!         Message::user("Hello!"),
//!     ];
//!
//!     let mut rx = provider
//!         .chat_stream(messages, vec![], None, ChatOptions::default())
//!         .await
//!         .unwrap();
//!     while let Some(StreamEvent::Delta(text)) = rx.recv().await {
//!         print!("{}", text);
//!     }
//! }
//! ```

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{ChatlineError, ProviderError, Result};
use crate::session::{Message, Role};

use super::{
    parse_provider_error, ChatOptions, LLMProvider, LLMResponse, LLMToolCall, StreamEvent,
    ToolDefinition, Usage,
};

/// The OpenAI API endpoint URL.
pub(crate) const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// The default OpenAI model to use.
const DEFAULT_MODEL: &str = "gpt-4o-mini";

// ============================================================================
// OpenAI API Request Types
// ============================================================================

/// OpenAI API request body.
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    /// Model identifier
    model: String,
    /// Conversation messages (including system)
    messages: Vec<OpenAIMessage>,
    /// Available tools
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    /// Temperature for sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Top-p (nucleus) sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    /// Ask for server-sent events instead of one JSON body
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// A message in OpenAI's format.
#[derive(Debug, Serialize)]
struct OpenAIMessage {
    /// Role: "system", "user", "assistant", or "tool"
    role: String,
    /// Message content (can be null for assistant with tool_calls)
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    /// Tool calls made by the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCallRequest>>,
    /// ID of the tool call this message is responding to
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

/// A tool call in a request (assistant requesting tool execution).
#[derive(Debug, Serialize)]
struct OpenAIToolCallRequest {
    id: String,
    /// Always "function"
    r#type: String,
    function: OpenAIFunctionCall,
}

/// Function call details.
#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    /// JSON-encoded arguments
    arguments: String,
}

/// OpenAI tool definition.
#[derive(Debug, Serialize)]
struct OpenAITool {
    /// Always "function"
    r#type: String,
    function: OpenAIFunctionDef,
}

/// OpenAI function definition.
#[derive(Debug, Serialize)]
struct OpenAIFunctionDef {
    name: String,
    description: String,
    /// JSON Schema for function parameters
    parameters: serde_json::Value,
}

// ============================================================================
// OpenAI API Response Types
// ============================================================================

/// OpenAI API response body.
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    /// Text content (may be null if tool_calls present)
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCallResponse>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCallResponse {
    id: String,
    function: OpenAIFunctionCall,
}

/// OpenAI token usage.
#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// OpenAI API error response.
#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

/// OpenAI API error details.
#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
    #[serde(default)]
    r#type: Option<String>,
}

// ============================================================================
// OpenAI Streaming Types
// ============================================================================

/// One `data:` payload of a streamed completion.
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

/// A fragment of a tool call; fragments sharing `index` belong together.
#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    #[serde(default)]
    index: u32,
    id: Option<String>,
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// What one chunk of bytes produced.
#[derive(Debug, Default, PartialEq)]
struct Fed {
    /// Text fragments in arrival order
    deltas: Vec<String>,
    /// The server signalled the end of the completion
    done: bool,
    /// The server sent an error payload mid-stream
    error: Option<String>,
}

/// Assembles a chat-completions SSE stream.
///
/// Bytes may split lines anywhere, so incomplete lines are buffered until the
/// next chunk arrives.
#[derive(Debug, Default)]
struct SseAccumulator {
    line_buffer: String,
    content: String,
    tool_calls: BTreeMap<u32, PartialToolCall>,
    usage: Option<Usage>,
    finished: bool,
}

impl SseAccumulator {
    fn feed(&mut self, chunk: &str) -> Fed {
        let mut fed = Fed::default();
        self.line_buffer.push_str(chunk);

        while let Some(newline_pos) = self.line_buffer.find('\n') {
            let line = self.line_buffer[..newline_pos].trim().to_string();
            self.line_buffer.drain(..=newline_pos);

            let data = if let Some(stripped) = line.strip_prefix("data: ") {
                stripped
            } else if let Some(stripped) = line.strip_prefix("data:") {
                stripped
            } else {
                continue;
            };

            if data == "[DONE]" {
                self.finished = true;
                fed.done = true;
                return fed;
            }

            if let Ok(err) = serde_json::from_str::<OpenAIErrorResponse>(data) {
                fed.error = Some(err.error.message);
                return fed;
            }

            let chunk: StreamChunk = match serde_json::from_str(data) {
                Ok(v) => v,
                Err(e) => {
                    debug!(error = %e, "Skipping undecodable stream line");
                    continue;
                }
            };

            if let Some(usage) = chunk.usage {
                self.usage = Some(Usage::new(usage.prompt_tokens, usage.completion_tokens));
            }

            for choice in chunk.choices {
                if let Some(text) = choice.delta.content {
                    if !text.is_empty() {
                        self.content.push_str(&text);
                        fed.deltas.push(text);
                    }
                }
                for tc in choice.delta.tool_calls.unwrap_or_default() {
                    let partial = self.tool_calls.entry(tc.index).or_default();
                    if let Some(id) = tc.id {
                        partial.id = id;
                    }
                    if let Some(function) = tc.function {
                        if let Some(name) = function.name {
                            partial.name.push_str(&name);
                        }
                        if let Some(args) = function.arguments {
                            partial.arguments.push_str(&args);
                        }
                    }
                }
                if choice.finish_reason.is_some() {
                    self.finished = true;
                }
            }
        }

        fed
    }

    /// Completed tool calls in index order. Calls without an id get a
    /// positional one so results can still be matched up.
    fn take_tool_calls(&mut self) -> Vec<LLMToolCall> {
        std::mem::take(&mut self.tool_calls)
            .into_iter()
            .filter(|(_, partial)| !partial.name.is_empty())
            .map(|(index, partial)| {
                let id = if partial.id.is_empty() {
                    format!("call_{}", index)
                } else {
                    partial.id
                };
                let args = if partial.arguments.trim().is_empty() {
                    "{}".to_string()
                } else {
                    partial.arguments
                };
                LLMToolCall::new(&id, &partial.name, &args)
            })
            .collect()
    }
}

/// Drain the longest valid UTF-8 prefix of `pending`, leaving a trailing
/// partial character for the next chunk.
fn take_utf8(pending: &mut Vec<u8>) -> String {
    let valid = match std::str::from_utf8(pending) {
        Ok(s) => s.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => pending.len(),
    };
    let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
    pending.drain(..valid);
    text
}

// ============================================================================
// OpenAI Provider
// ============================================================================

/// OpenAI LLM provider.
///
/// Works with any endpoint that speaks the Chat Completions protocol,
/// streaming or not.
pub struct OpenAIProvider {
    /// API key for authentication
    api_key: String,
    /// API base URL
    api_base: String,
    /// HTTP client for making requests
    client: Client,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with the given API key.
    ///
    /// # Example
    /// ```
    /// use chatline::providers::openai::OpenAIProvider;
    /// use chatline::providers::LLMProvider;
    ///
    /// let provider = OpenAIProvider::new("sk-xxx");
    /// assert_eq!(provider.name(), "openai");
    /// ```
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: OPENAI_API_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Create a new OpenAI provider with a custom base URL.
    ///
    /// Useful for OpenAI-compatible APIs (Azure, local models, etc.).
    /// A trailing slash is removed.
    pub fn with_base_url(api_key: &str, api_base: &str) -> Self {
        Self::with_client(api_key, api_base, Client::new())
    }

    /// Create a new OpenAI provider with a custom HTTP client
    /// (timeouts, proxies, test servers).
    pub fn with_client(api_key: &str, api_base: &str, client: Client) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn build_request(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        model: Option<&str>,
        options: ChatOptions,
        stream: bool,
    ) -> OpenAIRequest {
        OpenAIRequest {
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            messages: convert_messages(messages),
            tools: if tools.is_empty() {
                None
            } else {
                Some(convert_tools(tools))
            },
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            stream: stream.then_some(true),
        }
    }

    async fn send(&self, request: &OpenAIRequest) -> Result<reqwest::Response> {
        debug!(model = %request.model, stream = request.stream.is_some(), "OpenAI request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatlineError::from(ProviderError::Timeout(e.to_string()))
                } else {
                    ChatlineError::Provider(format!("OpenAI request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            let body = match serde_json::from_str::<OpenAIErrorResponse>(&error_text) {
                Ok(error_response) => format!(
                    "OpenAI API error: {} - {}",
                    error_response.error.r#type.unwrap_or_default(),
                    error_response.error.message
                ),
                Err(_) => format!("OpenAI API error: {}", error_text),
            };
            return Err(ChatlineError::from(parse_provider_error(status, &body)));
        }

        Ok(response)
    }
}

// ============================================================================
// Conversion Functions
// ============================================================================

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn to_request_call(call: crate::session::ToolCall) -> OpenAIToolCallRequest {
    OpenAIToolCallRequest {
        id: call.id,
        r#type: "function".to_string(),
        function: OpenAIFunctionCall {
            name: call.name,
            arguments: call.arguments,
        },
    }
}

/// Convert Chatline messages to OpenAI API format.
///
/// Stored history keeps tool results but not the assistant message that
/// requested them. A tool result whose call id was not announced by a
/// preceding assistant message gets one synthesized from its own metadata.
fn convert_messages(messages: Vec<Message>) -> Vec<OpenAIMessage> {
    let mut converted = Vec::with_capacity(messages.len());
    let mut announced: HashSet<String> = HashSet::new();

    for msg in messages {
        match msg.role {
            Role::Tool => {
                if let Some(call) = msg.tool_call {
                    let id = call.id.clone();
                    if !announced.contains(&id) {
                        converted.push(OpenAIMessage {
                            role: "assistant".to_string(),
                            content: None,
                            tool_calls: Some(vec![to_request_call(call)]),
                            tool_call_id: None,
                        });
                    }
                    converted.push(OpenAIMessage {
                        role: "tool".to_string(),
                        content: Some(msg.content),
                        tool_calls: None,
                        tool_call_id: Some(id),
                    });
                } else {
                    // No call metadata to pair with; keep the text as context.
                    converted.push(OpenAIMessage {
                        role: "user".to_string(),
                        content: Some(msg.content),
                        tool_calls: None,
                        tool_call_id: None,
                    });
                }
                continue;
            }
            _ => announced.clear(),
        }

        let tool_calls = msg.tool_calls.map(|tcs| {
            tcs.into_iter()
                .map(|tc| {
                    announced.insert(tc.id.clone());
                    to_request_call(tc)
                })
                .collect::<Vec<_>>()
        });

        converted.push(OpenAIMessage {
            role: role_name(msg.role).to_string(),
            content: if msg.content.is_empty() && tool_calls.is_some() {
                None
            } else {
                Some(msg.content)
            },
            tool_calls,
            tool_call_id: None,
        });
    }

    converted
}

/// Convert tool definitions to OpenAI API format.
fn convert_tools(tools: Vec<ToolDefinition>) -> Vec<OpenAITool> {
    tools
        .into_iter()
        .map(|t| OpenAITool {
            r#type: "function".to_string(),
            function: OpenAIFunctionDef {
                name: t.name,
                description: t.description,
                parameters: t.parameters,
            },
        })
        .collect()
}

/// Convert OpenAI API response to LLMResponse.
fn convert_response(response: OpenAIResponse) -> LLMResponse {
    let (content, tool_calls) = match response.choices.into_iter().next() {
        Some(c) => {
            let content = c.message.content.unwrap_or_default();
            let tool_calls = c
                .message
                .tool_calls
                .map(|tcs| {
                    tcs.into_iter()
                        .map(|tc| {
                            LLMToolCall::new(&tc.id, &tc.function.name, &tc.function.arguments)
                        })
                        .collect()
                })
                .unwrap_or_default();
            (content, tool_calls)
        }
        None => (String::new(), Vec::new()),
    };

    let mut llm_response = LLMResponse::with_tools(&content, tool_calls);
    if let Some(usage) = response.usage {
        llm_response =
            llm_response.with_usage(Usage::new(usage.prompt_tokens, usage.completion_tokens));
    }
    llm_response
}

// ============================================================================
// LLMProvider Implementation
// ============================================================================

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn chat(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        model: Option<&str>,
        options: ChatOptions,
    ) -> Result<LLMResponse> {
        let request = self.build_request(messages, tools, model, options, false);
        let response = self.send(&request).await?;

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            ChatlineError::Provider(format!("Failed to parse OpenAI response: {}", e))
        })?;

        info!("OpenAI response received");
        Ok(convert_response(openai_response))
    }

    async fn chat_stream(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        model: Option<&str>,
        options: ChatOptions,
    ) -> Result<mpsc::Receiver<StreamEvent>> {
        let request = self.build_request(messages, tools, model, options, true);
        let response = self.send(&request).await?;

        let (tx, rx) = mpsc::channel::<StreamEvent>(32);
        let byte_stream = response.bytes_stream();

        tokio::spawn(async move {
            let mut acc = SseAccumulator::default();
            let mut pending: Vec<u8> = Vec::new();
            tokio::pin!(byte_stream);

            loop {
                let chunk = tokio::select! {
                    // Receiver dropped: abandon the HTTP body right away.
                    _ = tx.closed() => {
                        debug!("Stream receiver dropped; abandoning completion");
                        return;
                    }
                    next = byte_stream.next() => next,
                };

                let bytes = match chunk {
                    Some(Ok(bytes)) => bytes,
                    Some(Err(e)) => {
                        let _ = tx
                            .send(StreamEvent::Error(ChatlineError::Provider(format!(
                                "Stream read error: {}",
                                e
                            ))))
                            .await;
                        return;
                    }
                    None => break,
                };

                pending.extend_from_slice(&bytes);
                let fed = acc.feed(&take_utf8(&mut pending));
                for text in fed.deltas {
                    if tx.send(StreamEvent::Delta(text)).await.is_err() {
                        return;
                    }
                }
                if let Some(message) = fed.error {
                    let _ = tx
                        .send(StreamEvent::Error(ChatlineError::Provider(format!(
                            "OpenAI stream error: {}",
                            message
                        ))))
                        .await;
                    return;
                }
                if fed.done {
                    break;
                }
            }

            if !acc.finished {
                warn!("OpenAI stream ended without a completion marker");
                let _ = tx
                    .send(StreamEvent::Error(ChatlineError::Provider(
                        "Stream ended before the completion finished".to_string(),
                    )))
                    .await;
                return;
            }

            let tool_calls = acc.take_tool_calls();
            if !tool_calls.is_empty() {
                let _ = tx.send(StreamEvent::ToolCalls(tool_calls)).await;
            }
            let _ = tx
                .send(StreamEvent::Done {
                    content: acc.content,
                    usage: acc.usage,
                })
                .await;
        });

        Ok(rx)
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ToolCall;

    #[test]
    fn test_openai_provider_creation() {
        let provider = OpenAIProvider::new("test-key");
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.default_model(), "gpt-4o-mini");
        assert_eq!(provider.api_base, "https://api.openai.com/v1");
    }

    #[test]
    fn test_openai_provider_with_base_url() {
        let provider = OpenAIProvider::with_base_url("test-key", "https://custom.api/v1/");
        assert_eq!(provider.api_base, "https://custom.api/v1");
    }

    #[test]
    fn test_convert_messages_simple() {
        let messages = vec![
            Message::system("You are helpful"),
            Message::user("Hello"),
            Message::assistant("Hi there!"),
        ];
        let converted = convert_messages(messages);

        assert_eq!(converted.len(), 3);
        assert_eq!(converted[0].role, "system");
        assert_eq!(converted[1].role, "user");
        assert_eq!(converted[1].content, Some("Hello".to_string()));
        assert_eq!(converted[2].role, "assistant");
    }

    #[test]
    fn test_convert_messages_with_announced_tool_calls() {
        let call = ToolCall::new("call_1", "getWeather", r#"{"city": "Oslo"}"#);
        let messages = vec![
            Message::assistant_with_tools("", vec![call.clone()]),
            Message::tool_result(call, "Sunny"),
        ];
        let converted = convert_messages(messages);

        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0].role, "assistant");
        assert!(converted[0].content.is_none());
        let tool_calls = converted[0].tool_calls.as_ref().unwrap();
        assert_eq!(tool_calls[0].id, "call_1");
        assert_eq!(tool_calls[0].r#type, "function");
        assert_eq!(converted[1].role, "tool");
        assert_eq!(converted[1].tool_call_id, Some("call_1".to_string()));
    }

    #[test]
    fn test_convert_messages_synthesizes_missing_tool_call() {
        let call = ToolCall::new("call_7", "getDatetime", "{}");
        let messages = vec![
            Message::user("What time is it?"),
            Message::tool_result(call, "The current date and time is 2024-05-01 10:00:00"),
            Message::assistant("It is 10 o'clock."),
        ];
        let converted = convert_messages(messages);

        assert_eq!(converted.len(), 4);
        assert_eq!(converted[1].role, "assistant");
        let synthesized = converted[1].tool_calls.as_ref().unwrap();
        assert_eq!(synthesized[0].id, "call_7");
        assert_eq!(synthesized[0].function.name, "getDatetime");
        assert_eq!(converted[2].role, "tool");
        assert_eq!(converted[2].tool_call_id, Some("call_7".to_string()));
        assert_eq!(converted[3].role, "assistant");
    }

    #[test]
    fn test_convert_messages_announcement_does_not_leak_past_user_turn() {
        let call = ToolCall::new("dup", "getDatetime", "{}");
        let messages = vec![
            Message::assistant_with_tools("", vec![call.clone()]),
            Message::tool_result(call.clone(), "first"),
            Message::user("again"),
            Message::tool_result(call, "second"),
        ];
        let converted = convert_messages(messages);
        // assistant, tool, user, synthesized assistant, tool
        assert_eq!(converted.len(), 5);
        assert!(converted[3].tool_calls.is_some());
    }

    #[test]
    fn test_convert_tools() {
        let tools = vec![ToolDefinition::new(
            "getWeather",
            "Current weather",
            serde_json::json!({"type": "object"}),
        )];
        let converted = convert_tools(tools);

        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].r#type, "function");
        assert_eq!(converted[0].function.name, "getWeather");
    }

    #[test]
    fn test_convert_response_with_tool_calls() {
        let response = OpenAIResponse {
            choices: vec![OpenAIChoice {
                message: OpenAIResponseMessage {
                    content: None,
                    tool_calls: Some(vec![OpenAIToolCallResponse {
                        id: "call_123".to_string(),
                        function: OpenAIFunctionCall {
                            name: "getWeather".to_string(),
                            arguments: r#"{"city":"Lima"}"#.to_string(),
                        },
                    }]),
                },
            }],
            usage: Some(OpenAIUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
            }),
        };
        let converted = convert_response(response);

        assert_eq!(converted.content, "");
        assert!(converted.has_tool_calls());
        assert_eq!(converted.tool_calls[0].id, "call_123");
        assert_eq!(converted.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_convert_response_empty_choices() {
        let converted = convert_response(OpenAIResponse {
            choices: vec![],
            usage: None,
        });
        assert_eq!(converted.content, "");
        assert!(!converted.has_tool_calls());
    }

    #[test]
    fn test_request_serialization_stream_flag() {
        let provider = OpenAIProvider::new("k");
        let request = provider.build_request(
            vec![Message::user("Hello")],
            vec![],
            None,
            ChatOptions::new().with_temperature(0.2),
            true,
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], true);
        assert_eq!(json["model"], "gpt-4o-mini");
        assert!(json.get("tools").is_none());
        assert!(json.get("top_p").is_none());

        let request = provider.build_request(vec![], vec![], Some("m"), ChatOptions::new(), false);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("stream").is_none());
        assert_eq!(json["model"], "m");
    }

    #[test]
    fn test_sse_accumulator_text_deltas() {
        let mut acc = SseAccumulator::default();
        let fed = acc.feed(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
             data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        );
        assert_eq!(fed.deltas, vec!["Hel", "lo"]);
        assert!(!fed.done);

        let fed = acc.feed("data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\ndata: [DONE]\n\n");
        assert!(fed.done);
        assert!(acc.finished);
        assert_eq!(acc.content, "Hello");
    }

    #[test]
    fn test_sse_accumulator_handles_split_lines() {
        let mut acc = SseAccumulator::default();
        let fed = acc.feed("data: {\"choices\":[{\"delta\":{\"con");
        assert!(fed.deltas.is_empty());
        let fed = acc.feed("tent\":\"abc\"}}]}\n");
        assert_eq!(fed.deltas, vec!["abc"]);
    }

    #[test]
    fn test_sse_accumulator_assembles_tool_calls_by_index() {
        let mut acc = SseAccumulator::default();
        acc.feed(concat!(
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_a\",\"function\":{\"name\":\"getWeather\",\"arguments\":\"{\\\"ci\"}}]}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":1,\"id\":\"call_b\",\"function\":{\"name\":\"getDatetime\",\"arguments\":\"\"}}]}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"ty\\\":\\\"Oslo\\\"}\"}}]}}]}\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n",
        ));
        assert!(acc.finished);

        let calls = acc.take_tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].arguments, r#"{"city":"Oslo"}"#);
        assert_eq!(calls[1].name, "getDatetime");
        assert_eq!(calls[1].arguments, "{}");
    }

    #[test]
    fn test_take_utf8_keeps_split_character() {
        let bytes = "héllo".as_bytes();
        let mut pending = bytes[..2].to_vec();
        assert_eq!(take_utf8(&mut pending), "h");
        assert_eq!(pending.len(), 1);
        pending.extend_from_slice(&bytes[2..]);
        assert_eq!(take_utf8(&mut pending), "éllo");
        assert!(pending.is_empty());
    }

    #[test]
    fn test_sse_accumulator_reports_error_payload() {
        let mut acc = SseAccumulator::default();
        let fed = acc.feed("data: {\"error\":{\"message\":\"overloaded\",\"type\":\"server_error\"}}\n");
        assert_eq!(fed.error.as_deref(), Some("overloaded"));
    }

    #[test]
    fn test_sse_accumulator_ignores_comments_and_usage_only_chunks() {
        let mut acc = SseAccumulator::default();
        let fed = acc.feed(
            ": keep-alive\n\
             data: {\"choices\":[],\"usage\":{\"prompt_tokens\":3,\"completion_tokens\":4}}\n",
        );
        assert!(fed.deltas.is_empty());
        assert_eq!(acc.usage.as_ref().map(|u| u.total_tokens), Some(7));
    }
}
