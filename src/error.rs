//! Error types for Chatline
//!
//! This module defines the error types used throughout the crate.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.

use std::fmt;
use thiserror::Error;

// ============================================================================
// Provider Error Classification
// ============================================================================

/// Structured provider error classification.
///
/// Provides fine-grained categorization of LLM provider HTTP errors so that
/// callers can tell a bad key from a transient outage without string matching.
#[derive(Debug)]
pub enum ProviderError {
    /// 401 - Invalid API key or authentication failure
    Auth(String),
    /// 429 - Rate limit or quota exceeded
    RateLimit(String),
    /// 402 - Payment required or billing issue
    Billing(String),
    /// 500/502/503/504 - Server-side errors
    ServerError(String),
    /// 400 - Bad request, invalid JSON, malformed parameters
    InvalidRequest(String),
    /// 404 - Model not found or endpoint not available
    ModelNotFound(String),
    /// Connection or read timeout
    Timeout(String),
    /// Catch-all for unrecognized errors
    Unknown(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Auth(msg) => write!(f, "Authentication error: {}", msg),
            ProviderError::RateLimit(msg) => write!(f, "Rate limit error: {}", msg),
            ProviderError::Billing(msg) => write!(f, "Billing error: {}", msg),
            ProviderError::ServerError(msg) => write!(f, "Server error: {}", msg),
            ProviderError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ProviderError::ModelNotFound(msg) => write!(f, "Model not found: {}", msg),
            ProviderError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            ProviderError::Unknown(msg) => write!(f, "Unknown provider error: {}", msg),
        }
    }
}

impl ProviderError {
    /// Returns `true` if this error is transient and the request could be retried.
    ///
    /// Retryable errors: RateLimit, ServerError, Timeout.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimit(_) | ProviderError::ServerError(_) | ProviderError::Timeout(_)
        )
    }

    /// Returns the HTTP status code associated with this error, if applicable.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::Auth(_) => Some(401),
            ProviderError::RateLimit(_) => Some(429),
            ProviderError::Billing(_) => Some(402),
            ProviderError::ServerError(_) => Some(500),
            ProviderError::InvalidRequest(_) => Some(400),
            ProviderError::ModelNotFound(_) => Some(404),
            ProviderError::Timeout(_) => None,
            ProviderError::Unknown(_) => None,
        }
    }
}

impl From<ProviderError> for ChatlineError {
    fn from(err: ProviderError) -> Self {
        ChatlineError::ProviderTyped(err)
    }
}

// ============================================================================
// Tool Errors
// ============================================================================

/// Failures raised while registering or invoking a tool.
///
/// None of these abort a conversation turn: the registry turns them into
/// tool-result text so the model can recover or explain the failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// A tool with this name is already registered.
    #[error("Tool already registered: {0}")]
    Duplicate(String),

    /// The model asked for a tool that does not exist.
    #[error("Tool not found: {0}")]
    Unknown(String),

    /// A required parameter was absent from the call.
    #[error("Missing required argument '{parameter}' for tool '{tool}'")]
    MissingArgument { tool: String, parameter: String },

    /// Arguments were present but unusable (bad JSON, non-scalar values).
    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidArgument { tool: String, message: String },

    /// The handler itself failed (network, missing resource, ...).
    #[error("Tool '{tool}' failed: {message}")]
    Execution { tool: String, message: String },
}

impl ToolError {
    /// Build an execution error for `tool`.
    pub fn execution(tool: &str, message: impl Into<String>) -> Self {
        ToolError::Execution {
            tool: tool.to_string(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for Chatline operations.
#[derive(Error, Debug)]
pub enum ChatlineError {
    /// Configuration-related errors (invalid config, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider errors that carry no HTTP classification (stream decode, protocol).
    #[error("Provider error: {0}")]
    Provider(String),

    /// Structured provider error with classification.
    #[error("Provider error: {0}")]
    ProviderTyped(ProviderError),

    /// Tool registration or invocation errors.
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A specialized `Result` type for Chatline operations.
pub type Result<T> = std::result::Result<T, ChatlineError>;
