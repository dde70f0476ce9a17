//! Configuration type definitions for Chatline
//!
//! All types implement serde traits for JSON serialization and have sensible
//! defaults, so a partial (or missing) config file is always valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration struct for Chatline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Conversation engine settings (model, limits, system prompt)
    pub agent: AgentConfig,
    /// LLM provider connection
    pub provider: ProviderConfig,
    /// HTTP server
    pub server: ServerConfig,
    /// Built-in tool settings
    pub tools: ToolsConfig,
    /// Log output
    pub logging: LoggingConfig,
}

// ============================================================================
// Agent Configuration
// ============================================================================

/// Conversation engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model identifier sent to the provider
    pub model: String,
    /// Maximum tokens per model reply
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,
    /// Maximum tool-call rounds in one turn
    pub max_tool_iterations: u32,
    /// Messages retained per session
    pub max_messages: usize,
    /// Inline system instruction text; wins over `system_prompt_file`
    pub system_prompt: Option<String>,
    /// Path to a file holding the system instruction text
    pub system_prompt_file: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
            max_tool_iterations: 10,
            max_messages: crate::session::DEFAULT_MAX_MESSAGES,
            system_prompt: None,
            system_prompt_file: None,
        }
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Connection settings for an OpenAI-compatible provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key for authentication
    pub api_key: Option<String>,
    /// Base URL (e.g. `http://localhost:11434/v1` for a local server)
    pub api_base: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            timeout_secs: 120,
        }
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Name of the cookie carrying the session id
    pub session_cookie: String,
    /// Mark the session cookie `Secure` (HTTPS deployments)
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            session_cookie: "CHATLINE_SESSION".to_string(),
            secure_cookies: false,
        }
    }
}

// ============================================================================
// Tools Configuration
// ============================================================================

/// Built-in tool configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub weather: WeatherConfig,
    pub instructions: InstructionsConfig,
}

/// Weather lookup endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// City name → coordinates
    pub geocoding_url: String,
    /// Coordinates → current weather
    pub forecast_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            geocoding_url: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Employee-ID instructions template location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstructionsConfig {
    pub template_path: PathBuf,
}

impl Default for InstructionsConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from("data/how-to-update-ee-id.md"),
        }
    }
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human-readable
    Pretty,
    /// Compact single-line text
    #[default]
    Component,
    /// JSON lines
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Append JSON logs to this file instead of stdout (json format only)
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: "info".to_string(),
            file: None,
        }
    }
}
