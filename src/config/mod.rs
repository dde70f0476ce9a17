//! Configuration management for Chatline
//!
//! Configuration is loaded from `~/.chatline/config.json` (or an explicit
//! path) with environment variable overrides. A missing file means defaults.

mod types;
pub mod validate;

pub use types::*;

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{ChatlineError, Result};
use validate::{validate_config, DiagnosticLevel};

/// System instruction text shipped with the binary.
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../../prompts/system.md");

impl Config {
    /// Returns the Chatline configuration directory path (~/.chatline)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".chatline")
    }

    /// Returns the path to the config file (~/.chatline/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    ///
    /// Unknown fields are logged, not fatal. Invalid values are rejected.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let raw: serde_json::Value = serde_json::from_str(&content)?;
            for diagnostic in validate_config(&raw) {
                if diagnostic.level != DiagnosticLevel::Ok {
                    warn!(path = %path.display(), "{}", diagnostic);
                }
            }
            serde_json::from_value(raw)?
        } else {
            debug!(path = %path.display(), "No config file; using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Variables follow the pattern `CHATLINE_SECTION_KEY`. The provider key
    /// also falls back to `OPENAI_API_KEY`.
    pub fn apply_env_overrides(&mut self) {
        // Agent
        if let Ok(val) = std::env::var("CHATLINE_AGENT_MODEL") {
            self.agent.model = val;
        }
        if let Ok(val) = std::env::var("CHATLINE_AGENT_MAX_TOKENS") {
            if let Ok(v) = val.parse() {
                self.agent.max_tokens = v;
            }
        }
        if let Ok(val) = std::env::var("CHATLINE_AGENT_TEMPERATURE") {
            if let Ok(v) = val.parse() {
                self.agent.temperature = v;
            }
        }
        if let Ok(val) = std::env::var("CHATLINE_AGENT_MAX_TOOL_ITERATIONS") {
            if let Ok(v) = val.parse() {
                self.agent.max_tool_iterations = v;
            }
        }
        if let Ok(val) = std::env::var("CHATLINE_AGENT_MAX_MESSAGES") {
            if let Ok(v) = val.parse() {
                self.agent.max_messages = v;
            }
        }

        // Provider
        if let Ok(val) = std::env::var("CHATLINE_PROVIDER_API_KEY") {
            self.provider.api_key = Some(val);
        } else if self.provider.api_key.is_none() {
            if let Ok(val) = std::env::var("OPENAI_API_KEY") {
                self.provider.api_key = Some(val);
            }
        }
        if let Ok(val) = std::env::var("CHATLINE_PROVIDER_API_BASE") {
            self.provider.api_base = Some(val);
        }

        // Server
        if let Ok(val) = std::env::var("CHATLINE_SERVER_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("CHATLINE_SERVER_PORT") {
            if let Ok(v) = val.parse() {
                self.server.port = v;
            }
        }

        // Tools
        if let Ok(val) = std::env::var("CHATLINE_TOOLS_INSTRUCTIONS_TEMPLATE_PATH") {
            self.tools.instructions.template_path = PathBuf::from(val);
        }

        // Logging
        if let Ok(val) = std::env::var("CHATLINE_LOGGING_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if self.agent.max_messages == 0 {
            problems.push("agent.max_messages must be at least 1".to_string());
        }
        if !(0.0..=2.0).contains(&self.agent.temperature) {
            problems.push(format!(
                "agent.temperature {} is outside the range 0.0 - 2.0",
                self.agent.temperature
            ));
        }
        if self.server.port == 0 {
            problems.push("server.port must not be 0".to_string());
        }
        if self.server.session_cookie.trim().is_empty() {
            problems.push("server.session_cookie must not be empty".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ChatlineError::Config(problems.join("; ")))
        }
    }

    /// The system instruction text: inline value, else file, else the
    /// bundled default.
    pub fn resolve_system_prompt(&self) -> Result<String> {
        if let Some(inline) = self.agent.system_prompt.as_deref() {
            if !inline.trim().is_empty() {
                return Ok(inline.to_string());
            }
        }
        if let Some(file) = self.agent.system_prompt_file.as_deref() {
            let path = expand_home(file);
            return std::fs::read_to_string(&path).map_err(|e| {
                ChatlineError::Config(format!(
                    "Cannot read system prompt file {}: {}",
                    path.display(),
                    e
                ))
            });
        }
        Ok(DEFAULT_SYSTEM_PROMPT.to_string())
    }
}

/// Expand ~ to home directory in a path string
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
