//! Providers module - the model gateway
//!
//! This module defines the `LLMProvider` trait and common types for talking
//! to a language model. `OpenAIProvider` implements it for any
//! OpenAI-compatible chat-completions endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use chatline::providers::{ChatOptions, LLMProvider, OpenAIProvider};
//! use chatline::session::Message;
//!
//! async fn example() {
//!     let provider = OpenAIProvider::new("your-api-key");
//!     let messages = vec![Message::user("Hello!")];
//!     let options = ChatOptions::new().with_max_tokens(1000);
//!
//!     let response = provider.chat(messages, vec![], None, options).await.unwrap();
//!     println!("Response: {}", response.content);
//! }
//! ```

pub mod openai;
mod types;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::ProviderConfig;
use crate::error::{ChatlineError, ProviderError, Result};

pub use openai::OpenAIProvider;
pub use types::{
    ChatOptions, LLMProvider, LLMResponse, LLMToolCall, StreamEvent, ToolDefinition, Usage,
};

/// Parse an HTTP status code and response body into a structured [`ProviderError`].
pub fn parse_provider_error(status: u16, body: &str) -> ProviderError {
    match status {
        401 => ProviderError::Auth(body.to_string()),
        402 => ProviderError::Billing(body.to_string()),
        404 => ProviderError::ModelNotFound(body.to_string()),
        429 => ProviderError::RateLimit(body.to_string()),
        400 => ProviderError::InvalidRequest(body.to_string()),
        500..=599 => ProviderError::ServerError(body.to_string()),
        _ => ProviderError::Unknown(format!("HTTP {}: {}", status, body)),
    }
}

/// Build the configured provider.
///
/// Fails when no API key is configured; the key may come from the config
/// file or the environment (see [`crate::config::Config::apply_env_overrides`]).
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn LLMProvider>> {
    let api_key = config
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            ChatlineError::Config(
                "No API key configured. Set provider.api_key or CHATLINE_PROVIDER_API_KEY"
                    .to_string(),
            )
        })?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    let api_base = config.api_base.as_deref().unwrap_or(openai::OPENAI_API_URL);

    info!(api_base = %api_base, timeout_secs = config.timeout_secs, "Provider configured");
    Ok(Arc::new(OpenAIProvider::with_client(
        api_key, api_base, client,
    )))
}
