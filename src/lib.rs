//! Chatline - session-scoped streaming chat backend
//!
//! A user prompt arrives over HTTP, is combined with the session's bounded
//! history and sent to an OpenAI-compatible model. The reply streams back
//! fragment by fragment while the model may call tools mid-turn.
//!
//! - [`session`]: per-session conversation memory with FIFO eviction
//! - [`tools`]: the tool registry and built-in tools
//! - [`providers`]: the streaming model gateway
//! - [`agent`]: the conversation orchestrator driving each turn
//! - [`http`]: the axum server exposing `/api/stream`

pub mod agent;
pub mod config;
pub mod error;
pub mod http;
pub mod providers;
pub mod session;
pub mod tools;
pub mod utils;

pub use agent::{ConversationOrchestrator, OrchestratorSettings, TurnEvent, TurnOutcome, TurnStream};
pub use config::Config;
pub use error::{ChatlineError, ProviderError, Result, ToolError};
pub use providers::{ChatOptions, LLMProvider, LLMResponse, LLMToolCall, StreamEvent, ToolDefinition};
pub use session::{ConversationMemory, Message, Role, ToolCall};
pub use tools::{Tool, ToolRegistry};
