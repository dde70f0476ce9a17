//! Agent module - conversation turns
//!
//! The [`ConversationOrchestrator`] runs one turn per user prompt: it reads the
//! session's history, asks the model for a streaming reply, runs any tools the
//! model requests and stores the finished reply.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────────────┐     ┌─────────────┐
//! │ HTTP / CLI  │────>│ ConversationOrchestrator │────>│ LLMProvider │
//! │  (caller)   │<────│      (TurnStream)        │<────│  (stream)   │
//! └─────────────┘     └──────────────────────────┘     └─────────────┘
//!                          │               │
//!                          ▼               ▼
//!                   ┌──────────────┐ ┌─────────────┐
//!                   │ Conversation │ │    Tool     │
//!                   │    Memory    │ │  Registry   │
//!                   └──────────────┘ └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use chatline::agent::{ConversationOrchestrator, OrchestratorSettings, TurnEvent};
//! use chatline::providers::OpenAIProvider;
//! use chatline::session::ConversationMemory;
//! use chatline::tools::ToolRegistry;
//!
//! async fn run() -> chatline::Result<()> {
//!     let orchestrator = ConversationOrchestrator::new(
//!         Arc::new(ConversationMemory::default()),
//!         Arc::new(ToolRegistry::new()),
//!         Arc::new(OpenAIProvider::new("your-api-key")),
//!         OrchestratorSettings::new("You are helpful."),
//!     );
//!
//!     let mut turn = orchestrator.handle("session-1", "Hello!").await?;
//!     while let Some(TurnEvent::Text(fragment)) = turn.next().await {
//!         print!("{}", fragment);
//!     }
//!     Ok(())
//! }
//! ```

pub mod orchestrator;

pub use orchestrator::{
    ConversationOrchestrator, OrchestratorSettings, TurnEvent, TurnOutcome, TurnState, TurnStream,
};
