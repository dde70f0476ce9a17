//! HTTP layer for Chatline.
//!
//! Axum server exposing the streaming chat endpoint and a health check.
//! Session identity rides on a cookie; everything else is delegated to the
//! [`ConversationOrchestrator`](crate::agent::ConversationOrchestrator).

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::AppError;
pub use router::build_router;
pub use state::AppState;

use std::sync::Arc;

use tracing::{info, warn};

use crate::agent::{ConversationOrchestrator, OrchestratorSettings};
use crate::config::Config;
use crate::error::Result;
use crate::providers::build_provider;
use crate::session::ConversationMemory;
use crate::tools::builtin_registry;

/// Wire up memory, tools and provider from `config`.
pub fn build_state(config: &Config) -> Result<AppState> {
    let provider = build_provider(&config.provider)?;
    let tools = Arc::new(builtin_registry(&config.tools)?);
    let memory = Arc::new(ConversationMemory::new(config.agent.max_messages));
    let settings = OrchestratorSettings::from_config(config)?;

    info!(
        provider = provider.name(),
        model = %config.agent.model,
        tools = tools.len(),
        max_messages = memory.max_messages(),
        "Conversation engine ready"
    );

    let orchestrator = ConversationOrchestrator::new(memory, tools, provider, settings);
    Ok(AppState::new(orchestrator, &config.server))
}

/// Bind `server.host:server.port` and serve until Ctrl+C or SIGTERM.
pub async fn serve(config: &Config) -> Result<()> {
    let state = build_state(config)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    crate::log_component!(info, "http", "Chatline listening", addr = addr.as_str());

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    crate::log_component!(info, "http", "Server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
