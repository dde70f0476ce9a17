//! Shared state handed to every handler.

use std::sync::Arc;

use crate::agent::ConversationOrchestrator;
use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: ConversationOrchestrator,
    /// Cookie carrying the session id
    pub session_cookie: Arc<str>,
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(orchestrator: ConversationOrchestrator, server: &ServerConfig) -> Self {
        Self {
            orchestrator,
            session_cookie: Arc::from(server.session_cookie.as_str()),
            secure_cookies: server.secure_cookies,
        }
    }
}
