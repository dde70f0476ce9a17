//! Request handlers.
//!
//! `POST /api/stream` answers with Server-Sent Events:
//! - unnamed `message` events carrying `{ "text": "..." }`, one per fragment
//! - a terminal `error` event carrying `{ "message": "..." }` if the turn fails
//!
//! The stream closes when the turn ends. A client that disconnects early
//! cancels the turn.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::error::AppError;
use super::state::AppState;
use crate::agent::TurnEvent;

/// Body of `POST /api/stream`.
#[derive(Debug, Deserialize)]
pub struct StreamRequest {
    #[serde(default)]
    pub prompt: String,
}

/// POST /api/stream - stream one conversation turn.
pub async fn stream_chat(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<StreamRequest>,
) -> Result<(CookieJar, Sse<impl Stream<Item = Result<Event, Infallible>>>), AppError> {
    if body.prompt.trim().is_empty() {
        return Err(AppError::Validation("prompt must not be empty".to_string()));
    }

    let (session_key, jar) = session_from(jar, &state);
    info!(session = %session_key, chars = body.prompt.len(), "Stream requested");

    let turn = state
        .orchestrator
        .handle(&session_key, &body.prompt)
        .await?;

    let events = turn.map(|event| Ok::<_, Infallible>(to_sse(event)));
    Ok((jar, Sse::new(events).keep_alive(KeepAlive::default())))
}

/// GET /health - liveness plus session and tool counts.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let sessions = state.orchestrator.memory().session_count().await;
    Json(json!({
        "status": "ok",
        "sessions": sessions,
        "tools": state.orchestrator.tools().names(),
    }))
}

/// The session id from the cookie, or a fresh one added to the jar.
fn session_from(jar: CookieJar, state: &AppState) -> (String, CookieJar) {
    if let Some(existing) = jar.get(&state.session_cookie) {
        if !existing.value().is_empty() {
            return (existing.value().to_string(), jar);
        }
    }

    let id = uuid::Uuid::new_v4().to_string();
    let cookie = Cookie::build((state.session_cookie.to_string(), id.clone()))
        .path("/")
        .http_only(true)
        .secure(state.secure_cookies)
        .same_site(SameSite::Lax);
    info!(session = %id, "Issued session cookie");
    (id, jar.add(cookie))
}

fn to_sse(event: TurnEvent) -> Event {
    match event {
        TurnEvent::Text(text) => Event::default().data(json!({ "text": text }).to_string()),
        TurnEvent::Failed(message) => Event::default()
            .event("error")
            .data(json!({ "message": message }).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_request_missing_prompt_is_empty() {
        let body: StreamRequest = serde_json::from_str("{}").unwrap();
        assert!(body.prompt.is_empty());
    }
}
