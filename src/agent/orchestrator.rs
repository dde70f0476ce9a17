//! Conversation orchestrator - one streaming turn per request
//!
//! A turn walks the states in [`TurnState`]:
//!
//! ```text
//! Idle -> ComposingPrompt -> AwaitingModel -> EmittingText ----> Completed
//!                                 ^      \                  \
//!                                 |       -> DispatchingTool  -> Failed
//!                                 +-------------/
//! ```
//!
//! The prompt is composed and the user message stored before [`handle`]
//! returns; the rest of the turn runs on its own task and reports through a
//! [`TurnStream`].
//!
//! [`handle`]: ConversationOrchestrator::handle

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::error::{ChatlineError, Result};
use crate::providers::{ChatOptions, LLMProvider, LLMToolCall, StreamEvent};
use crate::session::{ConversationMemory, Message, ToolCall};
use crate::tools::ToolRegistry;

/// Buffered turn events between the turn task and the caller.
const TURN_CHANNEL_CAPACITY: usize = 64;

/// Where a turn currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    ComposingPrompt,
    AwaitingModel,
    EmittingText,
    DispatchingTool,
    Completed,
    Failed,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnState::Idle => "idle",
            TurnState::ComposingPrompt => "composing_prompt",
            TurnState::AwaitingModel => "awaiting_model",
            TurnState::EmittingText => "emitting_text",
            TurnState::DispatchingTool => "dispatching_tool",
            TurnState::Completed => "completed",
            TurnState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What the caller receives while a turn runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// The next fragment of the reply, in generation order.
    Text(String),
    /// The turn failed; nothing follows.
    Failed(String),
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The reply was stored in memory.
    Completed {
        reply: String,
        /// Tool calls dispatched during the turn
        tool_calls: usize,
    },
    /// The model gateway failed; the user message stays, no reply stored.
    Failed(String),
    /// The caller went away; no reply stored.
    Cancelled,
}

/// The caller's end of a running turn.
///
/// Yields [`TurnEvent`]s in order and ends when the turn ends. Dropping it
/// cancels the turn.
pub struct TurnStream {
    events: mpsc::Receiver<TurnEvent>,
    task: JoinHandle<TurnOutcome>,
}

impl TurnStream {
    /// Split into the event receiver and the handle resolving to the outcome.
    pub fn into_parts(self) -> (mpsc::Receiver<TurnEvent>, JoinHandle<TurnOutcome>) {
        (self.events, self.task)
    }
}

impl Stream for TurnStream {
    type Item = TurnEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

/// Per-deployment knobs for every turn.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Injected as the first message of every request; never stored
    pub system_prompt: String,
    /// Model override; `None` uses the provider default
    pub model: Option<String>,
    pub options: ChatOptions,
    /// Tool-call rounds allowed per turn before tools are withheld
    pub max_tool_iterations: u32,
}

impl OrchestratorSettings {
    pub fn new(system_prompt: &str) -> Self {
        Self {
            system_prompt: system_prompt.to_string(),
            model: None,
            options: ChatOptions::default(),
            max_tool_iterations: 10,
        }
    }

    /// Settings from the `agent` config section.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            system_prompt: config.resolve_system_prompt()?,
            model: Some(config.agent.model.clone()),
            options: ChatOptions::new()
                .with_max_tokens(config.agent.max_tokens)
                .with_temperature(config.agent.temperature),
            max_tool_iterations: config.agent.max_tool_iterations,
        })
    }

    pub fn with_max_tool_iterations(mut self, max: u32) -> Self {
        self.max_tool_iterations = max;
        self
    }
}

/// Drives conversation turns against memory, tools and the model.
///
/// Cheap to clone; every clone shares the same memory, registry and provider.
#[derive(Clone)]
pub struct ConversationOrchestrator {
    memory: Arc<ConversationMemory>,
    tools: Arc<ToolRegistry>,
    provider: Arc<dyn LLMProvider>,
    settings: Arc<OrchestratorSettings>,
}

impl ConversationOrchestrator {
    pub fn new(
        memory: Arc<ConversationMemory>,
        tools: Arc<ToolRegistry>,
        provider: Arc<dyn LLMProvider>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            memory,
            tools,
            provider,
            settings: Arc::new(settings),
        }
    }

    pub fn memory(&self) -> &Arc<ConversationMemory> {
        &self.memory
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Start a turn for `prompt` in `session_key`.
    ///
    /// The user message is in memory when this returns `Ok`, whatever happens
    /// to the rest of the turn.
    pub async fn handle(&self, session_key: &str, prompt: &str) -> Result<TurnStream> {
        let turn_id = uuid::Uuid::new_v4();
        let span = info_span!("turn", session = %session_key, turn_id = %turn_id);

        let mut turn = Turn {
            session_key: session_key.to_string(),
            memory: Arc::clone(&self.memory),
            tools: Arc::clone(&self.tools),
            provider: Arc::clone(&self.provider),
            settings: Arc::clone(&self.settings),
            state: TurnState::Idle,
        };

        let messages = async {
            turn.enter(TurnState::ComposingPrompt);
            let history = self.memory.read(session_key).await?;
            let user = Message::user(prompt);
            self.memory.append(session_key, user.clone()).await?;

            let mut messages = Vec::with_capacity(history.len() + 2);
            messages.push(Message::system(&self.settings.system_prompt));
            messages.extend(history);
            messages.push(user);
            info!(history = messages.len() - 2, "Composed prompt");
            Ok::<_, ChatlineError>(messages)
        }
        .instrument(span.clone())
        .await?;

        let (tx, rx) = mpsc::channel(TURN_CHANNEL_CAPACITY);
        let task = tokio::spawn(turn.run(tx, messages).instrument(span));
        Ok(TurnStream { events: rx, task })
    }
}

/// State owned by one running turn.
struct Turn {
    session_key: String,
    memory: Arc<ConversationMemory>,
    tools: Arc<ToolRegistry>,
    provider: Arc<dyn LLMProvider>,
    settings: Arc<OrchestratorSettings>,
    state: TurnState,
}

impl Turn {
    fn enter(&mut self, next: TurnState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "Turn state");
            self.state = next;
        }
    }

    async fn run(mut self, tx: mpsc::Sender<TurnEvent>, mut messages: Vec<Message>) -> TurnOutcome {
        let start = Instant::now();
        let mut reply = String::new();
        let mut rounds: u32 = 0;
        let mut dispatched = 0usize;

        loop {
            self.enter(TurnState::AwaitingModel);
            let tools = if rounds < self.settings.max_tool_iterations {
                self.tools.definitions()
            } else {
                if rounds > 0 {
                    warn!(rounds, "Tool round limit reached; asking for a final answer");
                }
                Vec::new()
            };

            let request = self.provider.chat_stream(
                messages.clone(),
                tools,
                self.settings.model.as_deref(),
                self.settings.options.clone(),
            );
            let mut events = tokio::select! {
                biased;
                _ = tx.closed() => return self.cancelled(),
                result = request => match result {
                    Ok(events) => events,
                    Err(e) => return self.fail(&tx, e).await,
                },
            };

            let mut round_text = String::new();
            let mut calls: Vec<LLMToolCall> = Vec::new();
            loop {
                let event = tokio::select! {
                    biased;
                    _ = tx.closed() => return self.cancelled(),
                    event = events.recv() => event,
                };
                match event {
                    Some(StreamEvent::Delta(text)) => {
                        self.enter(TurnState::EmittingText);
                        round_text.push_str(&text);
                        if tx.send(TurnEvent::Text(text)).await.is_err() {
                            return self.cancelled();
                        }
                    }
                    Some(StreamEvent::ToolCalls(requested)) => calls.extend(requested),
                    Some(StreamEvent::Done { usage, .. }) => {
                        if let Some(usage) = usage {
                            debug!(
                                prompt_tokens = usage.prompt_tokens,
                                completion_tokens = usage.completion_tokens,
                                "Model round finished"
                            );
                        }
                        break;
                    }
                    Some(StreamEvent::Error(e)) => return self.fail(&tx, e).await,
                    None => {
                        return self
                            .fail(
                                &tx,
                                ChatlineError::Provider(
                                    "Model stream closed before completion".to_string(),
                                ),
                            )
                            .await
                    }
                }
            }
            drop(events);
            reply.push_str(&round_text);

            if calls.is_empty() || rounds >= self.settings.max_tool_iterations {
                if !calls.is_empty() {
                    warn!(count = calls.len(), "Ignoring tool calls past the round limit");
                }
                break;
            }

            rounds += 1;
            messages.push(Message::assistant_with_tools(
                &round_text,
                calls.iter().cloned().map(ToolCall::from).collect(),
            ));

            for call in calls {
                self.enter(TurnState::DispatchingTool);
                info!(tool = %call.name, id = %call.id, round = rounds, "Dispatching tool");
                let outcome = tokio::select! {
                    biased;
                    _ = tx.closed() => return self.cancelled(),
                    outcome = self.tools.dispatch(&call) => outcome,
                };
                dispatched += 1;

                let result = Message::tool_result(call.into(), &outcome.content);
                if let Err(e) = self.memory.append(&self.session_key, result.clone()).await {
                    return self.fail(&tx, e).await;
                }
                messages.push(result);
            }
        }

        // Cancelled turns never store a reply.
        if tx.is_closed() {
            return self.cancelled();
        }
        if let Err(e) = self
            .memory
            .append(&self.session_key, Message::assistant(&reply))
            .await
        {
            return self.fail(&tx, e).await;
        }

        self.enter(TurnState::Completed);
        info!(
            chars = reply.len(),
            tool_calls = dispatched,
            duration_ms = start.elapsed().as_millis() as u64,
            "Turn completed"
        );
        TurnOutcome::Completed {
            reply,
            tool_calls: dispatched,
        }
    }

    async fn fail(&mut self, tx: &mpsc::Sender<TurnEvent>, err: ChatlineError) -> TurnOutcome {
        self.enter(TurnState::Failed);
        let message = err.to_string();
        error!(error = %message, "Turn failed");
        let _ = tx.send(TurnEvent::Failed(message.clone())).await;
        TurnOutcome::Failed(message)
    }

    fn cancelled(&self) -> TurnOutcome {
        info!(state = %self.state, "Caller disconnected; turn cancelled");
        TurnOutcome::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{LLMResponse, ToolDefinition};
    use crate::tools::DatetimeTool;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::Mutex;

    /// Replays scripted rounds and records the tool catalogs it was offered.
    struct ScriptedProvider {
        rounds: Mutex<Vec<Vec<StreamEvent>>>,
        offered_tools: Mutex<Vec<usize>>,
    }

    impl ScriptedProvider {
        fn new(mut rounds: Vec<Vec<StreamEvent>>) -> Self {
            rounds.reverse();
            Self {
                rounds: Mutex::new(rounds),
                offered_tools: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn chat(
            &self,
            _messages: Vec<Message>,
            _tools: Vec<ToolDefinition>,
            _model: Option<&str>,
            _options: ChatOptions,
        ) -> Result<LLMResponse> {
            Ok(LLMResponse::text(""))
        }

        async fn chat_stream(
            &self,
            _messages: Vec<Message>,
            tools: Vec<ToolDefinition>,
            _model: Option<&str>,
            _options: ChatOptions,
        ) -> Result<mpsc::Receiver<StreamEvent>> {
            self.offered_tools.lock().unwrap().push(tools.len());
            let events = self
                .rounds
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| vec![done("")]);
            let (tx, rx) = mpsc::channel(events.len().max(1));
            for event in events {
                tx.try_send(event).unwrap();
            }
            Ok(rx)
        }

        fn default_model(&self) -> &str {
            "scripted"
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn done(content: &str) -> StreamEvent {
        StreamEvent::Done {
            content: content.to_string(),
            usage: None,
        }
    }

    fn orchestrator(provider: Arc<ScriptedProvider>, max_rounds: u32) -> ConversationOrchestrator {
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(DatetimeTool)).unwrap();
        ConversationOrchestrator::new(
            Arc::new(ConversationMemory::new(100)),
            Arc::new(tools),
            provider,
            OrchestratorSettings::new("system").with_max_tool_iterations(max_rounds),
        )
    }

    #[test]
    fn test_turn_state_display() {
        assert_eq!(TurnState::AwaitingModel.to_string(), "awaiting_model");
        assert_eq!(TurnState::DispatchingTool.to_string(), "dispatching_tool");
    }

    #[tokio::test]
    async fn test_text_only_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![vec![
            StreamEvent::Delta("Hel".into()),
            StreamEvent::Delta("lo".into()),
            done("Hello"),
        ]]));
        let orch = orchestrator(Arc::clone(&provider), 3);

        let (rx, task) = orch.handle("s", "hi").await.unwrap().into_parts();
        let events: Vec<TurnEvent> = tokio_stream_collect(rx).await;
        assert_eq!(
            events,
            vec![TurnEvent::Text("Hel".into()), TurnEvent::Text("lo".into())]
        );
        assert_eq!(
            task.await.unwrap(),
            TurnOutcome::Completed {
                reply: "Hello".into(),
                tool_calls: 0
            }
        );

        let history = orch.memory().read("s").await.unwrap();
        assert_eq!(history, vec![Message::user("hi"), Message::assistant("Hello")]);
    }

    #[tokio::test]
    async fn test_tool_round_limit_withholds_tools() {
        let call = || StreamEvent::ToolCalls(vec![LLMToolCall::new("c", "getDatetime", "{}")]);
        let provider = Arc::new(ScriptedProvider::new(vec![
            vec![call(), done("")],
            vec![StreamEvent::Delta("final".into()), done("final")],
        ]));
        let orch = orchestrator(Arc::clone(&provider), 1);

        let stream = orch.handle("s", "time?").await.unwrap();
        let texts: Vec<TurnEvent> = stream.collect().await;
        assert_eq!(texts, vec![TurnEvent::Text("final".into())]);
        assert_eq!(*provider.offered_tools.lock().unwrap(), vec![1, 0]);
    }

    #[tokio::test]
    async fn test_stream_closing_without_done_fails_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![vec![StreamEvent::Delta(
            "partial".into(),
        )]]));
        let orch = orchestrator(provider, 3);

        let (rx, task) = orch.handle("s", "hi").await.unwrap().into_parts();
        let events = tokio_stream_collect(rx).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], TurnEvent::Failed(_)));
        assert!(matches!(task.await.unwrap(), TurnOutcome::Failed(_)));
        assert_eq!(
            orch.memory().read("s").await.unwrap(),
            vec![Message::user("hi")]
        );
    }

    async fn tokio_stream_collect(mut rx: mpsc::Receiver<TurnEvent>) -> Vec<TurnEvent> {
        let mut out = Vec::new();
        while let Some(event) = rx.recv().await {
            out.push(event);
        }
        out
    }
}
