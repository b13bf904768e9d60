//! Agent loop - the bounded round state machine
//!
//! One loop per session. The loop:
//! - Receives user input and control messages (reset, cancel)
//! - Calls the model gateway with the working transcript plus tool manifest
//! - Dispatches requested tools and folds their outcomes back into the round
//! - Emits the ordered event stream for the transport to forward
//!
//! Per turn the loop moves `Idle -> Thinking -> Acting -> Thinking -> ... ->
//! Done`, where `Thinking` awaits the gateway and `Acting` awaits tool
//! execution. A fixed round budget bounds the loop against a model that never
//! stops requesting tools.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::history::Session;
use super::types::{SessionConfig, SessionId, SessionInput, StreamEvent, TurnOutcome, RESET_SENTINEL};
use crate::error::{Error, GatewayError, Result};
use crate::gateway::{AnthropicGateway, ContentBlock, Message, ModelGateway, ModelResponse};
use crate::system_prompt::DEFAULT_SYSTEM_PROMPT;
use crate::tools::{ArtifactKind, DispatchOutcome, ToolDefinition, ToolDispatcher};

/// One tool request lifted out of a model response
struct PendingRequest {
    id: String,
    name: String,
    arguments: Value,
}

/// The per-session agent loop
pub struct AgentLoop {
    /// Session identifier
    session_id: SessionId,
    /// User text messages
    message_rx: mpsc::UnboundedReceiver<String>,
    /// Control messages (reset, cancel)
    control_rx: mpsc::UnboundedReceiver<SessionInput>,
    /// Event sender shared with the transport
    output_tx: mpsc::Sender<(SessionId, StreamEvent)>,
    /// Completion-service boundary
    gateway: Arc<dyn ModelGateway>,
    /// Shared tool dispatcher
    dispatcher: Arc<ToolDispatcher>,
    /// Durable conversation state, exclusively owned by this loop
    session: Session,
    /// Maximum model/tool rounds per user message
    max_rounds: usize,
}

impl AgentLoop {
    /// Create a new agent loop.
    ///
    /// Spawns a small dispatcher task that splits the session input channel
    /// into user messages and control messages, so a reset or cancel can
    /// reach a turn already in flight.
    pub fn new(
        session_id: SessionId,
        mut input_rx: mpsc::Receiver<SessionInput>,
        output_tx: mpsc::Sender<(SessionId, StreamEvent)>,
        config: SessionConfig,
        dispatcher: Arc<ToolDispatcher>,
    ) -> Result<Self> {
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let sid = session_id.clone();
        tokio::spawn(async move {
            debug!("Input dispatcher started for session: {}", sid);
            while let Some(input) = input_rx.recv().await {
                let send_result = match input {
                    SessionInput::UserMessage { content } => {
                        message_tx.send(content).map_err(|_| ())
                    }
                    control => control_tx.send(control).map_err(|_| ()),
                };
                if send_result.is_err() {
                    debug!("Input dispatcher for {} lost its receiver", sid);
                    break;
                }
            }
            debug!("Input dispatcher ended for session: {}", sid);
        });

        let gateway: Arc<dyn ModelGateway> = match config.gateway_override {
            Some(gateway) => gateway,
            None => {
                let prompt = config
                    .system_prompt
                    .as_deref()
                    .unwrap_or(DEFAULT_SYSTEM_PROMPT);
                Arc::new(AnthropicGateway::new(config.gateway)?.with_system_prompt(prompt))
            }
        };

        Ok(Self {
            session: Session::with_id(session_id.clone()),
            session_id,
            message_rx,
            control_rx,
            output_tx,
            gateway,
            dispatcher,
            max_rounds: config.limits.max_rounds,
        })
    }

    /// Run the loop until the session's input channel closes
    pub async fn run(mut self) {
        info!("Agent loop starting for session: {}", self.session_id);

        loop {
            tokio::select! {
                message = self.message_rx.recv() => match message {
                    Some(content) => {
                        if content.trim().eq_ignore_ascii_case(RESET_SENTINEL) {
                            self.handle_reset().await;
                        } else {
                            self.run_turn(content).await;
                        }
                    }
                    None => break,
                },
                control = self.control_rx.recv() => match control {
                    Some(SessionInput::Reset) => self.handle_reset().await,
                    Some(SessionInput::Cancel) => {
                        debug!("Cancel received with no turn in flight; ignoring");
                    }
                    Some(other) => debug!("Unexpected control input while idle: {:?}", other),
                    None => break,
                },
            }
        }

        info!("Agent loop ended for session: {}", self.session_id);
    }

    /// Clear durable history and acknowledge. Safe to repeat.
    async fn handle_reset(&mut self) {
        self.session.clear();
        info!("Session {} history reset", self.session_id);
        self.emit(StreamEvent::system("Conversation reset.")).await;
    }

    /// Run one full turn for a user message, ending in exactly one `Done`
    async fn run_turn(&mut self, content: String) {
        self.session.push_user(&content);

        // The round loop works on a snapshot so a reset arriving mid-turn
        // only affects durable history.
        let mut transcript = self.session.transcript();
        let manifest = self.dispatcher.manifest();
        let mut reply_parts: Vec<String> = Vec::new();

        let outcome = match self
            .run_rounds(&mut transcript, &manifest, &mut reply_parts)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(session = %self.session_id, error = %e, "Turn failed");
                self.emit(StreamEvent::error(e.to_string())).await;
                TurnOutcome::Aborted
            }
        };

        // Durable history gets the flattened reply; an aborted turn keeps
        // only the user message so a retry starts clean.
        if outcome != TurnOutcome::Aborted {
            let reply = reply_parts.join("\n");
            if !reply.is_empty() {
                self.session.push_assistant(reply);
            }
        }

        self.emit(StreamEvent::done(outcome)).await;
    }

    /// The bounded round loop: model call, tool execution, repeat
    async fn run_rounds(
        &mut self,
        transcript: &mut Vec<Message>,
        manifest: &[ToolDefinition],
        reply_parts: &mut Vec<String>,
    ) -> Result<TurnOutcome> {
        for round in 1..=self.max_rounds {
            debug!(round, session = %self.session_id, "Calling model gateway");
            let response = self.gateway.complete(transcript, manifest).await?;

            let requests = self.stream_response(&response, reply_parts).await?;
            transcript.push(Message::assistant_blocks(response.content.clone()));

            if requests.is_empty() {
                return Ok(TurnOutcome::Complete);
            }

            let outcomes = match self.collect_outcomes(&requests).await {
                Some(outcomes) => outcomes,
                None => return Ok(TurnOutcome::Aborted),
            };

            // Every request gets exactly one outcome, in request order,
            // before the next gateway call. Partial rounds are never sent.
            let blocks = requests
                .iter()
                .zip(outcomes)
                .map(|(req, out)| ContentBlock::tool_outcome(&req.id, out.model_text, out.truncated))
                .collect();
            transcript.push(Message::tool_outcomes(blocks));

            if response.is_end_turn() {
                return Ok(TurnOutcome::Complete);
            }
        }

        info!(
            session = %self.session_id,
            max_rounds = self.max_rounds,
            "Round budget exhausted; ending turn with accumulated text"
        );
        Ok(TurnOutcome::RoundBudget)
    }

    /// Emit events for a model response in block order and lift out the tool
    /// requests. Each request's first `Tool` event carries an empty result so
    /// the consumer sees the call before it completes.
    async fn stream_response(
        &mut self,
        response: &ModelResponse,
        reply_parts: &mut Vec<String>,
    ) -> Result<Vec<PendingRequest>> {
        let mut requests = Vec::new();
        for block in &response.content {
            match block {
                ContentBlock::Text { text } => {
                    reply_parts.push(text.clone());
                    self.emit(StreamEvent::text(text)).await;
                }
                ContentBlock::ToolRequest { id, name, arguments } => {
                    self.emit(StreamEvent::tool(name, arguments.clone(), ""))
                        .await;
                    requests.push(PendingRequest {
                        id: id.clone(),
                        name: name.clone(),
                        arguments: arguments.clone(),
                    });
                }
                ContentBlock::ToolOutcome { .. } => {
                    return Err(Error::Gateway(GatewayError::Protocol(
                        "model response contained a tool_result block".to_string(),
                    )));
                }
            }
        }
        Ok(requests)
    }

    /// Execute one round's tool requests concurrently and gather every
    /// outcome. Returns None when the turn is cancelled; dispatched handlers
    /// then keep running detached and their results are discarded.
    async fn collect_outcomes(
        &mut self,
        requests: &[PendingRequest],
    ) -> Option<Vec<DispatchOutcome>> {
        let mut join_set: JoinSet<(usize, DispatchOutcome)> = JoinSet::new();
        for (idx, request) in requests.iter().enumerate() {
            let dispatcher = self.dispatcher.clone();
            let name = request.name.clone();
            let arguments = request.arguments.clone();
            join_set.spawn(async move {
                let outcome = dispatcher.dispatch(&name, arguments).await;
                (idx, outcome)
            });
        }

        let mut slots: Vec<Option<DispatchOutcome>> = (0..requests.len()).map(|_| None).collect();

        loop {
            tokio::select! {
                joined = join_set.join_next() => match joined {
                    Some(Ok((idx, outcome))) => {
                        self.finish_request(&requests[idx], &outcome).await;
                        slots[idx] = Some(outcome);
                    }
                    Some(Err(e)) => {
                        // Dispatcher isolates handler panics, so a join
                        // failure means the spawned task itself died.
                        error!("Tool task failed: {}", e);
                    }
                    None => break,
                },
                control = self.control_rx.recv() => match control {
                    Some(SessionInput::Reset) => self.handle_reset().await,
                    Some(SessionInput::Cancel) => {
                        info!(session = %self.session_id, "Turn cancelled; detaching in-flight tools");
                        join_set.detach_all();
                        return None;
                    }
                    Some(other) => debug!("Unexpected control input mid-turn: {:?}", other),
                    None => {
                        info!(session = %self.session_id, "Session input closed mid-turn; abandoning round");
                        join_set.detach_all();
                        return None;
                    }
                },
            }
        }

        // A lost task still owes its request an outcome; fabricate the
        // standard error text so the pairing invariant holds.
        let outcomes = requests
            .iter()
            .zip(slots)
            .map(|(request, slot)| match slot {
                Some(outcome) => outcome,
                None => {
                    warn!(tool = %request.name, "Synthesizing outcome for lost tool task");
                    let text = format!("Error executing {}: task failed", request.name);
                    DispatchOutcome {
                        stream_preview: text.clone(),
                        model_text: text.clone(),
                        raw_text: text,
                        truncated: false,
                        artifacts: Vec::new(),
                        is_error: true,
                    }
                }
            })
            .collect();
        Some(outcomes)
    }

    /// Emit a completed request's artifacts and its second `Tool` event
    async fn finish_request(&self, request: &PendingRequest, outcome: &DispatchOutcome) {
        for artifact in &outcome.artifacts {
            let event = match artifact.kind {
                ArtifactKind::Image => StreamEvent::image(&artifact.data, &artifact.caption),
                ArtifactKind::Audio => StreamEvent::audio(&artifact.data, &artifact.caption),
            };
            self.emit(event).await;
        }
        self.emit(StreamEvent::tool(
            &request.name,
            request.arguments.clone(),
            &outcome.stream_preview,
        ))
        .await;
    }

    /// Emit an event to the transport
    async fn emit(&self, event: StreamEvent) {
        if let Err(e) = self.output_tx.send((self.session_id.clone(), event)).await {
            error!("Failed to emit event: {}", e);
        }
    }
}
