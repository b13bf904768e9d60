//! Session types for the agent loop architecture
//!
//! These types define the input/output protocol between a transport frontend
//! (WebSocket server, CLI, tests) and the agent sessions running in
//! proteosurf-core. The output vocabulary matches the frames the frontend
//! forwards to the browser: `text`, `tool`, `image`, `audio`, `system`,
//! `error`, `done`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{Config, GatewayConfig, LimitsConfig};
use crate::gateway::ModelGateway;

/// Unique identifier for a session
pub type SessionId = String;

/// Reserved command that clears history instead of reaching the model
pub const RESET_SENTINEL: &str = "/reset";

/// Input messages sent TO an agent session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionInput {
    /// User sends a message
    UserMessage { content: String },
    /// Clear conversation history without a model call
    Reset,
    /// Abandon the current turn
    Cancel,
}

impl SessionInput {
    pub fn user_message(content: impl Into<String>) -> Self {
        Self::UserMessage {
            content: content.into(),
        }
    }

    pub fn reset() -> Self {
        Self::Reset
    }

    pub fn cancel() -> Self {
        Self::Cancel
    }
}

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The model finished naturally
    Complete,
    /// The round budget cut an otherwise-unbounded tool loop
    RoundBudget,
    /// The turn was cancelled or failed; partial output may have streamed
    Aborted,
}

/// Incremental events streamed FROM an agent session.
///
/// Produced in strict chronological order; exactly one `Done` per user
/// message, on every exit path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A segment of assistant text
    Text { text: String },
    /// A tool invocation. Emitted twice per call: first with an empty
    /// result when the call starts, then with the truncated result when it
    /// finishes, so a live consumer can show "running...".
    Tool {
        name: String,
        arguments: Value,
        result: String,
    },
    /// Binary image artifact from a tool (base64 PNG)
    Image {
        #[serde(rename = "base64")]
        data: String,
        caption: String,
    },
    /// Binary audio artifact from a tool (base64 MP3)
    Audio {
        #[serde(rename = "base64")]
        data: String,
        caption: String,
    },
    /// System-level acknowledgment (e.g. conversation reset)
    System { text: String },
    /// Transport-visible failure; ends the turn
    Error { message: String },
    /// Terminal event for the turn
    Done { outcome: TurnOutcome },
}

impl StreamEvent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tool(name: impl Into<String>, arguments: Value, result: impl Into<String>) -> Self {
        Self::Tool {
            name: name.into(),
            arguments,
            result: result.into(),
        }
    }

    pub fn image(data: impl Into<String>, caption: impl Into<String>) -> Self {
        Self::Image {
            data: data.into(),
            caption: caption.into(),
        }
    }

    pub fn audio(data: impl Into<String>, caption: impl Into<String>) -> Self {
        Self::Audio {
            data: data.into(),
            caption: caption.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::System { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn done(outcome: TurnOutcome) -> Self {
        Self::Done { outcome }
    }
}

/// Configuration for creating a session
#[derive(Clone, Default)]
pub struct SessionConfig {
    /// Custom system prompt; None uses the Proteosurf default
    pub system_prompt: Option<String>,
    /// Completion-service settings
    pub gateway: GatewayConfig,
    /// Round/truncation/timeout limits
    pub limits: LimitsConfig,
    /// Gateway override, bypassing the Anthropic client (tests, alternate
    /// providers)
    pub gateway_override: Option<Arc<dyn ModelGateway>>,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a session config from the application config
    pub fn from_config(config: &Config) -> Self {
        Self {
            system_prompt: None,
            gateway: config.gateway.clone(),
            limits: config.limits.clone(),
            gateway_override: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_gateway_config(mut self, gateway: GatewayConfig) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Use a specific gateway instance instead of constructing one
    pub fn with_gateway(mut self, gateway: Arc<dyn ModelGateway>) -> Self {
        self.gateway_override = Some(gateway);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn input_serialization() {
        let input = SessionInput::user_message("show me KRAS");
        let json = serde_json::to_string(&input).unwrap();
        assert!(json.contains("user_message"));

        let back: SessionInput = serde_json::from_str(&json).unwrap();
        match back {
            SessionInput::UserMessage { content } => assert_eq!(content, "show me KRAS"),
            other => panic!("unexpected input: {:?}", other),
        }
    }

    #[test]
    fn event_wire_names() {
        let cases = [
            (StreamEvent::text("hi"), "text"),
            (StreamEvent::tool("lookup", json!({}), ""), "tool"),
            (StreamEvent::image("aW1n", "snapshot result"), "image"),
            (StreamEvent::audio("bXAz", "Voice narration"), "audio"),
            (StreamEvent::system("Conversation reset."), "system"),
            (StreamEvent::error("boom"), "error"),
            (StreamEvent::done(TurnOutcome::Complete), "done"),
        ];
        for (event, tag) in cases {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], tag, "wrong tag for {:?}", event);
        }
    }

    #[test]
    fn image_event_uses_base64_field() {
        let value = serde_json::to_value(StreamEvent::image("cGF5bG9hZA==", "view")).unwrap();
        assert_eq!(value["base64"], "cGF5bG9hZA==");
        assert_eq!(value["caption"], "view");
    }

    #[test]
    fn done_outcome_is_distinguishable() {
        let complete = serde_json::to_value(StreamEvent::done(TurnOutcome::Complete)).unwrap();
        let budget = serde_json::to_value(StreamEvent::done(TurnOutcome::RoundBudget)).unwrap();
        assert_eq!(complete["outcome"], "complete");
        assert_eq!(budget["outcome"], "round_budget");
    }
}
