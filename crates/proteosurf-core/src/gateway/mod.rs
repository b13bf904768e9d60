//! Model gateway abstraction
//!
//! The gateway is the pure request/response boundary to the language-model
//! completion service. It owns the wire message model (roles, content blocks,
//! stop reasons) and exposes a single `complete` operation. It never mutates
//! session state, which keeps completion providers swappable without touching
//! the orchestrator.

mod anthropic;

pub use anthropic::AnthropicGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;
use crate::tools::ToolDefinition;

/// Who authored a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One tagged segment of a message.
///
/// `ToolRequest` is only ever produced by the model; `ToolOutcome` is only
/// ever produced by the orchestrator. Every `ToolRequest` in a round must be
/// matched by exactly one `ToolOutcome` before the next gateway call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(rename = "tool_use")]
    ToolRequest {
        id: String,
        name: String,
        #[serde(rename = "input")]
        arguments: Value,
    },
    #[serde(rename = "tool_result")]
    ToolOutcome {
        #[serde(rename = "tool_use_id")]
        request_id: String,
        #[serde(rename = "content")]
        text: String,
        #[serde(default)]
        truncated: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tool_request(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: Value,
    ) -> Self {
        Self::ToolRequest {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    pub fn tool_outcome(
        request_id: impl Into<String>,
        text: impl Into<String>,
        truncated: bool,
    ) -> Self {
        Self::ToolOutcome {
            request_id: request_id.into(),
            text: text.into(),
            truncated,
        }
    }
}

/// A message in the conversation history.
///
/// Order is significant: the history is both the audit trail and the prompt
/// fed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Create a plain-text user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Create a plain-text assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Create an assistant message from raw model content blocks
    pub fn assistant_blocks(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// Create the user-role message carrying one round's tool outcomes
    pub fn tool_outcomes(outcomes: Vec<ContentBlock>) -> Self {
        debug_assert!(outcomes
            .iter()
            .all(|b| matches!(b, ContentBlock::ToolOutcome { .. })));
        Self {
            role: Role::User,
            content: outcomes,
        }
    }

    /// Concatenated text of all text blocks (for logging/display)
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Why the model stopped emitting content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    #[serde(untagged)]
    Other(String),
}

/// One structured response from the completion service
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    /// Ordered content: `Text` and `ToolRequest` blocks only
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<StopReason>,
}

impl ModelResponse {
    /// The tool requests in this response, in block order
    pub fn tool_requests(&self) -> impl Iterator<Item = &ContentBlock> {
        self.content
            .iter()
            .filter(|b| matches!(b, ContentBlock::ToolRequest { .. }))
    }

    pub fn has_tool_requests(&self) -> bool {
        self.tool_requests().next().is_some()
    }

    /// Whether the model signalled natural completion
    pub fn is_end_turn(&self) -> bool {
        self.stop_reason == Some(StopReason::EndTurn)
    }
}

/// The request/response boundary to a completion service.
///
/// Implementations must be stateless with respect to the session: the full
/// history and manifest arrive with every call.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Provider name (for logging)
    fn name(&self) -> &str;

    /// One completion round trip
    async fn complete(
        &self,
        messages: &[Message],
        manifest: &[ToolDefinition],
    ) -> std::result::Result<ModelResponse, GatewayError>;
}
