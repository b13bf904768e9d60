//! Durable conversation state for one logical user interaction
//!
//! The session owns the message history exclusively. A round loop in flight
//! works on a cloned transcript, so resetting the session never disturbs a
//! round that has already started.

use chrono::{DateTime, Utc};

use crate::gateway::Message;

/// One conversation's durable state
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session ID
    pub id: String,
    /// Conversation messages, append-only except for `clear`
    messages: Vec<Message>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Append a user message
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    /// Append a plain-text assistant reply
    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(Message::assistant(text));
    }

    /// The full history, in order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Snapshot the history as the working transcript for a round loop
    pub fn transcript(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Discard all history. In-flight rounds keep their own transcript.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
