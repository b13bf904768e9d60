//! Session Manager for multi-session orchestration
//!
//! Manages multiple concurrent agent sessions, routing inputs and collecting
//! events on one shared output channel. Each session advances through one
//! round at a time; sessions never block each other.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::agent_loop::AgentLoop;
use super::types::{SessionConfig, SessionId, SessionInput, StreamEvent};
use crate::error::{Error, Result};
use crate::tools::ToolDispatcher;

/// Factory function type for creating session configs
pub type ConfigFactory = Arc<dyn Fn() -> SessionConfig + Send + Sync>;

/// Type alias for the event receiver
pub type EventReceiver = mpsc::Receiver<(SessionId, StreamEvent)>;

/// Manages multiple concurrent agent sessions
pub struct SessionManager {
    /// Map of session ID to input sender
    sessions: Arc<RwLock<HashMap<SessionId, mpsc::Sender<SessionInput>>>>,
    /// Channel for all session events (session_id, event)
    output_tx: mpsc::Sender<(SessionId, StreamEvent)>,
    /// Factory for creating session configs
    config_factory: ConfigFactory,
    /// Dispatcher shared by every session (holds no session state)
    dispatcher: Arc<ToolDispatcher>,
}

impl SessionManager {
    /// Create a new session manager.
    ///
    /// Returns the manager and an event receiver for consuming session
    /// output. The config factory is called each time a new session is
    /// created.
    pub fn new<F>(config_factory: F, dispatcher: Arc<ToolDispatcher>) -> (Self, EventReceiver)
    where
        F: Fn() -> SessionConfig + Send + Sync + 'static,
    {
        let (output_tx, output_rx) = mpsc::channel(256);

        let manager = Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            output_tx,
            config_factory: Arc::new(config_factory),
            dispatcher,
        };

        (manager, output_rx)
    }

    /// Push an input to a session, creating the session if needed
    pub async fn push_message(&self, session_id: &str, input: SessionInput) -> Result<()> {
        let tx = {
            let sessions = self.sessions.read();
            sessions.get(session_id).cloned()
        };

        let tx = match tx {
            Some(tx) => tx,
            None => self.create_session(session_id)?,
        };

        tx.send(input)
            .await
            .map_err(|e| Error::Session(format!("Failed to send input: {}", e)))?;

        Ok(())
    }

    /// Create a new session with the given ID, returning its input sender
    fn create_session(&self, session_id: &str) -> Result<mpsc::Sender<SessionInput>> {
        let session_id = session_id.to_string();
        info!("Creating new session: {}", session_id);

        let (input_tx, input_rx) = mpsc::channel(256);
        let config = (self.config_factory)();

        let agent_loop = AgentLoop::new(
            session_id.clone(),
            input_rx,
            self.output_tx.clone(),
            config,
            self.dispatcher.clone(),
        )?;

        let sid = session_id.clone();
        tokio::spawn(async move {
            agent_loop.run().await;
            debug!("Agent loop task ended for session: {}", sid);
        });

        self.sessions
            .write()
            .insert(session_id, input_tx.clone());

        Ok(input_tx)
    }

    /// List active session IDs
    pub fn list_sessions(&self) -> Vec<SessionId> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Check if a session exists
    pub fn has_session(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    /// Stop a session by dropping its input sender.
    ///
    /// The agent loop detects the closed channel and exits; a round in
    /// flight is abandoned and any dispatched tools finish detached.
    pub fn stop_session(&self, session_id: &str) {
        if self.sessions.write().remove(session_id).is_some() {
            info!("Stopped session: {}", session_id);
        }
    }

    /// Stop all sessions
    pub fn stop_all(&self) {
        let mut sessions = self.sessions.write();
        let count = sessions.len();
        sessions.clear();
        if count > 0 {
            info!("Stopped {} session(s)", count);
        }
    }

    /// Number of active sessions
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;

    fn test_manager() -> (SessionManager, EventReceiver) {
        let dispatcher = Arc::new(ToolDispatcher::new(Arc::new(ToolRegistry::new())));
        SessionManager::new(SessionConfig::new, dispatcher)
    }

    #[tokio::test]
    async fn manager_starts_empty() {
        let (manager, _rx) = test_manager();
        assert_eq!(manager.session_count(), 0);
        assert!(manager.list_sessions().is_empty());
        assert!(!manager.has_session("proteo-1"));
    }

    #[tokio::test]
    async fn stop_nonexistent_session_is_noop() {
        let (manager, _rx) = test_manager();
        manager.stop_session("missing");
        manager.stop_all();
        assert_eq!(manager.session_count(), 0);
    }
}
