//! Session module - agent loop architecture
//!
//! This module provides a multi-session architecture shared by every
//! transport frontend. Key components:
//!
//! - `SessionManager`: Manages multiple concurrent sessions
//! - `AgentLoop`: The bounded round loop for each session
//! - `SessionInput`/`StreamEvent`: Message types for communication
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 SessionManager                   │
//! │                                                  │
//! │  push_message(session_id, input) ────────────▶  │
//! │                                                  │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  HashMap<SessionId, Sender<SessionInput>>│   │
//! │  │                                          │   │
//! │  │  session_1 -> tx1 ──▶ [AgentLoop 1] ─┐  │   │
//! │  │  session_2 -> tx2 ──▶ [AgentLoop 2] ─┼──────▶ event_rx
//! │  │  session_3 -> tx3 ──▶ [AgentLoop 3] ─┘  │   │
//! │  └──────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! use proteosurf_core::session::{SessionManager, SessionConfig, SessionInput, StreamEvent};
//!
//! // Create manager with a config factory (returns manager and event receiver)
//! let (manager, mut event_rx) = SessionManager::new(SessionConfig::new, dispatcher);
//!
//! // Send a message (creates the session if needed)
//! manager.push_message("my-session", SessionInput::user_message("Show me KRAS")).await?;
//!
//! // Receive events
//! while let Some((session_id, event)) = event_rx.recv().await {
//!     match event {
//!         StreamEvent::Text { text } => println!("{}", text),
//!         StreamEvent::Done { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

mod agent_loop;
mod history;
mod manager;
mod types;

pub use agent_loop::AgentLoop;
pub use history::Session;
pub use manager::{ConfigFactory, EventReceiver, SessionManager};
pub use types::{
    SessionConfig, SessionId, SessionInput, StreamEvent, TurnOutcome, RESET_SENTINEL,
};
