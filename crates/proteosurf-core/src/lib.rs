//! Proteosurf Core - conversation orchestration for a tool-augmented assistant
//!
//! This crate provides the core of the Proteosurf backend:
//! - The model gateway boundary to the completion service
//! - The tool contract: registry, manifest generation, and dispatch
//! - The per-session agent loop with its bounded round budget
//! - Multi-session orchestration and the outward event stream
//!
//! Tool implementations (structure fetching, pocket analysis, viewer
//! control, docking, narration, and the rest) live outside this crate and
//! plug in through the `Tool` trait.

pub mod config;
pub mod error;
pub mod formatting;
pub mod gateway;
pub mod session;
pub mod system_prompt;
pub mod tools;

pub use config::{Config, ConfigManager, GatewayConfig, LimitsConfig};
pub use error::{Error, GatewayError, Result, ToolError};
pub use formatting::{format_tool_call, truncate_str, TruncationCaps};
pub use gateway::{
    AnthropicGateway, ContentBlock, Message, ModelGateway, ModelResponse, Role, StopReason,
};
pub use session::{
    AgentLoop, Session, SessionConfig, SessionId, SessionInput, SessionManager, StreamEvent,
    TurnOutcome, RESET_SENTINEL,
};
pub use system_prompt::DEFAULT_SYSTEM_PROMPT;
pub use tools::{
    Artifact, ArtifactKind, DispatchOutcome, Tool, ToolDefinition, ToolDispatcher, ToolOutput,
    ToolRegistry,
};
