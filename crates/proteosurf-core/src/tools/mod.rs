//! Tool system for the Proteosurf agent
//!
//! Tools are the named, schema-described capabilities the model can invoke.
//! Each tool has:
//! - A name and description for the LLM
//! - A JSON schema for its arguments
//! - An execute method returning text plus optional binary artifacts
//!
//! Tool implementations live outside this crate; everything here is the
//! uniform contract they plug into.

mod dispatcher;

pub use dispatcher::{DispatchOutcome, ToolDispatcher};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;

/// A binary side-channel payload produced by a tool alongside its text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// Base64-encoded payload bytes
    pub data: String,
    pub caption: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Image,
    Audio,
}

impl Artifact {
    pub fn image(data: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            kind: ArtifactKind::Image,
            data: data.into(),
            caption: caption.into(),
        }
    }

    pub fn audio(data: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            kind: ArtifactKind::Audio,
            data: data.into(),
            caption: caption.into(),
        }
    }
}

/// Output from a tool execution.
///
/// Artifacts are declared structurally here rather than smuggled inside the
/// text, so extraction is a decomposition instead of a parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The textual result fed back to the model
    pub text: String,
    /// Binary side-channel payloads (screenshots, narrations)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            artifacts: Vec::new(),
        }
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }
}

/// Tool definition for LLM consumption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Core trait for all tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (used by the LLM to invoke)
    fn name(&self) -> &str;

    /// Description of what the tool does
    fn description(&self) -> &str;

    /// JSON schema for the arguments
    fn input_schema(&self) -> Value;

    /// Execute the tool with the given arguments
    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError>;

    /// Convert to tool definition for the LLM manifest
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Registry of available tools.
///
/// Built once at startup, read-only afterwards; safe to share across
/// sessions. The manifest preserves registration order, and that order is
/// stable across calls; models may use position as a weak tie-break.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names are unique; a second registration under the
    /// same name is an error rather than a silent replacement.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ToolError::Duplicate(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    /// Tool definitions in registration order, for the model manifest
    pub fn manifest(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Helper macro for creating tool argument schemas
#[macro_export]
macro_rules! tool_params {
    ($($field:ident : $type:expr => $desc:expr),* $(,)?) => {
        serde_json::json!({
            "type": "object",
            "properties": {
                $( stringify!($field): { "type": $type, "description": $desc } ),*
            },
            "required": [ $( stringify!($field) ),* ]
        })
    };
}
