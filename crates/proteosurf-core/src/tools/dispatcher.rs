//! Tool dispatcher
//!
//! Executes one named tool call against the registry with isolated failure
//! handling and result post-processing. This is the primary failure-isolation
//! boundary of the system: a malfunctioning tool becomes an in-band textual
//! result the model can read and react to, never a crash of the session.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{Artifact, ArtifactKind, ToolOutput, ToolRegistry};
use crate::error::ToolError;
use crate::formatting::TruncationCaps;

/// JSON key conventionally carrying a base64 PNG in a string result
const IMAGE_KEY: &str = "image_base64";
/// JSON key conventionally carrying a base64 MP3 in a string result
const AUDIO_KEY: &str = "audio_base64";

/// The post-processed result of one tool call
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Untruncated handler output (or error text)
    pub raw_text: String,
    /// Consumer-facing preview, bounded by the stream cap
    pub stream_preview: String,
    /// Model-facing text, bounded by the model cap
    pub model_text: String,
    /// Whether `model_text` was cut from `raw_text`
    pub truncated: bool,
    /// Extracted binary side-channel payloads
    pub artifacts: Vec<Artifact>,
    /// Whether this outcome records a failure (in-band, not fatal)
    pub is_error: bool,
}

/// Executes tool calls with timeout, isolation, truncation, and artifact
/// extraction. Holds no session state; one dispatcher serves all sessions.
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    caps: TruncationCaps,
    timeout: Option<Duration>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            caps: TruncationCaps::default(),
            timeout: None,
        }
    }

    /// Set the truncation caps applied to every result
    pub fn with_caps(mut self, caps: TruncationCaps) -> Self {
        self.caps = caps;
        self
    }

    /// Set the per-tool execution timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The registry's manifest, for the model gateway
    pub fn manifest(&self) -> Vec<super::ToolDefinition> {
        self.registry.manifest()
    }

    /// Execute one tool call.
    ///
    /// Never returns an error: lookup misses, handler failures, panics, and
    /// timeouts all become textual outcomes so the round stays alive.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> DispatchOutcome {
        let Some(tool) = self.registry.get(name) else {
            warn!(tool = name, "Model requested an unregistered tool");
            return self.finish(name, format!("Unknown tool '{}'", name), Vec::new(), true);
        };

        debug!(tool = name, "Executing tool");
        let result = self.run_handler(tool.as_ref(), arguments).await;

        match result {
            Ok(output) => {
                info!(tool = name, chars = output.text.len(), "Tool completed");
                let ToolOutput { text, artifacts } = output;
                self.finish(name, text, artifacts, false)
            }
            Err(e) => {
                warn!(tool = name, error = %e, "Tool failed");
                self.finish(name, format!("Error executing {}: {}", name, e), Vec::new(), true)
            }
        }
    }

    /// Run the handler with panic isolation and the configured timeout
    async fn run_handler(
        &self,
        tool: &dyn super::Tool,
        arguments: Value,
    ) -> Result<ToolOutput, ToolError> {
        let fut = AssertUnwindSafe(tool.execute(arguments)).catch_unwind();

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(joined) => joined,
                Err(_) => return Err(ToolError::Timeout(limit.as_secs())),
            },
            None => fut.await,
        };

        match joined {
            Ok(result) => result,
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "handler panicked".to_string());
                Err(ToolError::ExecutionFailed(detail))
            }
        }
    }

    /// Assemble the outcome: artifact extraction plus both truncations
    fn finish(
        &self,
        name: &str,
        raw_text: String,
        mut artifacts: Vec<Artifact>,
        is_error: bool,
    ) -> DispatchOutcome {
        // Legacy path: tools that only return strings may embed payloads
        // under conventional JSON keys. Structural artifacts win when present.
        if artifacts.is_empty() {
            artifacts = sniff_artifacts(name, &raw_text);
        }

        let stream_preview = self.caps.for_stream(&raw_text);
        let model_text = self.caps.for_model(&raw_text);
        let truncated = model_text.len() < raw_text.len();

        DispatchOutcome {
            raw_text,
            stream_preview,
            model_text,
            truncated,
            artifacts,
            is_error,
        }
    }
}

/// Best-effort extraction of base64 payloads from a JSON-shaped string
/// result. Anything that is not a JSON object with the conventional keys
/// simply yields no artifacts.
fn sniff_artifacts(tool_name: &str, raw_text: &str) -> Vec<Artifact> {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw_text) else {
        return Vec::new();
    };

    let mut artifacts = Vec::new();
    if let Some(data) = map.get(IMAGE_KEY).and_then(Value::as_str) {
        artifacts.push(Artifact {
            kind: ArtifactKind::Image,
            data: data.to_string(),
            caption: format!("{} result", tool_name),
        });
    }
    if let Some(data) = map.get(AUDIO_KEY).and_then(Value::as_str) {
        artifacts.push(Artifact {
            kind: ArtifactKind::Audio,
            data: data.to_string(),
            caption: "Voice narration".to_string(),
        });
    }
    artifacts
}
