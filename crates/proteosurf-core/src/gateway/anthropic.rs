//! Anthropic Messages API gateway
//!
//! A direct wire client for the completion service. Transient failures
//! (rate limits, 5xx, network) get a small bounded retry with exponential
//! backoff; authentication and protocol failures are fatal immediately.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::{ContentBlock, Message, ModelGateway, ModelResponse, StopReason};
use crate::config::GatewayConfig;
use crate::error::{Error, GatewayError, Result};
use crate::tools::ToolDefinition;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const MESSAGES_PATH: &str = "/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Base delay for exponential retry backoff
const RETRY_BASE_MS: u64 = 500;

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    tools: &'a [ToolDefinition],
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct WireResponse {
    content: Vec<Value>,
    #[serde(default)]
    stop_reason: Option<Value>,
}

/// Gateway to the Anthropic Messages API
#[derive(Debug)]
pub struct AnthropicGateway {
    config: GatewayConfig,
    api_key: String,
    system_prompt: String,
    client: reqwest::Client,
}

impl AnthropicGateway {
    /// Create a gateway from configuration.
    ///
    /// Fails with a configuration error when no API key can be resolved from
    /// the config or the environment.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            Error::Config(format!(
                "No API key configured (set {} or gateway.api_key)",
                crate::config::API_KEY_ENV
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(GatewayError::Network)?;

        Ok(Self {
            config,
            api_key,
            system_prompt: String::new(),
            client,
        })
    }

    /// Set the system instructions sent with every request
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    fn endpoint(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!("{}{}", base, MESSAGES_PATH)
    }

    fn backoff_delay(&self, attempt: usize) -> Duration {
        Duration::from_millis(RETRY_BASE_MS.saturating_mul(1 << (attempt as u32 - 1)))
    }

    async fn send_once(
        &self,
        request: &WireRequest<'_>,
    ) -> std::result::Result<ModelResponse, GatewayError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Completion service rejected credentials");
            return Err(GatewayError::Auth(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Completion service error");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(format!("unparseable response body: {}", e)))?;

        parse_response(wire)
    }
}

/// Convert a wire response into the typed content-block model.
///
/// Block types this client does not understand are skipped; a recognized
/// block that fails to decode, or a `tool_result` block (which the model
/// never legitimately produces), is a protocol violation.
fn parse_response(wire: WireResponse) -> std::result::Result<ModelResponse, GatewayError> {
    let mut content = Vec::with_capacity(wire.content.len());
    for block in wire.content {
        let kind = block
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Protocol("content block missing 'type'".to_string()))?
            .to_string();
        match kind.as_str() {
            "text" | "tool_use" => {
                let parsed: ContentBlock = serde_json::from_value(block).map_err(|e| {
                    GatewayError::Protocol(format!("malformed '{}' block: {}", kind, e))
                })?;
                content.push(parsed);
            }
            "tool_result" => {
                return Err(GatewayError::Protocol(
                    "model response contained a tool_result block".to_string(),
                ));
            }
            other => {
                debug!(block_type = other, "Skipping unrecognized content block");
            }
        }
    }

    let stop_reason = match wire.stop_reason {
        Some(Value::Null) | None => None,
        Some(value) => Some(
            serde_json::from_value::<StopReason>(value)
                .map_err(|e| GatewayError::Protocol(format!("malformed stop_reason: {}", e)))?,
        ),
    };

    Ok(ModelResponse {
        content,
        stop_reason,
    })
}

#[async_trait::async_trait]
impl ModelGateway for AnthropicGateway {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(
        &self,
        messages: &[Message],
        manifest: &[ToolDefinition],
    ) -> std::result::Result<ModelResponse, GatewayError> {
        let request = WireRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: &self.system_prompt,
            tools: manifest,
            messages,
        };

        debug!(
            model = %self.config.model,
            message_count = messages.len(),
            tool_count = manifest.len(),
            "Calling completion service"
        );

        let max_attempts = self.config.max_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.send_once(&request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let wait = self.backoff_delay(attempt);
                    info!(attempt, wait_ms = wait.as_millis() as u64, error = %e, "Retrying completion call");
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Completion call failed");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gateway_with(base_url: Option<&str>) -> AnthropicGateway {
        AnthropicGateway {
            config: GatewayConfig {
                base_url: base_url.map(str::to_string),
                ..Default::default()
            },
            api_key: "test-key".to_string(),
            system_prompt: String::new(),
            client: reqwest::Client::new(),
        }
    }

    #[test]
    fn endpoint_normalization() {
        assert_eq!(
            gateway_with(None).endpoint(),
            "https://api.anthropic.com/v1/messages"
        );
        assert_eq!(
            gateway_with(Some("http://localhost:8080/")).endpoint(),
            "http://localhost:8080/v1/messages"
        );
    }

    #[test]
    fn backoff_grows_exponentially() {
        let gw = gateway_with(None);
        assert_eq!(gw.backoff_delay(1), Duration::from_millis(500));
        assert_eq!(gw.backoff_delay(2), Duration::from_millis(1000));
        assert_eq!(gw.backoff_delay(3), Duration::from_millis(2000));
    }

    #[test]
    fn request_serialization_matches_wire_contract() {
        let manifest = vec![ToolDefinition {
            name: "fetch_structure".to_string(),
            description: "Download a PDB file".to_string(),
            input_schema: json!({"type": "object", "properties": {}}),
        }];
        let messages = vec![Message::user("show me KRAS")];
        let request = WireRequest {
            model: "claude-test",
            max_tokens: 4096,
            system: "You are Proteosurf.",
            tools: &manifest,
            messages: &messages,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "claude-test");
        assert_eq!(value["max_tokens"], 4096);
        assert_eq!(value["system"], "You are Proteosurf.");
        assert_eq!(value["tools"][0]["name"], "fetch_structure");
        assert!(value["tools"][0]["input_schema"].is_object());
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"][0]["type"], "text");
    }

    #[test]
    fn empty_manifest_is_omitted_from_the_request() {
        let messages = vec![Message::user("hi")];
        let request = WireRequest {
            model: "claude-test",
            max_tokens: 1024,
            system: "",
            tools: &[],
            messages: &messages,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn parse_skips_unknown_blocks() {
        let wire = WireResponse {
            content: vec![
                json!({"type": "thinking", "thinking": "hmm"}),
                json!({"type": "text", "text": "KRAS is a GTPase."}),
            ],
            stop_reason: Some(json!("end_turn")),
        };
        let response = parse_response(wire).unwrap();
        assert_eq!(response.content, vec![ContentBlock::text("KRAS is a GTPase.")]);
        assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
    }

    #[test]
    fn parse_rejects_tool_result_from_model() {
        let wire = WireResponse {
            content: vec![json!({"type": "tool_result", "tool_use_id": "x", "content": "y"})],
            stop_reason: None,
        };
        assert!(matches!(
            parse_response(wire),
            Err(GatewayError::Protocol(_))
        ));
    }

    #[test]
    fn parse_rejects_untyped_block() {
        let wire = WireResponse {
            content: vec![json!({"text": "no type tag"})],
            stop_reason: None,
        };
        assert!(matches!(
            parse_response(wire),
            Err(GatewayError::Protocol(_))
        ));
    }
}
