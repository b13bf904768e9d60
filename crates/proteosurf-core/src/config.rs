//! Configuration management for Proteosurf
//!
//! Handles loading, saving, and managing application configuration
//! including the completion-service credentials and loop limits.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Completion-service settings
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Conversation loop limits
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Settings for the completion-service gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,
    /// API key; falls back to `ANTHROPIC_API_KEY` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Override for the completion endpoint (testing, proxies)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Output-token ceiling per model call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Bounded retry count for transient gateway failures
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Whole-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_max_retries() -> usize {
    2
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            max_retries: default_max_retries(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl GatewayConfig {
    /// Resolve the API key from config or environment
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()))
    }
}

/// Limits applied to every conversation turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum model/tool rounds per user message
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
    /// Truncation cap for results streamed to the consumer (bytes)
    #[serde(default = "default_stream_cap")]
    pub stream_result_cap: usize,
    /// Truncation cap for results re-injected into the model context (bytes)
    #[serde(default = "default_model_cap")]
    pub model_result_cap: usize,
    /// Per-tool execution timeout in seconds; None disables the timeout
    #[serde(default = "default_tool_timeout", skip_serializing_if = "Option::is_none")]
    pub tool_timeout_secs: Option<u64>,
}

fn default_max_rounds() -> usize {
    10
}

fn default_stream_cap() -> usize {
    2000
}

fn default_model_cap() -> usize {
    4000
}

fn default_tool_timeout() -> Option<u64> {
    Some(300)
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            stream_result_cap: default_stream_cap(),
            model_result_cap: default_model_cap(),
            tool_timeout_secs: default_tool_timeout(),
        }
    }
}

impl LimitsConfig {
    /// The truncation caps as a single policy value
    pub fn truncation_caps(&self) -> crate::formatting::TruncationCaps {
        crate::formatting::TruncationCaps {
            stream: self.stream_result_cap,
            model: self.model_result_cap,
        }
    }

    /// The per-tool timeout as a duration
    pub fn tool_timeout(&self) -> Option<std::time::Duration> {
        self.tool_timeout_secs.map(std::time::Duration::from_secs)
    }
}

/// Manages loading and saving configuration from disk
pub struct ConfigManager {
    config: Config,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a manager backed by the default config path
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::with_path(config_path)
    }

    /// Create a manager backed by a specific config file
    pub fn with_path(config_path: PathBuf) -> Result<Self> {
        let config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            Config::default()
        };
        Ok(Self {
            config,
            config_path,
        })
    }

    /// Default location: `~/.config/proteosurf/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
        Ok(base.join("proteosurf").join("config.toml"))
    }

    fn load_from(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Access the loaded configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable access to the loaded configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Persist the configuration to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| Error::Config(format!("Could not serialize config: {}", e)))?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }
}
