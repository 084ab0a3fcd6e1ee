//! Configuration schema for the meadow pipeline.

use serde::{Deserialize, Serialize};

/// Root config for the agent synchronization pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MeadowConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub model: ModelLimitsConfig,
    #[serde(default)]
    pub script: ScriptConfig,
    #[serde(default)]
    pub observation: ObservationConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl MeadowConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> MeadowConfigBuilder {
        MeadowConfigBuilder::new()
    }
}

/// Builder for assembling a `MeadowConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct MeadowConfigBuilder {
    config: MeadowConfig,
}

impl MeadowConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: MeadowConfig::default(),
        }
    }

    /// Replace the decision-service configuration.
    pub fn service(mut self, service: ServiceConfig) -> Self {
        self.config.service = service;
        self
    }

    /// Replace the model limits configuration.
    pub fn model(mut self, model: ModelLimitsConfig) -> Self {
        self.config.model = model;
        self
    }

    /// Replace the script sandbox configuration.
    pub fn script(mut self, script: ScriptConfig) -> Self {
        self.config.script = script;
        self
    }

    /// Replace the observation configuration.
    pub fn observation(mut self, observation: ObservationConfig) -> Self {
        self.config.observation = observation;
        self
    }

    /// Replace the sync lifecycle configuration.
    pub fn sync(mut self, sync: SyncConfig) -> Self {
        self.config.sync = sync;
        self
    }

    /// Finalize and return the built `MeadowConfig`.
    pub fn build(self) -> MeadowConfig {
        self.config
    }
}

/// Decision-service transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base endpoint of the remote decision service.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:5002".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Context-window limits for the model behind the decision service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelLimitsConfig {
    /// Model identifier used for tokenizer lookup.
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Maximum context size in tokens.
    #[serde(default = "default_max_token_count")]
    pub max_token_count: usize,
    /// Tokens reserved for model output when assembling prompts.
    #[serde(default = "default_reserved_output_tokens")]
    pub reserved_output_tokens: usize,
}

impl Default for ModelLimitsConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            max_token_count: default_max_token_count(),
            reserved_output_tokens: default_reserved_output_tokens(),
        }
    }
}

fn default_model_id() -> String {
    "gpt-4o".to_string()
}

fn default_max_token_count() -> usize {
    128_000
}

fn default_reserved_output_tokens() -> usize {
    4_096
}

/// Script sandbox configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Grace period in seconds between requesting cancellation of a running
    /// script and force-stopping it.
    #[serde(default = "default_cancel_grace_secs")]
    pub cancel_grace_secs: f64,
    /// Poll interval in milliseconds while waiting for a script to unwind.
    #[serde(default = "default_cancel_poll_ms")]
    pub cancel_poll_ms: u64,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            cancel_grace_secs: default_cancel_grace_secs(),
            cancel_poll_ms: default_cancel_poll_ms(),
        }
    }
}

fn default_cancel_grace_secs() -> f64 {
    5.0
}

fn default_cancel_poll_ms() -> u64 {
    100
}

/// Observation aggregation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationConfig {
    /// Default observation distance for newly attached agents.
    #[serde(default = "default_observation_distance")]
    pub default_observation_distance: f64,
    /// Spoken messages older than this (simulation-time units) are never
    /// reported, even if unseen.
    #[serde(default = "default_message_retention_time")]
    pub message_retention_time: f64,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            default_observation_distance: default_observation_distance(),
            message_retention_time: default_message_retention_time(),
        }
    }
}

fn default_observation_distance() -> f64 {
    50.0
}

fn default_message_retention_time() -> f64 {
    15.0
}

/// Sync lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Minimum simulation-time interval between sync cycles per agent.
    #[serde(default = "default_sync_interval")]
    pub interval: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: default_sync_interval(),
        }
    }
}

fn default_sync_interval() -> f64 {
    2.0
}
