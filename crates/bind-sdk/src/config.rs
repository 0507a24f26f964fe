//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::SdkError;

/// Chain client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// RPC endpoint URL
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Chain ID; fetched from the node when absent
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// Live feed polling interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Capacity of each subscription's delivery channel
    #[serde(default = "default_subscription_buffer")]
    pub subscription_buffer: usize,
    /// Per-request timeout
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Default wait for a transaction receipt
    #[serde(default = "default_confirmation_timeout_ms")]
    pub confirmation_timeout_ms: u64,
}

fn default_rpc_url() -> String {
    "http://localhost:8545".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_subscription_buffer() -> usize {
    256
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_confirmation_timeout_ms() -> u64 {
    120_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            chain_id: None,
            poll_interval_ms: default_poll_interval_ms(),
            subscription_buffer: default_subscription_buffer(),
            request_timeout_ms: default_request_timeout_ms(),
            confirmation_timeout_ms: default_confirmation_timeout_ms(),
        }
    }
}

impl ClientConfig {
    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, SdkError> {
        let config: Self = toml::from_str(content).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SdkError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, SdkError> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// Reject values the client cannot run with
    pub fn validate(&self) -> Result<(), SdkError> {
        if self.chain_id == Some(0) {
            return Err(SdkError::Config("chain_id must be non-zero".to_string()));
        }
        if self.subscription_buffer == 0 {
            return Err(SdkError::Config("subscription_buffer must be at least 1".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(SdkError::Config("poll_interval_ms must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Live feed polling interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Default wait for a transaction receipt
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }
}
