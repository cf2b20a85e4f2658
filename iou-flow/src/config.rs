//! Configuration for the agreement protocol

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Protocol configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// How long a session wait may block before the instance aborts (ms)
    pub session_timeout_ms: u64,

    /// Per-session channel capacity
    pub session_buffer: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            session_timeout_ms: 5_000,
            session_buffer: 32,
        }
    }
}

impl FlowConfig {
    /// Session wait timeout as a [`Duration`]
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FlowConfig = toml::from_str(&content)
            .map_err(|e| crate::FlowError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = FlowConfig::default();

        if let Ok(timeout) = std::env::var("IOU_SESSION_TIMEOUT_MS") {
            config.session_timeout_ms = timeout
                .parse()
                .map_err(|e| crate::FlowError::Config(format!("Invalid timeout: {}", e)))?;
        }

        if let Ok(buffer) = std::env::var("IOU_SESSION_BUFFER") {
            config.session_buffer = buffer
                .parse()
                .map_err(|e| crate::FlowError::Config(format!("Invalid buffer size: {}", e)))?;
        }

        Ok(config)
    }
}
