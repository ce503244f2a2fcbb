//! Graph configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for a [`Graph`](crate::graph::Graph).
///
/// Every field has a default, so a partial JSON document such as
/// `{"check_interval_ms": 250}` is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Heartbeat window in milliseconds. A vertex not refreshed within this
    /// window decays to unhealthy on the next health cycle.
    pub check_interval_ms: u64,

    /// Number of vertex slots preallocated in the store.
    pub initial_capacity: usize,
}

impl GraphConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "check_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 5_000,
            initial_capacity: 1_000,
        }
    }
}
