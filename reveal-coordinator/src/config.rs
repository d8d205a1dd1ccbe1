//! Coordinator configuration

use crate::error::{CoordinatorError, CoordinatorResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Attestation domain of the development registry.
pub const DEV_DOMAIN: [u8; 32] = *b"rarity-registry:development:v1.0";

/// Retry, timeout and domain settings for a [`crate::RevealCoordinator`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Deadline for a single oracle round trip (milliseconds)
    pub oracle_timeout_ms: u64,
    /// Oracle attempts per reveal, first one included
    pub max_oracle_attempts: u32,
    /// Base delay between oracle attempts, multiplied by the attempt number
    pub retry_backoff_ms: u64,
    /// Deadline for `observe_reveal` (milliseconds)
    pub observe_timeout_ms: u64,
    /// Registry deployment the attestations are scoped to (hex in JSON)
    #[serde(with = "hex::serde")]
    pub domain: [u8; 32],
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            oracle_timeout_ms: 5_000,
            max_oracle_attempts: 3,
            retry_backoff_ms: 200,
            observe_timeout_ms: 30_000,
            domain: DEV_DOMAIN,
        }
    }
}

impl CoordinatorConfig {
    /// Load from a JSON file. Missing fields take their default.
    pub fn from_json_file(path: impl AsRef<Path>) -> CoordinatorResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CoordinatorError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> CoordinatorResult<Self> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| CoordinatorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CoordinatorResult<()> {
        if self.max_oracle_attempts == 0 {
            return Err(CoordinatorError::Config("max_oracle_attempts must be at least 1".into()));
        }
        if self.oracle_timeout_ms == 0 {
            return Err(CoordinatorError::Config("oracle_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }

    pub fn observe_timeout(&self) -> Duration {
        Duration::from_millis(self.observe_timeout_ms)
    }

    /// Delay before attempt `attempt + 1`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(attempt as u64))
    }
}
