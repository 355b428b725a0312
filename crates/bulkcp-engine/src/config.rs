//! Engine configuration
//!
//! Engine-wide defaults for job tunables plus the scheduler parallelism.
//! Values can come from code, from a TOML file, or stay at their defaults;
//! individual jobs override them through their configuration bag.

use crate::job::RetryPolicy;
use bulkcp_types::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Engine-wide configuration and per-job defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Number of jobs run concurrently
    pub parallel: usize,
    /// Default bytes per transfer chunk
    pub chunk_size: usize,
    /// Default maximum reads in flight within one job
    pub parallel_chunks: usize,
    /// Default striping block size
    pub block_size: u64,
    /// Default transient-failure retry budget per job
    pub retry_count: u32,
    /// Default retry policy
    pub retry_policy: RetryPolicy,
    /// Default open-phase timeout in seconds, zero disables
    pub init_timeout_secs: u64,
    /// Default third-party transfer timeout in seconds, zero disables
    pub tpc_timeout_secs: u64,
    /// Default per-chunk timeout in seconds, zero disables
    pub copy_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: 1,
            chunk_size: 8 * 1024 * 1024,
            parallel_chunks: 4,
            block_size: 1024 * 1024,
            retry_count: 0,
            retry_policy: RetryPolicy::default(),
            init_timeout_secs: 0,
            tpc_timeout_secs: 0,
            copy_timeout_secs: 0,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| Error::config(format!("invalid engine configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::config(format!(
                "cannot read configuration file '{}': {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_toml_str(&text)
    }

    /// Check the configuration's invariants
    pub fn validate(&self) -> Result<()> {
        if self.parallel == 0 {
            return Err(Error::config("parallel must be at least one"));
        }
        if self.chunk_size == 0 {
            return Err(Error::config("chunk_size must be greater than zero"));
        }
        if self.parallel_chunks == 0 {
            return Err(Error::config("parallel_chunks must be at least one"));
        }
        if self.block_size == 0 {
            return Err(Error::config("block_size must be greater than zero"));
        }
        Ok(())
    }

    /// Open-phase timeout as a duration
    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_secs)
    }

    /// Third-party transfer timeout as a duration
    pub fn tpc_timeout(&self) -> Duration {
        Duration::from_secs(self.tpc_timeout_secs)
    }

    /// Per-chunk timeout as a duration
    pub fn copy_timeout(&self) -> Duration {
        Duration::from_secs(self.copy_timeout_secs)
    }
}
