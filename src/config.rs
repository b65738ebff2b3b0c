use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest echo payload that still fits in an IPv4 datagram.
pub const MAX_PAYLOAD_SIZE: usize = 65_500;

/// Probe tuning, read by the manager once per batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Microseconds between probes within a round.
    pub interval: u64,
    /// Probes per round.
    pub count: u32,
    /// Per-probe timeout in seconds.
    pub timeout: u64,
    /// Echo payload size in bytes.
    pub size: usize,
    /// Seconds to wait between rounds.
    pub wait: u64,
    pub max_store_logs: usize,
    pub max_concurrent_probes: usize,
    pub skip_cidr_first_addr: bool,
    pub skip_cidr_last_addr: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval: 1000,
            count: 4,
            timeout: 2,
            size: 56,
            wait: 1,
            max_store_logs: 100,
            max_concurrent_probes: 100,
            skip_cidr_first_addr: true,
            skip_cidr_last_addr: true,
        }
    }
}

impl ProbeConfig {
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("PingX");

        fs::create_dir_all(&config_dir)?;
        Ok(config_dir.join("config.json"))
    }

    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.count == 0 {
            return Err(ConfigError::Invalid("count must be at least 1".into()));
        }
        if self.timeout == 0 {
            return Err(ConfigError::Invalid("timeout must be at least 1 second".into()));
        }
        if self.max_store_logs == 0 {
            return Err(ConfigError::Invalid("max_store_logs must be at least 1".into()));
        }
        if self.max_concurrent_probes == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_probes must be at least 1".into(),
            ));
        }
        if self.size > MAX_PAYLOAD_SIZE {
            return Err(ConfigError::Invalid(format!(
                "size must not exceed {MAX_PAYLOAD_SIZE} bytes"
            )));
        }
        Ok(())
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_micros(self.interval)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn round_wait(&self) -> Duration {
        Duration::from_secs(self.wait)
    }

    /// Upper bound on one round of probes for a single host.
    pub fn round_budget(&self) -> Duration {
        (self.probe_timeout() + self.probe_interval()) * self.count
    }
}
