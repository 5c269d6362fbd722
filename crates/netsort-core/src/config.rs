//! Tuning configuration for a netsort node.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $NETSORT_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/netsort/config.toml
//!   3. ~/.config/netsort/config.toml
//!
//! A missing file is not an error. The cluster topology is separate and
//! lives in its own YAML file (see `topology`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetsortConfig {
    pub network: NetworkConfig,
    pub io: IoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Pause between failed dial attempts.
    pub dial_backoff_ms: u64,
    /// Give up dialing a peer after this many failures. 0 = never give up.
    pub max_dial_attempts: u32,
    /// Per-read timeout on inbound streams. 0 = wait forever.
    pub read_timeout_secs: u64,
    /// Set TCP_NODELAY on outbound streams.
    pub nodelay: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    /// Buffer size for outbound streams and the output file.
    pub write_buffer_bytes: usize,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            dial_backoff_ms: 250,
            // 2400 × 250ms ≈ 10 minutes for the slowest peer to come up
            max_dial_attempts: 2400,
            read_timeout_secs: 0,
            nodelay: false,
        }
    }
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            write_buffer_bytes: 64 * 1024,
        }
    }
}

impl NetworkConfig {
    pub fn dial_backoff(&self) -> Duration {
        Duration::from_millis(self.dial_backoff_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_secs > 0).then(|| Duration::from_secs(self.read_timeout_secs))
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("netsort")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl NetsortConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            NetsortConfig::default()
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("NETSORT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Apply NETSORT_* overrides. Unparseable values are ignored.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("NETSORT_NETWORK__DIAL_BACKOFF_MS").and_then(|v| v.parse().ok()) {
            self.network.dial_backoff_ms = v;
        }
        if let Some(v) = var("NETSORT_NETWORK__MAX_DIAL_ATTEMPTS").and_then(|v| v.parse().ok()) {
            self.network.max_dial_attempts = v;
        }
        if let Some(v) = var("NETSORT_NETWORK__READ_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.network.read_timeout_secs = v;
        }
        if let Some(v) = var("NETSORT_NETWORK__NODELAY") {
            self.network.nodelay = v == "true" || v == "1";
        }
        if let Some(v) = var("NETSORT_IO__WRITE_BUFFER_BYTES").and_then(|v| v.parse().ok()) {
            self.io.write_buffer_bytes = v;
        }
    }
}
