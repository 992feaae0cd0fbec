//! Sentinel Configuration - monitor timing, retention, recovery mapping and probes
//!
//! Each struct implements `Default` with the values in [`super::defaults`],
//! so a missing config file behaves exactly like an empty one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults;
use crate::types::{Component, RecoveryAction};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "SENTINEL_CONFIG";

/// File looked up in the working directory when no path is given.
pub const LOCAL_CONFIG_FILE: &str = "sentinel.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a sentinel deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// Check loop timing and in-memory retention
    #[serde(default)]
    pub monitor: MonitorSettings,

    /// HTTP status API
    #[serde(default)]
    pub server: ServerConfig,

    /// Component → remediation overrides
    #[serde(default)]
    pub recovery: RecoveryConfig,

    /// Component → `host:port` for TCP probes
    #[serde(default)]
    pub probes: BTreeMap<Component, String>,
}

impl SentinelConfig {
    /// Load configuration using the standard search order:
    /// 1. `explicit` path (from the CLI)
    /// 2. `$SENTINEL_CONFIG`
    /// 3. `./sentinel.toml`
    /// 4. Built-in defaults
    ///
    /// An explicit path that fails to load is an error; the implicit
    /// locations only warn and fall through.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::load_from_file(path)?;
            info!(path = %path.display(), "Loaded sentinel config");
            return Ok(config);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded sentinel config from {}", CONFIG_ENV_VAR);
                        return Ok(config);
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded sentinel config from ./{}", LOCAL_CONFIG_FILE);
                    return Ok(config);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No sentinel.toml found, using built-in defaults");
        Ok(Self::default())
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Reject values the monitor cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.monitor;
        let mut errors = Vec::new();

        if m.check_interval_secs == 0 {
            errors.push("monitor.check_interval_secs must be > 0".to_string());
        }
        if m.probe_timeout_ms == 0 {
            errors.push("monitor.probe_timeout_ms must be > 0".to_string());
        }
        if m.recovery_timeout_secs == 0 {
            errors.push("monitor.recovery_timeout_secs must be > 0".to_string());
        }
        if m.recent_checks_retention == 0 {
            errors.push("monitor.recent_checks_retention must be > 0".to_string());
        }
        if m.recovery_log_retention == 0 {
            errors.push("monitor.recovery_log_retention must be > 0".to_string());
        }
        if m.recent_failures_window == 0 {
            errors.push("monitor.recent_failures_window must be > 0".to_string());
        }
        for (component, addr) in &self.probes {
            if addr.trim().is_empty() {
                errors.push(format!("probes.{component}: address must not be empty"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Monitor Settings
// ============================================================================

/// Timing and retention for the monitor loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Seconds between check rounds.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Per-probe time limit (ms).
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,

    /// Per-recovery time limit (seconds).
    #[serde(default = "default_recovery_timeout")]
    pub recovery_timeout_secs: u64,

    #[serde(default = "default_recent_checks_retention")]
    pub recent_checks_retention: usize,

    #[serde(default = "default_recovery_log_retention")]
    pub recovery_log_retention: usize,

    /// Most recent checks scanned for failures in the pipeline status.
    #[serde(default = "default_recent_failures_window")]
    pub recent_failures_window: usize,
}

fn default_check_interval() -> u64 {
    defaults::CHECK_INTERVAL_SECS
}

fn default_probe_timeout() -> u64 {
    defaults::PROBE_TIMEOUT_MS
}

fn default_recovery_timeout() -> u64 {
    defaults::RECOVERY_TIMEOUT_SECS
}

fn default_recent_checks_retention() -> usize {
    defaults::RECENT_CHECKS_RETENTION
}

fn default_recovery_log_retention() -> usize {
    defaults::RECOVERY_LOG_RETENTION
}

fn default_recent_failures_window() -> usize {
    defaults::RECENT_FAILURES_WINDOW
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            probe_timeout_ms: default_probe_timeout(),
            recovery_timeout_secs: default_recovery_timeout(),
            recent_checks_retention: default_recent_checks_retention(),
            recovery_log_retention: default_recovery_log_retention(),
            recent_failures_window: default_recent_failures_window(),
        }
    }
}

impl MonitorSettings {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: default_server_addr() }
    }
}

// ============================================================================
// Recovery
// ============================================================================

/// Overrides applied on top of each component's default remediation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecoveryConfig {
    #[serde(default)]
    pub actions: BTreeMap<Component, RecoveryAction>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}
