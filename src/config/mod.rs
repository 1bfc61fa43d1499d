//! Service configuration stored as TOML.
//!
//! Every field is optional in the file; missing fields take the defaults in
//! [`crate::consts`]. Command-line flags override file values.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_BIND, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT,
    DEFAULT_STEP_TIMEOUT_SECS,
};
use crate::handlers::HandlerSettings;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Address to listen on.
    pub bind: String,

    pub port: u16,

    /// Upper bound on one script step.
    pub step_timeout_secs: u64,

    /// Connect timeout for TCP probes and outbound HTTP.
    pub connect_timeout_secs: u64,

    /// Largest request body accepted.
    pub max_body_bytes: usize,

    /// Directory served as the site root, if any.
    pub static_dir: Option<PathBuf>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            step_timeout_secs: DEFAULT_STEP_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            static_dir: None,
        }
    }
}

impl ProbeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bind.trim().is_empty() {
            return Err(anyhow!("bind must not be empty"));
        }
        if self.step_timeout_secs == 0 {
            return Err(anyhow!("step_timeout_secs must be > 0"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(anyhow!("connect_timeout_secs must be > 0"));
        }
        if self.max_body_bytes == 0 {
            return Err(anyhow!("max_body_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    pub fn handler_settings(&self) -> HandlerSettings {
        HandlerSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ProbeConfig::default()`.
pub fn load_config(path: &Path) -> Result<ProbeConfig> {
    if !path.exists() {
        return Ok(ProbeConfig::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: ProbeConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// Resolve the config to use: an explicit path must exist; otherwise the
/// default location is used if present.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ProbeConfig> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(anyhow!("config file {} does not exist", path.display()));
            }
            load_config(path)
        }
        None => match crate::consts::default_config_path() {
            Some(path) => load_config(&path),
            None => Ok(ProbeConfig::default()),
        },
    }
}
