// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Configuration is read from `~/.config/turno/config.toml` (or `--config`)
//! and includes:
//! - `base_url`: Root of the ticket API
//! - `token`: Optional bearer token
//! - `[push]`: Push stream and reconnection settings
//!
//! `TURNO_BASE_URL` and `TURNO_TOKEN` override the file.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

const CONFIG_DIR_NAME: &str = "turno";
const CONFIG_FILE_NAME: &str = "config.toml";

pub const ENV_BASE_URL: &str = "TURNO_BASE_URL";
pub const ENV_TOKEN: &str = "TURNO_TOKEN";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Root URL of the ticket API, e.g. `http://localhost:8080/api`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token sent with every request.
    #[serde(default)]
    pub token: Option<String>,
    /// Per-request timeout in seconds (default: 10).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Background refresh period in seconds (default: 30). 0 = disabled.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Write logs to this file instead of stderr.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub push: PushConfig,
}

/// Push stream configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PushConfig {
    /// Whether `watch` subscribes to the push stream (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Event name that signals a queue change (default: "queue-changed").
    #[serde(default = "default_event_name")]
    pub event_name: String,
    /// Maximum reconnection attempts before giving up (default: 0 = unlimited).
    #[serde(default)]
    pub max_retries: u32,
    /// Initial delay for exponential backoff in milliseconds (default: 500).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Maximum delay between reconnection attempts in seconds (default: 30).
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_refresh_interval_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_event_name() -> String {
    "queue-changed".to_string()
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_secs() -> u64 {
    30
}

impl Default for PushConfig {
    fn default() -> Self {
        PushConfig {
            enabled: true,
            event_name: default_event_name(),
            max_retries: 0,
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: default_base_url(),
            token: None,
            request_timeout_secs: default_request_timeout_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
            log_file: None,
            push: PushConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config {}: {}", path.display(), e)))
    }

    /// Loads the effective configuration.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used when present and built-in defaults otherwise. Environment
    /// overrides are applied last, then the result is validated.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Config::load(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Config::load(&path)?,
                _ => Config::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies `TURNO_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(token) = lookup(ENV_TOKEN) {
            let token = token.trim().to_string();
            self.token = if token.is_empty() { None } else { Some(token) };
        }
    }

    /// Checks values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "invalid base_url '{}'\n  hint: the ticket API URL must start with http:// or https://",
                self.base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.push.event_name.trim().is_empty() {
            return Err(Error::Config("push.event_name must not be empty".to_string()));
        }
        if self.push.initial_delay_ms == 0 {
            return Err(Error::Config(
                "push.initial_delay_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Background refresh period; `None` when disabled.
    pub fn refresh_interval(&self) -> Option<Duration> {
        match self.refresh_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Default config file location, e.g. `~/.config/turno/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
