//! Typed configuration from environment variables or TOML.
//!
//! Every field is optional; an engine built from `Config::default()` behaves
//! like a plain broker stand-in with hooks off and FIFO enqueue.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

pub const HOOKS_VAR: &str = "QUEUE_DOUBLE_HOOKS";
pub const ENQUEUE_FRONT_VAR: &str = "QUEUE_DOUBLE_ENQUEUE_FRONT";
pub const LOG_LEVEL_VAR: &str = "QUEUE_DOUBLE_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Run lifecycle hooks around enqueue and perform.
    pub hooks_enabled: bool,
    /// Prepend new payloads instead of appending them.
    pub enqueue_front: bool,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hooks_enabled: false,
            enqueue_front: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            hooks_enabled: flag_var(HOOKS_VAR)?.unwrap_or(defaults.hooks_enabled),
            enqueue_front: flag_var(ENQUEUE_FRONT_VAR)?.unwrap_or(defaults.enqueue_front),
            log_level: std::env::var(LOG_LEVEL_VAR).unwrap_or(defaults.log_level),
        })
    }

    /// Read a `.env` file if there is one, then load from the environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("bad config: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("bad config {}: {e}", path.display())))
    }
}

fn flag_var(name: &str) -> Result<Option<bool>> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" | "" => Ok(Some(false)),
        other => Err(Error::Config(format!(
            "{name} must be a boolean, got {other:?}"
        ))),
    }
}
