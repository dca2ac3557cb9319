//! # Runtime Configuration Module
//!
//! Settings loaded from environment variables or a YAML file.
//!
//! ## Environment Variables
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `HEADWAY_PREFLIGHT` | Answer `HEAD` from the matching non-HEAD route (`true`/`1`/`yes`/`on`) | `false` |
//! | `HEADWAY_LOG_LEVEL` | `trace`, `debug`, `info`, `warn` or `error` | `info` |
//! | `HEADWAY_LOG_FORMAT` | `json` or `pretty` | `json` |
//! | `HEADWAY_LOG_FILTER` | Extra comma separated `EnvFilter` directives | none |
//!
//! `RUST_LOG`, when set, takes precedence over `HEADWAY_LOG_LEVEL`.
//!
//! ## YAML
//!
//! ```yaml
//! preflight: true
//! log:
//!   level: debug
//!   format: pretty
//! ```

use std::env;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;

/// Runtime settings for an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub preflight: bool,
    pub log: LogConfig,
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let preflight = lookup("HEADWAY_PREFLIGHT")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);
        RuntimeConfig {
            preflight,
            log: LogConfig::from_lookup(&lookup),
        }
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse runtime configuration")
    }

    /// Read and parse a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&contents)
    }
}

pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
