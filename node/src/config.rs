//! Node configuration file (`helio.toml`).
//!
//! ```toml
//! [chain]
//! publisher_key = "02ab..."
//! max_future_drift_secs = 60
//!
//! [log]
//! level = "helio_node=info,helio_protocol=info"
//! format = "pretty"
//! ```
//!
//! Every field is optional. A missing file means all defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use helio_protocol::config::ChainConfig;

use crate::logging::LogFormat;

/// File name looked up inside the data directory.
pub const CONFIG_FILE_NAME: &str = "helio.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub chain: ChainConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "helio_node=info,helio_protocol=info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl NodeConfig {
    /// Where the config lives: the explicit path, or `helio.toml` under
    /// `data_dir`.
    pub fn path(explicit: Option<&Path>, data_dir: &Path) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_dir.join(CONFIG_FILE_NAME))
    }

    /// Load from `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, text)
            .with_context(|| format!("failed to write config {}", path.display()))
    }
}
