//! CLI configuration management.
//!
//! Settings are read from `~/.config/datadrop/config.json`
//! (`%APPDATA%\datadrop\config.json` on Windows). Missing fields take their
//! defaults and command-line flags override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use datadrop_protocol::DEFAULT_RETENTION_HOURS;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// Contents of `datadrop/config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Server base URL.
    pub server_url: String,

    /// Retention time preselected for new datasets, in hours.
    pub retention_hours: u32,

    /// Delay between status queries after the upload.
    pub poll_interval_ms: u64,

    /// Per-request timeout; unset leaves requests unbounded.
    pub request_timeout_secs: Option<u64>,

    /// Chunk size used instead of the server's, in bytes.
    pub chunk_size_override: Option<u64>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".into(),
            retention_hours: DEFAULT_RETENTION_HOURS,
            poll_interval_ms: 1000,
            request_timeout_secs: None,
            chunk_size_override: None,
        }
    }
}

impl CliConfig {
    /// Loads the configuration from the default location.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Loads the configuration from `path`.
    ///
    /// A missing file yields the defaults; an unparsable one is reported
    /// and ignored.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<CliConfig>(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "configuration loaded");
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config, using defaults"
                );
                Ok(Self::default())
            }
        }
    }
}

/// Effective settings after applying command-line overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub retention_hours: u32,
    pub poll_interval: Duration,
    pub request_timeout: Option<Duration>,
    pub chunk_size_override: Option<u64>,
}

impl Settings {
    pub fn resolve(cli: &Cli, config: CliConfig) -> Self {
        Self {
            server_url: cli.server.clone().unwrap_or(config.server_url),
            retention_hours: cli.retention.unwrap_or(config.retention_hours),
            poll_interval: Duration::from_millis(
                cli.poll_interval_ms.unwrap_or(config.poll_interval_ms),
            ),
            request_timeout: config.request_timeout_secs.map(Duration::from_secs),
            chunk_size_override: cli.chunk_size.or(config.chunk_size_override),
        }
    }
}

fn config_path() -> anyhow::Result<PathBuf> {
    let config_dir = config_base_dir()?;
    Ok(config_dir.join("datadrop").join("config.json"))
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config"))
    }
}
