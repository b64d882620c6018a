use crate::error::Result;
use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BINARY: &str = "speedtest";
pub const DEFAULT_LOG_FILE: &str = "/usr/local/opnsense/scripts/OPNsense/speedtest/speedtest.csv";
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Runtime settings, handed to every component explicitly.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Speed test executable, resolved through PATH
    pub binary: String,
    /// CSV log of every completed run
    pub log_file: PathBuf,
    /// Maximum number of entries in history mode
    pub history_limit: usize,
    /// Upper bound for one binary invocation; `None` waits forever
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            history_limit: DEFAULT_HISTORY_LIMIT,
            timeout_secs: None,
        }
    }
}

impl Config {
    /// Load the configuration
    /// Strategy:
    /// 1. An explicit path (`--config`) must exist and parse
    /// 2. Otherwise try the user config (~/.config/speedlog/config.toml)
    /// 3. Fallback to built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Some(proj_dirs) = ProjectDirs::from("", "", "speedlog") {
            let config_path = proj_dirs.config_dir().join("config.toml");
            if config_path.exists() {
                tracing::debug!("Loading config from {:?}", config_path);
                return Self::from_file(&config_path);
            }
        }

        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
