//! Configuration loading.
//!
//! Settings come from a JSON file (`settings.json`), then environment
//! variables, then command-line flags. Nothing is ever written back: all
//! session state lives in memory for the lifetime of the process.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::connection::ConnectTimeouts;
use crate::constants;

/// Name of the settings file looked up in the working and config directories.
pub const SETTINGS_FILE: &str = "settings.json";

/// Configuration for the dreamer client.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Base URL of the game server.
    pub server_url: String,
    /// Path of the SignalR hub below `server_url`.
    pub hub_path: String,
    /// Connect straight over WebSocket without the HTTP negotiate step.
    pub skip_negotiation: bool,
    /// Per-attempt dial timeout in seconds.
    pub dial_timeout_secs: u64,
    /// Overall connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Interval between keep-alive pings in seconds.
    pub keep_alive_secs: u64,
    /// Title shown on the left of the status bar.
    pub title: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "https://localhost:7277".to_string(),
            hub_path: "/test".to_string(),
            skip_negotiation: false,
            dial_timeout_secs: constants::DIAL_TIMEOUT.as_secs(),
            connect_timeout_secs: constants::CONNECT_TIMEOUT.as_secs(),
            keep_alive_secs: constants::KEEP_ALIVE_INTERVAL.as_secs(),
            title: constants::DEFAULT_TITLE.to_string(),
        }
    }
}

impl Config {
    /// Returns the platform configuration directory for dreamer, if any.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dreamer"))
    }

    /// Loads configuration with environment overrides applied.
    ///
    /// With an explicit `path` the file must exist. Otherwise `settings.json`
    /// is looked up in the working directory, then in [`Config::config_dir`];
    /// when neither exists the defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::default_settings_path() {
                Some(path) => Self::load_from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn default_settings_path() -> Option<PathBuf> {
        let local = PathBuf::from(SETTINGS_FILE);
        if local.is_file() {
            return Some(local);
        }
        Self::config_dir()
            .map(|dir| dir.join(SETTINGS_FILE))
            .filter(|path| path.is_file())
    }

    /// Reads and parses a settings file. Missing keys take their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                anyhow::anyhow!("config file not found: {}", path.display())
            } else {
                anyhow::Error::new(e).context(format!("failed to read {}", path.display()))
            }
        })?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(server_url) = lookup("DREAMER_SERVER_URL") {
            self.server_url = server_url;
        }

        if let Some(hub_path) = lookup("DREAMER_HUB_PATH") {
            self.hub_path = hub_path;
        }

        if let Some(skip) = lookup("DREAMER_SKIP_NEGOTIATION") {
            match skip.as_str() {
                "1" | "true" | "yes" => self.skip_negotiation = true,
                "0" | "false" | "no" => self.skip_negotiation = false,
                other => log::warn!("Ignoring DREAMER_SKIP_NEGOTIATION={}", other),
            }
        }
    }

    /// Full hub URL: `server_url` joined with `hub_path`.
    pub fn hub_url(&self) -> String {
        let base = self.server_url.trim_end_matches('/');
        let path = self.hub_path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{path}")
        }
    }

    /// Timeouts for the connect sequence.
    pub fn connect_timeouts(&self) -> ConnectTimeouts {
        ConnectTimeouts {
            dial: Duration::from_secs(self.dial_timeout_secs),
            overall: Duration::from_secs(self.connect_timeout_secs),
        }
    }

    /// Keep-alive ping interval.
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs.max(1))
    }
}
