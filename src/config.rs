use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/auth/";
pub const BASE_URL_ENV: &str = "PINBOARD_BASE_URL";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_ping_interval() -> u64 {
    6
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PinboardConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
    #[serde(default)]
    pub debug_logging: bool,
}

impl Default for PinboardConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ping_interval_secs: default_ping_interval(),
            debug_logging: false,
        }
    }
}

impl PinboardConfig {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("pinboard")
            .join("config.json")
    }

    /// Reads the config file. A missing or unreadable file yields defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Applies `PINBOARD_BASE_URL` when set and non-empty.
    pub fn with_env_override(mut self) -> Self {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            self.apply_base_url_override(&url);
        }
        self
    }

    fn apply_base_url_override(&mut self, url: &str) {
        let url = url.trim();
        if !url.is_empty() {
            self.base_url = url.to_string();
        }
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(1))
    }

    /// Session-scope token file; gone after reboot where a runtime dir exists.
    pub fn session_path(&self) -> PathBuf {
        dirs::runtime_dir()
            .or_else(dirs::cache_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join("pinboard")
            .join("session.json")
    }

    /// Keyring attribute for the remembered token.
    pub fn keyring_server(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }
}
