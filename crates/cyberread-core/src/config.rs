//! Application configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! includes the API base URL, request timeouts, the session inactivity
//! policy and the last used login email.
//!
//! Configuration is stored at `~/.config/cyberread/config.json`. The API URL
//! can be overridden with the `CYBERREAD_API_URL` environment variable.

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
const APP_NAME: &str = "cyberread";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the API base URL
pub const API_URL_ENV: &str = "CYBERREAD_API_URL";

const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// The remote logout is best-effort, so it gets a much shorter leash.
const DEFAULT_LOGOUT_TIMEOUT_SECS: u64 = 5;

/// Sessions expire after 30 minutes without user activity.
const DEFAULT_INACTIVITY_TIMEOUT_MINUTES: i64 = 30;

/// How often the activity monitor checks for expiry.
const DEFAULT_EXPIRY_CHECK_INTERVAL_SECS: u64 = 60;

/// Minimum spacing between persisted activity timestamps.
const DEFAULT_ACTIVITY_WRITE_INTERVAL_SECS: i64 = 5;

/// Upper bounds for hand-edited timing values. Larger values are clamped.
const MAX_INACTIVITY_TIMEOUT_MINUTES: i64 = 60 * 24 * 365;
const MAX_INTERVAL_SECS: u64 = 60 * 60 * 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub logout_timeout_secs: u64,
    pub inactivity_timeout_minutes: i64,
    pub expiry_check_interval_secs: u64,
    pub activity_write_interval_secs: i64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            logout_timeout_secs: DEFAULT_LOGOUT_TIMEOUT_SECS,
            inactivity_timeout_minutes: DEFAULT_INACTIVITY_TIMEOUT_MINUTES,
            expiry_check_interval_secs: DEFAULT_EXPIRY_CHECK_INTERVAL_SECS,
            activity_write_interval_secs: DEFAULT_ACTIVITY_WRITE_INTERVAL_SECS,
            last_email: None,
        }
    }
}

impl Config {
    /// Load from the default location and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted session record.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.request_timeout_secs.clamp(1, MAX_INTERVAL_SECS))
    }

    /// Timing policy from the config. Out-of-range values are clamped
    /// rather than rejected, so a bad hand edit can't stop the client.
    pub fn session_settings(&self) -> SessionSettings {
        let inactivity_minutes = self
            .inactivity_timeout_minutes
            .clamp(1, MAX_INACTIVITY_TIMEOUT_MINUTES);
        let write_secs = self
            .activity_write_interval_secs
            .clamp(0, MAX_INTERVAL_SECS as i64);
        let defaults = SessionSettings::fallback();

        SessionSettings {
            inactivity_timeout: Duration::try_minutes(inactivity_minutes)
                .unwrap_or(defaults.inactivity_timeout),
            expiry_check_interval: StdDuration::from_secs(
                self.expiry_check_interval_secs.clamp(1, MAX_INTERVAL_SECS),
            ),
            activity_write_interval: Duration::try_seconds(write_secs)
                .unwrap_or(defaults.activity_write_interval),
            logout_timeout: StdDuration::from_secs(
                self.logout_timeout_secs.clamp(1, MAX_INTERVAL_SECS),
            ),
        }
    }
}

/// Timing policy for the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub inactivity_timeout: Duration,
    pub expiry_check_interval: StdDuration,
    pub activity_write_interval: Duration,
    pub logout_timeout: StdDuration,
}

impl SessionSettings {
    fn fallback() -> Self {
        Self {
            inactivity_timeout: Duration::minutes(DEFAULT_INACTIVITY_TIMEOUT_MINUTES),
            expiry_check_interval: StdDuration::from_secs(DEFAULT_EXPIRY_CHECK_INTERVAL_SECS),
            activity_write_interval: Duration::seconds(DEFAULT_ACTIVITY_WRITE_INTERVAL_SECS),
            logout_timeout: StdDuration::from_secs(DEFAULT_LOGOUT_TIMEOUT_SECS),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Config::default().session_settings()
    }
}
