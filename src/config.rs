// Configuration loading.
// Reads config.json from the platform config directory, with an env override for the API URL.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::state::{DEFAULT_RESULTS_FRESH_FOR, DEFAULT_STALE_AFTER, Policy};
use crate::storage::paths;

pub const API_URL_ENV: &str = "RESUME_TAILOR_API_URL";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Backend root. `/api` is added by the client when missing.
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub stale_after_secs: u64,
    pub results_fresh_for_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            stale_after_secs: DEFAULT_STALE_AFTER.as_secs(),
            results_fresh_for_secs: DEFAULT_RESULTS_FRESH_FOR.as_secs(),
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults, then apply
    /// the environment override.
    pub fn load() -> Result<Self> {
        let config = match paths::config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        Ok(config.apply_api_url_override(std::env::var(API_URL_ENV).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading config");
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Replace the API URL when an override is set and non-blank.
    pub fn apply_api_url_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn policy(&self) -> Policy {
        Policy {
            stale_after: Duration::from_secs(self.stale_after_secs),
            results_fresh_for: Duration::from_secs(self.results_fresh_for_secs),
        }
    }
}
