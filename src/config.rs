//! TOML configuration for the logdash dashboard.
//!
//! Every section has defaults, so an empty file (or no file at all) yields a
//! dashboard pointed at a local API on port 8000.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::DashboardParams;
use crate::model::Credentials;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "LOGDASH_CONFIG";
/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "LOGDASH_API_URL";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub dashboard: ViewConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DashboardConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded dashboard configuration");
        Ok(config)
    }

    /// Resolve configuration, in order:
    /// 1. `explicit` (from `--config`), which must load.
    /// 2. The path in `LOGDASH_CONFIG`.
    /// 3. `./logdash.toml`.
    /// 4. Compiled-in defaults.
    ///
    /// `LOGDASH_API_URL` is applied on top of whichever source won.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::load_or_default(),
        };
        if let Ok(url) = std::env::var(API_URL_ENV) {
            debug!(%url, "api base url overridden from environment");
            config.api.base_url = url;
        }
        Ok(config)
    }

    fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(&env_path);
            match Self::load(&path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "LOGDASH_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local = Path::new("logdash.toml");
        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %local.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }

    pub fn params(&self) -> DashboardParams {
        DashboardParams {
            bucket_minutes: self.dashboard.bucket_minutes,
            top_n: self.dashboard.top_n,
        }
    }
}

// ---------------------------------------------------------------------------
// Upstream API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every REST path is joined onto, e.g. `http://host:8000/api`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

// ---------------------------------------------------------------------------
// Service credentials
// ---------------------------------------------------------------------------

/// Credentials the poller and CLI commands log in with. Both must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AuthConfig {
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Address the local dashboard server listens on.
    pub bind: String,
    /// Seconds between event snapshot refreshes.
    pub poll_interval_secs: u64,
    /// `perPage` for the snapshot fetch.
    pub per_page: u32,
    /// Width of timeline and anomaly-trend buckets.
    pub bucket_minutes: u32,
    /// Length of the top source IP ranking.
    pub top_n: usize,
    /// Origins allowed to call `/api/v1` from a browser with credentials.
    /// Empty means same-origin only.
    pub cors_origins: Vec<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            poll_interval_secs: 5,
            per_page: 5000,
            bucket_minutes: 60,
            top_n: 10,
            cors_origins: Vec::new(),
        }
    }
}

impl ViewConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
