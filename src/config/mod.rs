use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::poller::schedule::DEFAULT_MAX_ATTEMPTS;
use crate::poller::view::LONG_WAIT_HINT_AFTER;
use crate::poller::{PollSchedule, ScreenOptions};

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the OCR backend; `/api/...` is appended.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Per-request timeout for backend calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Fetches per poll before giving up; must be at least 1.
    #[serde(default = "default_max_attempts")]
    pub poll_max_attempts: u32,

    #[serde(default = "default_fast_interval_ms")]
    pub poll_fast_interval_ms: u64,

    #[serde(default = "default_medium_interval_ms")]
    pub poll_medium_interval_ms: u64,

    #[serde(default = "default_slow_interval_ms")]
    pub poll_slow_interval_ms: u64,

    /// Contact shown when extraction fails (URL or mailto link).
    #[serde(default)]
    pub admin_contact: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_fast_interval_ms() -> u64 {
    3000
}

fn default_medium_interval_ms() -> u64 {
    5000
}

fn default_slow_interval_ms() -> u64 {
    10000
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Env(#[from] envy::Error),
    #[error("POLL_MAX_ATTEMPTS must be at least 1")]
    ZeroMaxAttempts,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_max_attempts == 0 {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_schedule(&self) -> PollSchedule {
        PollSchedule {
            max_attempts: self.poll_max_attempts,
            fast_interval: Duration::from_millis(self.poll_fast_interval_ms),
            medium_interval: Duration::from_millis(self.poll_medium_interval_ms),
            slow_interval: Duration::from_millis(self.poll_slow_interval_ms),
        }
    }

    pub fn screen_options(&self) -> ScreenOptions {
        ScreenOptions {
            long_wait_hint_after: LONG_WAIT_HINT_AFTER,
            admin_contact: self.admin_contact.clone().filter(|c| !c.trim().is_empty()),
        }
    }
}
