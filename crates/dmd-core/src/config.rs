//! Extractor configuration.
//!
//! Loaded from a YAML file, then overridden by `DMD_USERNAME`,
//! `DMD_PASSWORD` and `DMD_BASE_URL` when those are set.

use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::time::Duration;

use chrono::NaiveTime;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::retry::RetryConfig;
use crate::session::{Credentials, DEFAULT_BASE_URL};
use crate::window::SessionHours;

pub const ENV_USERNAME: &str = "DMD_USERNAME";
pub const ENV_PASSWORD: &str = "DMD_PASSWORD";
pub const ENV_BASE_URL: &str = "DMD_BASE_URL";

/// Settings for one extraction run.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractorConfig {
    pub username: String,
    pub password: String,
    pub base_url: String,
    /// Feeds fetched in parallel.
    pub concurrency: usize,
    /// Records buffered between the feeds and the sink.
    pub queue_size: usize,
    /// Total attempts per artifact.
    pub retry_limit: u32,
    pub request_timeout_ms: u64,
    #[serde(with = "crate::window::hhmm")]
    pub session_open: NaiveTime,
    #[serde(with = "crate::window::hhmm")]
    pub session_close: NaiveTime,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            concurrency: 10,
            queue_size: 10_000,
            retry_limit: 3,
            request_timeout_ms: 30_000,
            session_open: SessionHours::default().open,
            session_close: SessionHours::default().close,
        }
    }
}

impl Debug for ExtractorConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("concurrency", &self.concurrency)
            .field("queue_size", &self.queue_size)
            .field("retry_limit", &self.retry_limit)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("session_open", &self.session_open)
            .field("session_close", &self.session_close)
            .finish()
    }
}

impl ExtractorConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Applies the `DMD_*` environment overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(username) = lookup(ENV_USERNAME) {
            self.username = username;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.password = password;
        }
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("username", &self.username),
            ("password", &self.password),
            ("base_url", &self.base_url),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing { field });
            }
        }

        for (field, value) in [
            ("concurrency", self.concurrency as u64),
            ("queue_size", self.queue_size as u64),
            ("retry_limit", u64::from(self.retry_limit)),
            ("request_timeout_ms", self.request_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }

        let hours = self.session_hours();
        if hours.open > hours.close {
            return Err(ConfigError::InvertedSession {
                open: hours.open.format("%H:%M").to_string(),
                close: hours.close.format("%H:%M").to_string(),
            });
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }

    pub fn session_hours(&self) -> SessionHours {
        SessionHours {
            open: self.session_open,
            close: self.session_close,
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::exponential(self.retry_limit)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
