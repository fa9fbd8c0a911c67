//! Client configuration loaded from TOML.
//!
//! Passed explicitly to the API client and services; nothing here is global.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cancellation::{DEFAULT_LEAD_TIME_HOURS, LEAD_TIME_SETTING, lead_time_in_range};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// TOML could not be parsed into the expected structure.
    #[error("toml error: {0}")]
    CannotParseToml(String),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Scheduling API base, e.g. `https://citas.example.gov.co`.
    pub api_base_url: String,

    /// Public verification endpoint encoded into confirmation artifacts.
    #[serde(default)]
    pub verification_base_url: Option<String>,

    #[serde(default = "default_lead_time_setting")]
    pub cancellation_lead_time_setting: String,

    #[serde(default = "default_lead_time_hours")]
    pub default_cancellation_lead_time_hours: i64,

    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_lead_time_setting() -> String {
    LEAD_TIME_SETTING.to_string()
}

fn default_lead_time_hours() -> i64 {
    DEFAULT_LEAD_TIME_HOURS
}

fn default_timeout_secs() -> u64 {
    30
}

impl ClientConfig {
    /// Config with defaults for everything but the API base URL.
    pub fn with_base_url(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            verification_base_url: None,
            cancellation_lead_time_setting: default_lead_time_setting(),
            default_cancellation_lead_time_hours: default_lead_time_hours(),
            request_timeout_secs: default_timeout_secs(),
        }
        .normalized()
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(config_str).map_err(|e| ConfigError::CannotParseToml(e.to_string()))?;
        let config = config.normalized();
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        tracing::info!(path = %path.display(), api = %config.api_base_url, "loaded client config");
        Ok(config)
    }

    fn normalized(mut self) -> Self {
        self.api_base_url = self.api_base_url.trim().trim_end_matches('/').to_string();
        self.verification_base_url = self
            .verification_base_url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_http_url("api_base_url", &self.api_base_url)?;
        if let Some(url) = &self.verification_base_url {
            check_http_url("verification_base_url", url)?;
        }
        let key = &self.cancellation_lead_time_setting;
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(ConfigError::Invalid {
                field: "cancellation_lead_time_setting",
                reason: "must be a non-empty key of letters, digits, '_', '-' or '.'".into(),
            });
        }
        if !lead_time_in_range(self.default_cancellation_lead_time_hours) {
            return Err(ConfigError::Invalid {
                field: "default_cancellation_lead_time_hours",
                reason: "must be a non-negative number of hours within range".into(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_secs",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Verification endpoint, defaulting to the API's own.
    pub fn verification_url(&self) -> String {
        self.verification_base_url
            .clone()
            .unwrap_or_else(|| format!("{}/api/appointments/verify", self.api_base_url))
    }
}

fn check_http_url(field: &'static str, url: &str) -> Result<(), ConfigError> {
    let has_host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .is_some_and(|rest| !rest.is_empty());
    if has_host {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{url:?} is not an http(s) URL"),
        })
    }
}
