//! Runtime settings loaded once at startup.

use std::time::Duration;
use thiserror::Error;

use crate::providers::{ApiCredential, CompletionConfig};

pub const API_KEY_VAR: &str = "LLM_API_KEY";
pub const MODEL_VAR: &str = "LLM_MODEL";
pub const BASE_URL_VAR: &str = "LLM_BASE_URL";
pub const TIMEOUT_VAR: &str = "LLM_TIMEOUT";
pub const MAX_ATTEMPTS_VAR: &str = "LLM_MAX_ATTEMPTS";
pub const RETRY_DELAY_VAR: &str = "LLM_RETRY_DELAY";
pub const OBSERVABILITY_TOKEN_VAR: &str = "OBSERVABILITY_TOKEN";
pub const OBSERVABILITY_ENDPOINT_VAR: &str = "OBSERVABILITY_ENDPOINT";
pub const ENVIRONMENT_VAR: &str = "ENVIRONMENT";

pub const DEFAULT_MODEL: &str = "mistral-small-latest";
pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Errors from loading settings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required variable {var}")]
    Missing { var: &'static str },

    #[error("Invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// All configuration, read-only after startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: ApiCredential,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub observability_token: Option<ApiCredential>,
    pub observability_endpoint: Option<String>,
    pub environment: String,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = ApiCredential::from_lookup(&lookup, API_KEY_VAR, "LLM API key")
            .ok_or(ConfigError::Missing { var: API_KEY_VAR })?;

        let model = get(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let base_url = match get(BASE_URL_VAR) {
            Some(url) => parse_http_url(BASE_URL_VAR, url)?,
            None => DEFAULT_BASE_URL.to_string(),
        };

        let timeout = match get(TIMEOUT_VAR) {
            Some(raw) => parse_duration(TIMEOUT_VAR, raw)?,
            None => DEFAULT_TIMEOUT,
        };

        let max_attempts = match get(MAX_ATTEMPTS_VAR) {
            Some(raw) => parse_attempts(raw)?,
            None => DEFAULT_MAX_ATTEMPTS,
        };

        let retry_delay = match get(RETRY_DELAY_VAR) {
            Some(raw) => parse_duration(RETRY_DELAY_VAR, raw)?,
            None => DEFAULT_RETRY_DELAY,
        };

        let observability_token =
            ApiCredential::from_lookup(&lookup, OBSERVABILITY_TOKEN_VAR, "observability token");

        let observability_endpoint = match get(OBSERVABILITY_ENDPOINT_VAR) {
            Some(url) => Some(parse_http_url(OBSERVABILITY_ENDPOINT_VAR, url)?),
            None => None,
        };

        let environment = get(ENVIRONMENT_VAR).unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        Ok(Self {
            api_key,
            model,
            base_url,
            timeout,
            max_attempts,
            retry_delay,
            observability_token,
            observability_endpoint,
            environment,
        })
    }

    /// Completion parameters for stage requests.
    pub fn completion_config(&self) -> CompletionConfig {
        CompletionConfig {
            model: self.model.clone(),
            timeout: self.timeout,
            ..CompletionConfig::default()
        }
    }
}

fn parse_http_url(var: &'static str, url: String) -> Result<String, ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Invalid {
            var,
            value: url,
            reason: "must start with http:// or https://".to_string(),
        });
    }
    Ok(url.trim_end_matches('/').to_string())
}

fn parse_duration(var: &'static str, raw: String) -> Result<Duration, ConfigError> {
    humantime::parse_duration(&raw).map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value: raw,
    })
}

fn parse_attempts(raw: String) -> Result<u32, ConfigError> {
    match raw.parse::<u32>() {
        Ok(0) => Err(ConfigError::Invalid {
            var: MAX_ATTEMPTS_VAR,
            value: raw,
            reason: "must be at least 1".to_string(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::Invalid {
            var: MAX_ATTEMPTS_VAR,
            reason: e.to_string(),
            value: raw,
        }),
    }
}
