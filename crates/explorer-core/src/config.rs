//! Configuration types for the explorer
//!
//! This module defines all configuration structures used throughout the crate.
//! Loading from the environment is the runner's job; these types only carry
//! and validate values.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::retry::{RetryOn, RetryPolicy};
use crate::validation;

/// Default NASA API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.nasa.gov";

/// NASA's shared demonstration key (heavily rate limited)
pub const DEMO_API_KEY: &str = "DEMO_KEY";

/// Main explorer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Remote API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Automatic retry; `None` keeps retries off (manual refetch only)
    #[serde(default)]
    pub retry: Option<RetryConfig>,

    /// Language for user-facing messages
    #[serde(default)]
    pub locale: Locale,

    /// Initial rover-photo display limit
    #[serde(default = "default_max_display_count")]
    pub default_max_display_count: usize,
}

impl ExplorerConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            api: ApiConfig::default(),
            retry: None,
            locale: Locale::default(),
            default_max_display_count: default_max_display_count(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.api.validate()?;

        if let Some(retry) = &self.retry {
            retry.validate()?;
        }

        if !validation::is_valid_photo_count(self.default_max_display_count as f64) {
            return Err(crate::Error::config(format!(
                "default_max_display_count must be between 1 and {}. Got: {}",
                validation::MAX_PHOTO_COUNT,
                self.default_max_display_count
            )));
        }

        Ok(())
    }

    /// Retry policy derived from configuration, if retries are enabled
    pub fn retry_policy(&self) -> Option<RetryPolicy> {
        self.retry.as_ref().map(RetryConfig::policy)
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Remote API configuration
///
/// The Debug implementation does NOT expose the API key.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL, without a trailing slash (e.g. "https://api.nasa.gov")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// api.nasa.gov key
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Request timeout in seconds; `None` keeps the transport default
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ApiConfig {
    /// Create an API configuration for the given base URL and key
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_secs: None,
        }
    }

    /// Set a request timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Validate the API configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.base_url.is_empty() {
            return Err(crate::Error::config("API base URL cannot be empty"));
        }
        if !self.base_url.starts_with("https://") && !self.base_url.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "API base URL must use HTTP or HTTPS scheme. Got: {}",
                self.base_url
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(crate::Error::config("API key cannot be empty"));
        }
        if self.timeout_secs == Some(0) {
            return Err(crate::Error::config("API timeout must be > 0"));
        }
        Ok(())
    }

    /// Configured timeout as a Duration
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEMO_API_KEY)
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<REDACTED>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Automatic retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay in milliseconds, doubled on every attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl RetryConfig {
    /// Validate the retry configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_retries > 10 {
            return Err(crate::Error::config(format!(
                "max_retries must be between 0 and 10. Got: {}",
                self.max_retries
            )));
        }
        if self.base_delay_ms == 0 {
            return Err(crate::Error::config("base_delay_ms must be > 0"));
        }
        Ok(())
    }

    /// Retry policy for configured retries (transient failures only)
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.base_delay_ms))
            .with_retry_on(RetryOn::Transient)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// Language for user-facing messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Locale {
    /// English (default)
    #[default]
    #[serde(alias = "en-us")]
    En,
    /// Brazilian Portuguese
    #[serde(alias = "pt")]
    PtBr,
}

impl std::str::FromStr for Locale {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "en-us" => Ok(Locale::En),
            "pt" | "pt-br" => Ok(Locale::PtBr),
            other => Err(crate::Error::config(format!(
                "Unsupported locale '{}'. Supported: en, pt-br",
                other
            ))),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_key() -> String {
    DEMO_API_KEY.to_string()
}

fn default_max_display_count() -> usize {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = ExplorerConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.retry_policy().is_none());
        assert_eq!(config.default_max_display_count, 10);
    }

    #[test]
    fn rejects_bad_display_count() {
        let mut config = ExplorerConfig::default();
        config.default_max_display_count = 51;
        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));
    }

    #[test]
    fn rejects_empty_key_and_bad_scheme() {
        assert!(ApiConfig::new("https://api.nasa.gov", "  ").validate().is_err());
        assert!(ApiConfig::new("ftp://api.nasa.gov", "key").validate().is_err());
        assert!(ApiConfig::default().with_timeout_secs(0).validate().is_err());
    }

    #[test]
    fn api_key_not_exposed_in_debug() {
        let config = ApiConfig::new(DEFAULT_BASE_URL, "secret_key_12345");
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(debug_str.contains("ApiConfig"));
    }

    #[test]
    fn deserializes_partial_config() {
        let config: ExplorerConfig = serde_json::from_str(
            r#"{ "api": { "api_key": "abc" }, "retry": { "max_retries": 2 }, "locale": "pt-br" }"#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.locale, Locale::PtBr);
        let policy = config.retry_policy().unwrap();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.base_delay, Duration::from_millis(1000));
        assert_eq!(policy.retry_on, RetryOn::Transient);
    }

    #[test]
    fn locale_from_str() {
        assert_eq!("pt-BR".parse::<Locale>().unwrap(), Locale::PtBr);
        assert_eq!("en".parse::<Locale>().unwrap(), Locale::En);
        assert!("fr".parse::<Locale>().is_err());
    }
}
