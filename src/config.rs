//! Configuration types
//!
//! Settings for the API connection, the HTTP client and the queuing
//! appender. Loaded from YAML, then overridden by `TB_HOST` / `TB_TOKEN`
//! from the environment. Durations are written as (fractional) seconds.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default Tinybird API host
pub const DEFAULT_HOST: &str = "https://api.tinybird.co";

/// Environment variable overriding the API host
pub const HOST_ENV: &str = "TB_HOST";

/// Environment variable overriding the API token
pub const TOKEN_ENV: &str = "TB_TOKEN";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// API host, e.g. `https://api.tinybird.co`
    #[serde(default = "default_host")]
    pub host: String,

    /// Access token sent as bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Queuing appender settings
    #[serde(default)]
    pub appender: AppenderConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            token: None,
            appender: AppenderConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Parse a config from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Apply `TB_HOST` / `TB_TOKEN` from the process environment
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    #[must_use]
    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(HOST_ENV).filter(|v| !v.is_empty()) {
            self.host = host;
        }
        if let Some(token) = lookup(TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.token = Some(token);
        }
        self
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.host)?;
        self.appender.validate()?;
        self.http.validate()
    }

    /// Render the config as YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

// ============================================================================
// Appender Config
// ============================================================================

/// Settings of the queuing batch appender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppenderConfig {
    /// Minimum pause between batches when not rate limited
    #[serde(with = "duration_secs")]
    pub min_interval: Duration,

    /// Wait used when a rate-limited response carries no usable `Retry-After`
    #[serde(with = "duration_secs")]
    pub default_retry_after: Duration,

    /// Pause after a batch that needed rate-limit retries. Zero means
    /// "use the `X-Ratelimit-Reset` hint of the last response".
    #[serde(with = "duration_secs")]
    pub wait_after_rate_limit: Duration,

    /// Safety margin added to every `Retry-After` hint
    #[serde(with = "duration_secs")]
    pub retry_after_margin: Duration,

    /// Attempts per batch while rate limited
    pub max_retries_per_batch: u32,

    /// Attempts for the batch salvaged at shutdown
    pub shutdown_max_retries: u32,

    /// Upper bound for a single batch (unbounded when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_batch_size: Option<usize>,
}

impl Default for AppenderConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(5),
            default_retry_after: Duration::from_secs(12),
            wait_after_rate_limit: Duration::from_secs(12),
            retry_after_margin: Duration::from_millis(500),
            max_retries_per_batch: 10,
            shutdown_max_retries: 2,
            max_batch_size: None,
        }
    }
}

impl AppenderConfig {
    /// Create a new config builder
    pub fn builder() -> AppenderConfigBuilder {
        AppenderConfigBuilder::default()
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.max_retries_per_batch == 0 {
            return Err(Error::invalid_value(
                "max_retries_per_batch",
                "must be at least 1",
            ));
        }
        if self.shutdown_max_retries == 0 {
            return Err(Error::invalid_value(
                "shutdown_max_retries",
                "must be at least 1",
            ));
        }
        if self.max_batch_size == Some(0) {
            return Err(Error::invalid_value("max_batch_size", "must be at least 1"));
        }
        Ok(())
    }
}

/// Builder for appender config
#[derive(Default)]
pub struct AppenderConfigBuilder {
    config: AppenderConfig,
}

impl AppenderConfigBuilder {
    /// Set the minimum pause between batches
    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.config.min_interval = interval;
        self
    }

    /// Set the fallback wait for rate-limited responses
    pub fn default_retry_after(mut self, wait: Duration) -> Self {
        self.config.default_retry_after = wait;
        self
    }

    /// Set the pause after a rate-limited batch
    pub fn wait_after_rate_limit(mut self, wait: Duration) -> Self {
        self.config.wait_after_rate_limit = wait;
        self
    }

    /// Set the margin added to `Retry-After` hints
    pub fn retry_after_margin(mut self, margin: Duration) -> Self {
        self.config.retry_after_margin = margin;
        self
    }

    /// Set the retry budget per batch
    pub fn max_retries_per_batch(mut self, retries: u32) -> Self {
        self.config.max_retries_per_batch = retries;
        self
    }

    /// Set the retry budget of the shutdown flush
    pub fn shutdown_max_retries(mut self, retries: u32) -> Self {
        self.config.shutdown_max_retries = retries;
        self
    }

    /// Cap the number of records per batch
    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.config.max_batch_size = Some(size);
        self
    }

    /// Build the config
    pub fn build(self) -> AppenderConfig {
        self.config
    }
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout
    #[serde(with = "duration_secs")]
    pub timeout: Duration,

    /// Client-side request rate (no throttling when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_per_second: Option<u32>,

    /// Burst size of the client-side throttle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burst_size: Option<u32>,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            requests_per_second: None,
            burst_size: None,
            user_agent: format!("verdin/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::invalid_value("timeout", "must be positive"));
        }
        if self.requests_per_second == Some(0) {
            return Err(Error::invalid_value(
                "requests_per_second",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Serde helpers
// ============================================================================

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|e| {
            serde::de::Error::custom(format!("invalid duration of {secs} seconds: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_appender_defaults() {
        let config = AppenderConfig::default();
        assert_eq!(config.min_interval, Duration::from_secs(5));
        assert_eq!(config.default_retry_after, Duration::from_secs(12));
        assert_eq!(config.wait_after_rate_limit, Duration::from_secs(12));
        assert_eq!(config.retry_after_margin, Duration::from_millis(500));
        assert_eq!(config.max_retries_per_batch, 10);
        assert_eq!(config.shutdown_max_retries, 2);
        assert_eq!(config.max_batch_size, None);
    }

    #[test]
    fn test_appender_builder() {
        let config = AppenderConfig::builder()
            .min_interval(Duration::ZERO)
            .wait_after_rate_limit(Duration::from_millis(500))
            .max_retries_per_batch(3)
            .max_batch_size(100)
            .build();

        assert_eq!(config.min_interval, Duration::ZERO);
        assert_eq!(config.wait_after_rate_limit, Duration::from_millis(500));
        assert_eq!(config.max_retries_per_batch, 3);
        assert_eq!(config.max_batch_size, Some(100));
        assert_eq!(config.default_retry_after, Duration::from_secs(12));
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r"
host: http://localhost:7181
token: p.abc
appender:
  min_interval: 0.25
  wait_after_rate_limit: 0
  max_retries_per_batch: 4
http:
  timeout: 5
  requests_per_second: 2
";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.host, "http://localhost:7181");
        assert_eq!(config.token.as_deref(), Some("p.abc"));
        assert_eq!(config.appender.min_interval, Duration::from_millis(250));
        assert_eq!(config.appender.wait_after_rate_limit, Duration::ZERO);
        assert_eq!(config.appender.max_retries_per_batch, 4);
        assert_eq!(config.appender.default_retry_after, Duration::from_secs(12));
        assert_eq!(config.http.timeout, Duration::from_secs(5));
        assert_eq!(config.http.requests_per_second, Some(2));
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.host, DEFAULT_HOST);
    }

    #[test]
    fn test_negative_duration_rejected() {
        let result = Config::from_yaml("appender:\n  min_interval: -1\n");
        assert!(matches!(result, Err(Error::YamlParse(_))));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let result = Config::from_yaml("appender:\n  max_retries_per_batch: 0\n");
        assert!(matches!(
            result,
            Err(Error::InvalidConfigValue { ref field, .. }) if field == "max_retries_per_batch"
        ));
    }

    #[test]
    fn test_invalid_host_rejected() {
        let result = Config::from_yaml("host: not a url\n");
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(HOST_ENV, "http://tb.local"), (TOKEN_ENV, "secret")]
            .into_iter()
            .collect();

        let config = Config::default().with_env_from(|key| env.get(key).map(ToString::to_string));
        assert_eq!(config.host, "http://tb.local");
        assert_eq!(config.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let config = Config::default().with_env_from(|_| Some(String::new()));
        assert_eq!(config.host, DEFAULT_HOST);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_yaml_roundtrip_keeps_seconds() {
        let yaml = Config::default().to_yaml().unwrap();
        assert!(yaml.contains("min_interval: 5.0"));
        assert!(!yaml.contains("token"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/definitely/not/here.yaml");
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
    }
}
