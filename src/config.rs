use crate::patterns::PiiAction;
use std::time::Duration;

/// Environment variable carrying the collector API key.
pub const MODELTRACE_API_KEY_ENV: &str = "MODELTRACE_API_KEY";

/// Environment variable overriding the collector endpoint.
pub const MODELTRACE_ENDPOINT_ENV: &str = "MODELTRACE_ENDPOINT";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Error type returned when validating a [`ClientConfig`].
///
/// These are programmer errors and fail construction fast; nothing here is
/// a runtime delivery condition.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("api key is missing or empty")]
    MissingApiKey,

    #[error("api key must not contain whitespace")]
    MalformedApiKey,

    #[error("endpoint must start with http:// or https://: {0}")]
    InvalidEndpoint(String),

    #[error("batch size must be a positive integer")]
    InvalidBatchSize,

    #[error("flush interval must be a positive duration")]
    InvalidFlushInterval,

    #[error("unknown pii action: {0}")]
    InvalidPiiAction(String),

    #[error("failed to construct transport: {0}")]
    Transport(String),
}

/// PII scrubbing settings consumed by the client.
#[derive(Clone, Debug)]
pub struct PiiConfig {
    /// Master switch; when off, records pass through untouched.
    pub enabled: bool,
    /// Transformation applied to every match.
    pub action: PiiAction,
    /// Built-in categories to activate; empty means all of them.
    pub categories: Vec<String>,
}

impl Default for PiiConfig {
    fn default() -> Self {
        PiiConfig {
            enabled: false,
            action: PiiAction::Mask,
            categories: Vec::new(),
        }
    }
}

/// Configuration of the telemetry client.
///
/// **Fields**
/// - `api_key`: collector credential, required and shape-checked.
/// - `endpoint`: collector base URL.
/// - `batch_size`: number of buffered records that triggers a flush.
/// - `flush_interval`: maximum time between flushes while records are
///   buffered; evaluated opportunistically on push.
/// - `synchronous`: when `true`, every `log` call awaits one flush attempt.
/// - `request_timeout`: per-request transport timeout; a timeout counts as
///   an ordinary delivery failure.
/// - `pii`: scrubbing settings.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_key: String,
    pub endpoint: String,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub synchronous: bool,
    pub request_timeout: Duration,
    pub pii: PiiConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_key: String::new(),
            endpoint: "https://api.modeltrace.dev".to_string(),
            batch_size: 20,
            flush_interval: Duration::from_secs(5),
            synchronous: false,
            request_timeout: Duration::from_secs(10),
            pii: PiiConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Start from defaults with the one required field set.
    pub fn new(api_key: impl Into<String>) -> Self {
        ClientConfig {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Read api key and endpoint from the environment, defaults elsewhere.
    pub fn from_env() -> Self {
        ClientConfig {
            api_key: env_or(MODELTRACE_API_KEY_ENV, ""),
            endpoint: env_or(MODELTRACE_ENDPOINT_ENV, "https://api.modeltrace.dev"),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    pub fn with_synchronous(mut self, synchronous: bool) -> Self {
        self.synchronous = synchronous;
        self
    }

    pub fn with_pii(mut self, pii: PiiConfig) -> Self {
        self.pii = pii;
        self
    }

    /// Fail fast on misconfiguration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.api_key.chars().any(char::is_whitespace) {
            return Err(ConfigError::MalformedApiKey);
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidEndpoint(self.endpoint.clone()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        if self.flush_interval.is_zero() {
            return Err(ConfigError::InvalidFlushInterval);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_with_key_validates() {
        assert!(ClientConfig::new("mt-test-key").validate().is_ok());
    }

    #[test]
    fn missing_api_key_is_rejected() {
        assert!(matches!(
            ClientConfig::new("  ").validate(),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn api_key_with_whitespace_is_malformed() {
        assert!(matches!(
            ClientConfig::new("mt test key").validate(),
            Err(ConfigError::MalformedApiKey)
        ));
    }

    #[test]
    fn non_http_endpoint_is_rejected() {
        let config = ClientConfig::new("mt-key").with_endpoint("ftp://collector");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn zero_batch_size_and_interval_are_rejected() {
        let config = ClientConfig::new("mt-key").with_batch_size(0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBatchSize)));

        let config = ClientConfig::new("mt-key").with_flush_interval(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFlushInterval)
        ));
    }
}
