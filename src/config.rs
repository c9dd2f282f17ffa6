//! Client configuration.
//!
//! All client behaviour is controlled through [`ClientConfig`], built via
//! [`ClientConfigBuilder`]. Only the API key is required; everything else has
//! a default matching the public Doc2X service.

use crate::error::Doc2xError;
use std::fmt;
use std::time::Duration;

/// Public Doc2X endpoint.
pub const DEFAULT_BASE_URL: &str = "https://v2.doc2x.noedgeai.com";

/// Per-request timeout for API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for presigned uploads and result downloads, which move whole files.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(600);

/// Fallback bound on a wait when the caller's context carries no deadline.
pub const PROCESSING_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Polling interval used when the caller passes a zero interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Transient status-fetch failures tolerated per wait before giving up.
pub const TRANSIENT_FETCH_RETRY_BUDGET: u32 = 3;

/// Environment variables consulted by [`resolve_api_key`], in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["DOC2X_APIKEY", "DOC2X_API_KEY"];

/// Configuration for a [`crate::Client`].
///
/// # Example
/// ```rust
/// use doc2x::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::builder()
///     .api_key("sk-test")
///     .processing_timeout(Duration::from_secs(600))
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url, "https://v2.doc2x.noedgeai.com");
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Bearer token sent with every API call (never with presigned transfers).
    pub api_key: String,

    /// API root, without trailing slash. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Per-request timeout for API calls. Default: 30 s.
    pub timeout: Duration,

    /// Timeout for presigned uploads and downloads. Default: 10 min.
    ///
    /// Kept separate from `timeout` because a 200-page scan can take minutes
    /// to PUT, while a status call that hangs for 30 s is already broken.
    pub transfer_timeout: Duration,

    /// Upper bound on a `wait_for_*` call when the caller's context has no
    /// deadline. Default: 5 min.
    pub processing_timeout: Duration,

    /// Transient fetch failures tolerated per wait. Default: 3.
    pub retry_budget: u32,

    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            processing_timeout: PROCESSING_TIMEOUT,
            retry_budget: TRANSIENT_FETCH_RETRY_BUDGET,
            user_agent: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("transfer_timeout", &self.transfer_timeout)
            .field("processing_timeout", &self.processing_timeout)
            .field("retry_budget", &self.retry_budget)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

fn redact(key: &str) -> &'static str {
    if key.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn transfer_timeout(mut self, timeout: Duration) -> Self {
        self.config.transfer_timeout = timeout;
        self
    }

    /// A zero value selects [`PROCESSING_TIMEOUT`].
    pub fn processing_timeout(mut self, timeout: Duration) -> Self {
        self.config.processing_timeout = if timeout.is_zero() {
            PROCESSING_TIMEOUT
        } else {
            timeout
        };
        self
    }

    pub fn retry_budget(mut self, n: u32) -> Self {
        self.config.retry_budget = n;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = Some(ua.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<ClientConfig, Doc2xError> {
        let c = &mut self.config;
        c.api_key = c.api_key.trim().to_string();
        if c.api_key.is_empty() {
            return Err(Doc2xError::MissingApiKey);
        }

        let trimmed = c.base_url.trim().trim_end_matches('/').to_string();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(Doc2xError::InvalidConfig(format!(
                "base url must be http(s), got '{}'",
                c.base_url
            )));
        }
        c.base_url = trimmed;

        if c.timeout.is_zero() {
            return Err(Doc2xError::InvalidConfig("timeout must be > 0".into()));
        }
        if c.transfer_timeout.is_zero() {
            return Err(Doc2xError::InvalidConfig(
                "transfer timeout must be > 0".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Pick the API key from an explicit value, then the environment.
///
/// Blank values are skipped so an exported-but-empty variable does not mask
/// the next candidate.
pub fn resolve_api_key(explicit: Option<&str>) -> Result<String, Doc2xError> {
    resolve_api_key_with(explicit, |name| std::env::var(name).ok())
}

fn resolve_api_key_with<F>(explicit: Option<&str>, lookup: F) -> Result<String, Doc2xError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = explicit.map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .ok_or(Doc2xError::MissingApiKey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.base_url, DEFAULT_BASE_URL);
        assert_eq!(c.timeout, Duration::from_secs(30));
        assert_eq!(c.processing_timeout, Duration::from_secs(300));
        assert_eq!(c.retry_budget, 3);
    }

    #[test]
    fn build_requires_api_key() {
        let err = ClientConfig::builder().build().unwrap_err();
        assert!(matches!(err, Doc2xError::MissingApiKey));
    }

    #[test]
    fn build_trims_base_url() {
        let c = ClientConfig::builder()
            .api_key("k")
            .base_url("http://localhost:8080/")
            .build()
            .unwrap();
        assert_eq!(c.base_url, "http://localhost:8080");
    }

    #[test]
    fn build_rejects_non_http_base_url() {
        let err = ClientConfig::builder()
            .api_key("k")
            .base_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("base url"), "got: {err}");
    }

    #[test]
    fn zero_processing_timeout_falls_back() {
        let c = ClientConfig::builder()
            .api_key("k")
            .processing_timeout(Duration::ZERO)
            .build()
            .unwrap();
        assert_eq!(c.processing_timeout, PROCESSING_TIMEOUT);
    }

    #[test]
    fn debug_redacts_key() {
        let c = ClientConfig::builder().api_key("sk-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn api_key_resolution_order() {
        let env: HashMap<&str, &str> =
            HashMap::from([("DOC2X_APIKEY", "  "), ("DOC2X_API_KEY", "from-env")]);
        let lookup = |name: &str| env.get(name).map(|v| v.to_string());

        assert_eq!(
            resolve_api_key_with(Some("flag"), lookup).unwrap(),
            "flag"
        );
        assert_eq!(resolve_api_key_with(None, lookup).unwrap(), "from-env");
        assert_eq!(resolve_api_key_with(Some(""), lookup).unwrap(), "from-env");
        assert!(matches!(
            resolve_api_key_with(None, |_| None),
            Err(Doc2xError::MissingApiKey)
        ));
    }
}
