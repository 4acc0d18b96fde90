//! Transport configuration for a registered contract.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::HttpApiError;

/// Default lifetime of a managed transport before it is recycled.
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(120);

fn default_lifetime() -> Duration {
    DEFAULT_LIFETIME
}

/// Settings used to build the shared transport behind a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpApiConfig {
    /// Base URL relative request paths are joined onto.
    pub base_url: Option<String>,
    /// Total request timeout.
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub user_agent: Option<String>,
    /// Headers sent with every request.
    pub default_headers: HashMap<String, String>,
    /// How long one transport is reused before the factory builds a fresh one.
    #[serde(default = "default_lifetime")]
    pub lifetime: Duration,
}

impl Default for HttpApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: None,
            connect_timeout: None,
            user_agent: None,
            default_headers: HashMap::new(),
            lifetime: DEFAULT_LIFETIME,
        }
    }
}

impl HttpApiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub const fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Check the configuration without building anything.
    pub fn validate(&self) -> Result<(), HttpApiError> {
        if let Some(base) = &self.base_url {
            reqwest::Url::parse(base).map_err(|e| {
                HttpApiError::InvalidConfiguration(format!("Invalid base_url '{base}': {e}"))
            })?;
        }
        if self.lifetime.is_zero() {
            return Err(HttpApiError::InvalidConfiguration(
                "lifetime must be greater than zero".to_string(),
            ));
        }
        self.header_map().map(|_| ())
    }

    pub(crate) fn header_map(&self) -> Result<HeaderMap, HttpApiError> {
        let mut headers = HeaderMap::with_capacity(self.default_headers.len());
        for (name, value) in &self.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                HttpApiError::InvalidConfiguration(format!("Invalid header name '{name}': {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                HttpApiError::InvalidConfiguration(format!("Invalid header value for '{name}': {e}"))
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    /// Build a `reqwest` client from this configuration.
    pub(crate) fn build_http_client(&self) -> Result<reqwest::Client, HttpApiError> {
        let mut builder = reqwest::Client::builder()
            .default_headers(self.header_map()?)
            .pool_idle_timeout(self.lifetime);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(ua) = &self.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        builder.build().map_err(|e| {
            HttpApiError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HttpApiConfig::default();
        assert_eq!(config.lifetime, DEFAULT_LIFETIME);
        assert!(config.base_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_base_url_and_headers() {
        let bad_url = HttpApiConfig::new().with_base_url("not a url");
        assert!(matches!(
            bad_url.validate(),
            Err(HttpApiError::InvalidConfiguration(_))
        ));

        let bad_header = HttpApiConfig::new().with_header("bad header", "x");
        assert!(matches!(
            bad_header.validate(),
            Err(HttpApiError::InvalidConfiguration(_))
        ));

        let zero = HttpApiConfig::new().with_lifetime(Duration::ZERO);
        assert!(zero.validate().is_err());
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let config: HttpApiConfig = serde_json::from_value(serde_json::json!({
            "base_url": "https://api.example.com/v1/",
            "default_headers": { "x-api-key": "secret" }
        }))
        .unwrap();

        assert_eq!(config.base_url.as_deref(), Some("https://api.example.com/v1/"));
        assert_eq!(config.lifetime, DEFAULT_LIFETIME);
        assert_eq!(config.default_headers["x-api-key"], "secret");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builds_http_client() {
        let config = HttpApiConfig::new()
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("httpapi-test")
            .with_header("accept", "application/json");
        assert!(config.build_http_client().is_ok());
    }
}
