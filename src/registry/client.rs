//! Managed transport handle.
//!
//! An [`ApiClient`] is what a contract instance talks through. Cloning it is
//! cheap; every clone shares the same underlying `reqwest::Client` (and so the
//! same connection pool) until the owning factory recycles it.

use std::sync::Arc;
use std::time::Instant;

use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use crate::error::HttpApiError;
use crate::registry::config::HttpApiConfig;

#[derive(Debug)]
struct ApiClientInner {
    http: reqwest::Client,
    config: HttpApiConfig,
    base_url: Option<Url>,
    generation: u64,
    created_at: Instant,
}

/// Shared transport handle handed to contract instances.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

impl ApiClient {
    /// Wrap an already built `reqwest` client.
    pub fn new(
        http: reqwest::Client,
        config: HttpApiConfig,
        generation: u64,
    ) -> Result<Self, HttpApiError> {
        let base_url = config
            .base_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| HttpApiError::InvalidConfiguration(format!("Invalid base_url: {e}")))?;
        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                config,
                base_url,
                generation,
                created_at: Instant::now(),
            }),
        })
    }

    /// Build a transport straight from a configuration.
    pub fn from_config(config: HttpApiConfig) -> Result<Self, HttpApiError> {
        config.validate()?;
        let http = config.build_http_client()?;
        Self::new(http, config, 0)
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    pub fn config(&self) -> &HttpApiConfig {
        &self.inner.config
    }

    /// Transport generation; a recycled transport gets a higher number.
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    pub fn age(&self) -> std::time::Duration {
        self.inner.created_at.elapsed()
    }

    /// Whether two handles share the same underlying transport.
    pub fn same_transport(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Resolve `path` against the configured base URL.
    pub fn url(&self, path: &str) -> Result<Url, HttpApiError> {
        match &self.inner.base_url {
            Some(base) => base.join(path).map_err(|e| {
                HttpApiError::InvalidConfiguration(format!("Cannot join '{path}' onto {base}: {e}"))
            }),
            None => Url::parse(path).map_err(|e| {
                HttpApiError::InvalidConfiguration(format!(
                    "No base_url configured and '{path}' is not absolute: {e}"
                ))
            }),
        }
    }

    /// Start a request for `path`.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, HttpApiError> {
        Ok(self.inner.http.request(method, self.url(path)?))
    }

    /// Send a request, turning non-success statuses into [`HttpApiError`].
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, HttpApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status.as_u16(), &body))
    }

    /// `GET path` and decode the JSON body.
    pub async fn get_json<R>(&self, path: &str) -> Result<R, HttpApiError>
    where
        R: DeserializeOwned,
    {
        let response = self.execute(self.request(Method::GET, path)?).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Map a non-success status and body into a typed error.
pub fn classify_status(status: u16, body: &str) -> HttpApiError {
    // Limit body sample size to avoid noisy errors
    let body_sample = body.chars().take(200).collect::<String>();
    match status {
        429 => HttpApiError::RateLimitError(format!("http=429 body_sample={body_sample}")),
        404 => HttpApiError::NotFound(format!("http=404 body_sample={body_sample}")),
        _ if body_sample.trim().is_empty() => HttpApiError::api_error(status, "api error"),
        _ => HttpApiError::api_error(status, body_sample),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::from_config(HttpApiConfig::new().with_base_url(base)).unwrap()
    }

    #[test]
    fn joins_paths_onto_base_url() {
        let api = client("https://api.example.com/v1/");
        assert_eq!(
            api.url("users/7").unwrap().as_str(),
            "https://api.example.com/v1/users/7"
        );

        let req = api.request(Method::POST, "users").unwrap().build().unwrap();
        assert_eq!(req.method(), &Method::POST);
        assert_eq!(req.url().as_str(), "https://api.example.com/v1/users");
    }

    #[test]
    fn relative_path_without_base_url_is_rejected() {
        let api = ApiClient::from_config(HttpApiConfig::new()).unwrap();
        assert!(matches!(
            api.url("users"),
            Err(HttpApiError::InvalidConfiguration(_))
        ));
        assert!(api.url("https://example.org/x").is_ok());
    }

    #[test]
    fn clones_share_the_transport() {
        let a = client("https://api.example.com/");
        let b = a.clone();
        let c = client("https://api.example.com/");
        assert!(a.same_transport(&b));
        assert!(!a.same_transport(&c));
    }

    #[test]
    fn classify_status_codes() {
        assert!(matches!(
            classify_status(429, ""),
            HttpApiError::RateLimitError(_)
        ));
        assert!(matches!(classify_status(404, "nope"), HttpApiError::NotFound(_)));
        assert_eq!(
            classify_status(502, "  "),
            HttpApiError::api_error(502, "api error")
        );
        assert_eq!(
            classify_status(500, "boom"),
            HttpApiError::api_error(500, "boom")
        );
    }
}
