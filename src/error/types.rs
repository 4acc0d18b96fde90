//! Core error types.

use thiserror::Error;

/// Type-erased failure produced by an operation.
///
/// Failure kinds are ordinary Rust error types; retry clauses select them by
/// downcasting, so the original value is never rewritten on the way through.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the registry, the managed transport and policy construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpApiError {
    /// A policy or transport parameter is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The contract already has a factory.
    #[error("A factory is already registered for contract: {0}")]
    DuplicateRegistration(String),

    /// The contract was resolved before it was registered.
    #[error("No factory registered for contract: {0} (call register first)")]
    NotRegistered(String),

    /// Connection-level HTTP failure.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Timeout error: {0}")]
    TimeoutError(String),

    /// Non-success HTTP status returned by the remote API.
    #[error("API error {code}: {message}")]
    ApiError { code: u16, message: String },

    /// HTTP 429.
    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    /// HTTP 404.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Body (de)serialization failed.
    #[error("JSON error: {0}")]
    JsonError(String),

    /// The surrounding call was cancelled.
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl HttpApiError {
    /// Create an API error from a status code and message.
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
        }
    }

    /// HTTP status associated with this error, if any.
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { code, .. } => Some(*code),
            Self::RateLimitError(_) => Some(429),
            Self::NotFound(_) => Some(404),
            _ => None,
        }
    }

    /// Whether a fresh attempt could plausibly succeed.
    ///
    /// Configuration, registration and cancellation errors are never retryable.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::HttpError(_) | Self::TimeoutError(_) | Self::RateLimitError(_) => true,
            Self::ApiError { code, .. } => *code >= 500 || *code == 408,
            _ => false,
        }
    }

    /// True for errors produced while building or registering, as opposed to
    /// errors coming back from the remote side.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration(_) | Self::DuplicateRegistration(_) | Self::NotRegistered(_)
        )
    }
}
