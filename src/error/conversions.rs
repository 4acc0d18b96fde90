//! Type Conversions for HttpApiError
//!
//! This module contains From trait implementations for converting
//! common error types into HttpApiError.

use super::types::HttpApiError;

// From implementations
impl From<reqwest::Error> for HttpApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::TimeoutError(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::api_error(status.as_u16(), err.to_string());
        }
        if err.is_decode() {
            return Self::JsonError(err.to_string());
        }
        if err.is_builder() {
            return Self::InvalidConfiguration(err.to_string());
        }
        Self::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for HttpApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: HttpApiError = json_err.into();
        assert!(matches!(err, HttpApiError::JsonError(_)));
    }

    #[test]
    fn test_from_reqwest_builder_error() {
        let req_err = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();
        let err: HttpApiError = req_err.into();
        assert!(matches!(err, HttpApiError::InvalidConfiguration(_)));
    }
}
