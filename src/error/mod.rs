//! Error Handling Module
//!
//! This module provides the error types shared by the retry engine and the
//! contract registry:
//! - `HttpApiError`: configuration, registration and transport failures
//! - `BoxError`: the type-erased failure produced by an operation
//! - Type conversions from common error types
//!
//! # Example
//!
//! ```rust,ignore
//! use httpapi::error::HttpApiError;
//!
//! let error = HttpApiError::api_error(503, "Service unavailable");
//! assert!(error.is_retryable());
//! ```

// Module declarations
mod conversions;
pub mod types;

// Re-exports for public API
pub use types::*;
