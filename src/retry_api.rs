//! Public Retry API Facade
//!
//! Closure-based entry points for call sites that do not want to build an
//! [`ApiTask`](crate::retry::ApiTask) explicitly.
//!
//! Example
//! ```rust,no_run
//! use httpapi::retry_api::{retry_with, RetryPolicy};
//! use httpapi::HttpApiError;
//!
//! # async fn fetch() -> Result<String, HttpApiError> { Ok("ok".into()) }
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = RetryPolicy::new(3)?.when_retryable();
//! let body = retry_with(policy, || fetch()).await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;

use crate::error::BoxError;
use crate::retry::{ApiTaskExt, RetryError, task_fn};

// Re-export core types for convenience
pub use crate::retry::{RetryDelay, RetryPolicy};

/// Run `operation` under `policy`.
pub async fn retry_with<F, Fut, T, E>(
    policy: RetryPolicy<T>,
    operation: F,
) -> Result<T, RetryError<T>>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
    T: Send + 'static,
{
    task_fn(operation).with_retry_policy(policy).run().await
}

/// Retry only when a policy is provided.
///
/// Without a policy the operation runs once and its failure is passed through
/// as [`RetryError::Failed`].
pub async fn maybe_retry<F, Fut, T, E>(
    policy: Option<RetryPolicy<T>>,
    operation: F,
) -> Result<T, RetryError<T>>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
    T: Send + 'static,
{
    match policy {
        Some(policy) => retry_with(policy, operation).await,
        None => operation()
            .await
            .map_err(|e| RetryError::Failed(e.into())),
    }
}
