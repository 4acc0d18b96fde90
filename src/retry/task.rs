//! # Deferred units of work (`ApiTask`)
//!
//! An [`ApiTask`] produces a `T` asynchronously or fails with a [`BoxError`].
//! Invoking it twice runs the underlying work twice; retry decorators rely on
//! that to re-execute an operation without rebuilding it.
//!
//! [`TaskFn`] adapts a closure returning a future, creating a fresh future per
//! invocation. Shared state between invocations has to be explicit (`Arc<...>`
//! inside the closure).

use std::future::Future;

use async_trait::async_trait;

use crate::error::{BoxError, HttpApiError};
use crate::retry::policy::RetryPolicy;
use crate::retry::retry_task::RetryTask;

/// Asynchronous, re-invocable unit of work.
///
/// The only suspension point is awaiting the wrapped work; failures propagate
/// unmodified.
#[async_trait]
pub trait ApiTask<T>: Send + Sync {
    async fn invoke(&self) -> Result<T, BoxError>;
}

/// Function-backed task.
#[derive(Debug, Clone)]
pub struct TaskFn<F> {
    f: F,
}

impl<F> TaskFn<F> {
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

/// Wrap a closure `Fn() -> impl Future<Output = Result<T, E>>` as an [`ApiTask`].
///
/// ```rust,ignore
/// let task = task_fn(|| async { Ok::<_, HttpApiError>("pong") });
/// ```
pub const fn task_fn<F>(f: F) -> TaskFn<F> {
    TaskFn::new(f)
}

#[async_trait]
impl<F, Fut, T, E> ApiTask<T> for TaskFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
    T: Send + 'static,
{
    async fn invoke(&self) -> Result<T, BoxError> {
        (self.f)().await.map_err(Into::into)
    }
}

#[async_trait]
impl<T, A> ApiTask<T> for std::sync::Arc<A>
where
    A: ApiTask<T> + ?Sized,
    T: 'static,
{
    async fn invoke(&self) -> Result<T, BoxError> {
        (**self).invoke().await
    }
}

/// Fluent retry attachment for every [`ApiTask`].
pub trait ApiTaskExt<T>: ApiTask<T> + Sized {
    /// Decorate this task with a retry budget of `max_attempts` total attempts.
    ///
    /// Fails with [`HttpApiError::InvalidConfiguration`] when `max_attempts` is 0.
    fn retry(self, max_attempts: u32) -> Result<RetryTask<T, Self>, HttpApiError> {
        Ok(RetryTask::new(self, RetryPolicy::new(max_attempts)?))
    }

    /// Decorate this task with a prebuilt policy.
    fn with_retry_policy(self, policy: RetryPolicy<T>) -> RetryTask<T, Self> {
        RetryTask::new(self, policy)
    }
}

impl<T, A: ApiTask<T>> ApiTaskExt<T> for A {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn task_fn_creates_a_fresh_future_per_invocation() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let task = task_fn(move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok::<_, HttpApiError>(n)
            }
        });

        assert_eq!(task.invoke().await.unwrap(), 1);
        assert_eq!(task.invoke().await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_boxed_without_rewriting() {
        let task = task_fn(|| async { Err::<(), _>(HttpApiError::NotFound("/users/7".into())) });
        let err = task.invoke().await.unwrap_err();
        let original = err.downcast_ref::<HttpApiError>().expect("same error type");
        assert_eq!(original, &HttpApiError::NotFound("/users/7".into()));
    }

    #[test]
    fn zero_attempts_is_rejected_synchronously() {
        let task = task_fn(|| async { Ok::<_, HttpApiError>(()) });
        let err = task.retry(0).err().expect("zero attempts must fail");
        assert!(matches!(err, HttpApiError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn shared_tasks_delegate_through_arc() {
        let task: Arc<dyn ApiTask<&'static str>> =
            Arc::new(task_fn(|| async { Ok::<_, HttpApiError>("shared") }));
        assert_eq!(task.invoke().await.unwrap(), "shared");
    }
}
