//! Retry decorator.
//!
//! [`RetryTask`] wraps an [`ApiTask`] with a [`RetryPolicy`]. Each attempt is a
//! fresh invocation of the inner task; clauses are evaluated as soon as the
//! attempt settles.

use std::fmt;
use std::future::IntoFuture;
use std::marker::PhantomData;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, HttpApiError};
use crate::retry::policy::{RetryDelay, RetryPolicy, find_kind};
use crate::retry::task::ApiTask;

/// What the last attempt left behind when the budget ran out.
pub enum RetryCause<T> {
    /// The last attempt failed with a failure matched by a clause.
    Failure(BoxError),
    /// The last attempt succeeded but its value was matched by a result clause.
    Result(T),
}

impl<T: fmt::Debug> fmt::Debug for RetryCause<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failure(err) => f.debug_tuple("Failure").field(err).finish(),
            Self::Result(value) => f.debug_tuple("Result").field(value).finish(),
        }
    }
}

/// Terminal failure raised once the attempt budget is exhausted.
pub struct RetryException<T> {
    attempts: u32,
    cause: RetryCause<T>,
}

impl<T> RetryException<T> {
    /// Total number of attempts made.
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    pub const fn cause(&self) -> &RetryCause<T> {
        &self.cause
    }

    /// Last failure, if the final attempt failed.
    pub fn last_failure(&self) -> Option<&BoxError> {
        match &self.cause {
            RetryCause::Failure(err) => Some(err),
            RetryCause::Result(_) => None,
        }
    }

    /// Last unmet value, if the final attempt succeeded.
    pub const fn last_result(&self) -> Option<&T> {
        match &self.cause {
            RetryCause::Result(value) => Some(value),
            RetryCause::Failure(_) => None,
        }
    }

    pub fn into_cause(self) -> RetryCause<T> {
        self.cause
    }
}

impl<T: fmt::Debug> fmt::Debug for RetryException<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryException")
            .field("attempts", &self.attempts)
            .field("cause", &self.cause)
            .finish()
    }
}

impl<T: fmt::Debug> fmt::Display for RetryException<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            RetryCause::Failure(err) => write!(
                f,
                "retry budget exhausted after {} attempt(s); last failure: {err}",
                self.attempts
            ),
            RetryCause::Result(value) => write!(
                f,
                "retry budget exhausted after {} attempt(s); last result: {value:?}",
                self.attempts
            ),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for RetryException<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            RetryCause::Failure(err) => Some(&**err),
            RetryCause::Result(_) => None,
        }
    }
}

/// Outcome of a decorated call that did not produce a value.
pub enum RetryError<T> {
    /// A clause matched on every attempt until the budget ran out.
    Exhausted(RetryException<T>),
    /// A failure no clause matched, passed through untouched.
    Failed(BoxError),
    /// The cancellation token fired; no further attempts were made.
    Cancelled { attempts: u32 },
}

impl<T> RetryError<T> {
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }

    pub const fn as_exhausted(&self) -> Option<&RetryException<T>> {
        match self {
            Self::Exhausted(exc) => Some(exc),
            _ => None,
        }
    }

    /// The pass-through failure, if that is what this is.
    pub fn as_failed(&self) -> Option<&BoxError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Erase into a [`BoxError`].
    ///
    /// Pass-through failures keep their original box so downcasting still works;
    /// cancellation becomes [`HttpApiError::Cancelled`].
    pub fn into_box_error(self) -> BoxError
    where
        T: fmt::Debug + Send + Sync + 'static,
    {
        match self {
            Self::Exhausted(exc) => Box::new(exc),
            Self::Failed(err) => err,
            Self::Cancelled { attempts } => Box::new(HttpApiError::Cancelled(format!(
                "retry loop cancelled after {attempts} attempt(s)"
            ))),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for RetryError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted(exc) => f.debug_tuple("Exhausted").field(exc).finish(),
            Self::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
            Self::Cancelled { attempts } => f
                .debug_struct("Cancelled")
                .field("attempts", attempts)
                .finish(),
        }
    }
}

impl<T: fmt::Debug> fmt::Display for RetryError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted(exc) => fmt::Display::fmt(exc, f),
            Self::Failed(err) => fmt::Display::fmt(err, f),
            Self::Cancelled { attempts } => {
                write!(f, "retry loop cancelled after {attempts} attempt(s)")
            }
        }
    }
}

impl<T: fmt::Debug> std::error::Error for RetryError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Exhausted(exc) => exc.source(),
            Self::Failed(err) => err.source(),
            Self::Cancelled { .. } => None,
        }
    }
}

/// An [`ApiTask`] decorated with a retry policy.
pub struct RetryTask<T, A> {
    inner: A,
    policy: RetryPolicy<T>,
    cancellation: Option<CancellationToken>,
    _output: PhantomData<fn() -> T>,
}

impl<T, A> fmt::Debug for RetryTask<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryTask")
            .field("policy", &self.policy)
            .field("cancellable", &self.cancellation.is_some())
            .finish_non_exhaustive()
    }
}

impl<T, A> RetryTask<T, A>
where
    A: ApiTask<T>,
{
    pub const fn new(inner: A, policy: RetryPolicy<T>) -> Self {
        Self {
            inner,
            policy,
            cancellation: None,
            _output: PhantomData,
        }
    }

    pub const fn policy(&self) -> &RetryPolicy<T> {
        &self.policy
    }

    /// See [`RetryPolicy::when_catch`].
    pub fn when_catch<K>(mut self) -> Self
    where
        K: std::error::Error + 'static,
    {
        self.policy = self.policy.when_catch::<K>();
        self
    }

    /// See [`RetryPolicy::when_catch_where`].
    pub fn when_catch_where<K, F>(mut self, predicate: F) -> Self
    where
        K: std::error::Error + 'static,
        F: Fn(&K) -> bool + Send + Sync + 'static,
    {
        self.policy = self.policy.when_catch_where::<K, F>(predicate);
        self
    }

    /// See [`RetryPolicy::when_retryable`].
    pub fn when_retryable(mut self) -> Self {
        self.policy = self.policy.when_retryable();
        self
    }

    /// See [`RetryPolicy::when_result`].
    pub fn when_result<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.policy = self.policy.when_result(predicate);
        self
    }

    pub fn with_delay(mut self, delay: RetryDelay) -> Self {
        self.policy = self.policy.with_delay(delay);
        self
    }

    /// Stop retrying as soon as `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Run the decorated task until success, a pass-through failure, cancellation
    /// or budget exhaustion.
    pub async fn run(&self) -> Result<T, RetryError<T>>
    where
        T: Send,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0u32;

        loop {
            if self.is_cancelled() {
                return Err(RetryError::Cancelled { attempts: attempt });
            }
            attempt += 1;

            let outcome = match &self.cancellation {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(RetryError::Cancelled { attempts: attempt }),
                    outcome = self.inner.invoke() => outcome,
                },
                None => self.inner.invoke().await,
            };

            let cause = match outcome {
                Ok(value) => {
                    if !self.policy.should_retry_result(&value) {
                        return Ok(value);
                    }
                    RetryCause::Result(value)
                }
                Err(err) => {
                    // Cancellation from a nested decorator is never retried
                    if is_cancellation(&err) {
                        return Err(RetryError::Cancelled { attempts: attempt });
                    }
                    if !self.policy.should_retry_failure(&err) {
                        return Err(RetryError::Failed(err));
                    }
                    RetryCause::Failure(err)
                }
            };

            if attempt >= max_attempts {
                tracing::warn!(
                    attempts = attempt,
                    retried_result = matches!(cause, RetryCause::Result(_)),
                    "retry budget exhausted"
                );
                return Err(RetryError::Exhausted(RetryException {
                    attempts: attempt,
                    cause,
                }));
            }

            match &cause {
                RetryCause::Failure(err) => {
                    tracing::debug!(attempt, max_attempts, error = %err, "attempt failed, retrying");
                }
                RetryCause::Result(_) => {
                    tracing::debug!(attempt, max_attempts, "result matched retry clause, retrying");
                }
            }

            let delay = self.policy.delay().delay_for(attempt);
            if !delay.is_zero() {
                match &self.cancellation {
                    Some(token) => tokio::select! {
                        biased;
                        _ = token.cancelled() => return Err(RetryError::Cancelled { attempts: attempt }),
                        _ = tokio::time::sleep(delay) => {}
                    },
                    None => tokio::time::sleep(delay).await,
                }
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

fn is_cancellation(err: &BoxError) -> bool {
    find_kind::<HttpApiError>(&**err).is_some_and(|e| matches!(e, HttpApiError::Cancelled(_)))
}

#[async_trait]
impl<T, A> ApiTask<T> for RetryTask<T, A>
where
    A: ApiTask<T>,
    T: fmt::Debug + Send + Sync + 'static,
{
    async fn invoke(&self) -> Result<T, BoxError> {
        self.run().await.map_err(RetryError::into_box_error)
    }
}

impl<T, A> IntoFuture for RetryTask<T, A>
where
    A: ApiTask<T> + 'static,
    T: Send + 'static,
{
    type Output = Result<T, RetryError<T>>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.run().await })
    }
}
