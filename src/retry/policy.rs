//! Retry Policy Module
//!
//! A [`RetryPolicy`] is an attempt budget plus an ordered list of clauses.
//! Failure clauses look at the error an attempt failed with; result clauses look
//! at a successful value and may flag it as needing another attempt. Clauses of
//! the same kind combine with logical OR.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::error::{BoxError, HttpApiError};

type FailureClause = Arc<dyn Fn(&(dyn StdError + 'static)) -> bool + Send + Sync>;
type ResultClause<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
type DelayFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Pause inserted between two attempts.
#[derive(Clone, Default)]
pub enum RetryDelay {
    /// Re-invoke immediately.
    #[default]
    None,
    /// Same pause after every attempt.
    Fixed(Duration),
    /// `initial * multiplier^(attempt - 1)`, capped at `max`.
    Exponential {
        initial: Duration,
        multiplier: f64,
        max: Duration,
        /// Maximum jitter as a fraction of the delay (0.0 to 1.0).
        jitter: f64,
    },
    /// Pause computed from the 1-based number of the attempt that just failed.
    Custom(DelayFn),
}

impl fmt::Debug for RetryDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Fixed(d) => f.debug_tuple("Fixed").field(d).finish(),
            Self::Exponential {
                initial,
                multiplier,
                max,
                jitter,
            } => f
                .debug_struct("Exponential")
                .field("initial", initial)
                .field("multiplier", multiplier)
                .field("max", max)
                .field("jitter", jitter)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

impl RetryDelay {
    /// Exponential delay without jitter.
    pub const fn exponential(initial: Duration, multiplier: f64, max: Duration) -> Self {
        Self::Exponential {
            initial,
            multiplier,
            max,
            jitter: 0.0,
        }
    }

    /// Custom delay function, called with the 1-based attempt number.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Delay to wait after `attempt` (1-based) failed or was rejected.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed(d) => *d,
            Self::Exponential {
                initial,
                multiplier,
                max,
                jitter,
            } => {
                let exp = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
                let base = initial.as_millis() as f64 * multiplier.powi(exp);
                let delay = Duration::from_millis(base.min(u64::MAX as f64) as u64).min(*max);
                if *jitter > 0.0 {
                    add_jitter(delay, jitter.clamp(0.0, 1.0))
                } else {
                    delay
                }
            }
            Self::Custom(f) => f(attempt),
        }
    }
}

fn add_jitter(delay: Duration, factor: f64) -> Duration {
    let mut rng = rand::thread_rng();
    let range = delay.as_millis() as f64 * factor;
    if range <= 0.0 {
        return delay;
    }
    let jitter = rng.gen_range(-range..=range);
    Duration::from_millis((delay.as_millis() as f64 + jitter).max(0.0) as u64)
}

/// Attempt budget and retry clauses for one logical call.
pub struct RetryPolicy<T> {
    max_attempts: u32,
    failure_clauses: Vec<FailureClause>,
    result_clauses: Vec<ResultClause<T>>,
    delay: RetryDelay,
}

impl<T> Clone for RetryPolicy<T> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            failure_clauses: self.failure_clauses.clone(),
            result_clauses: self.result_clauses.clone(),
            delay: self.delay.clone(),
        }
    }
}

impl<T> fmt::Debug for RetryPolicy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("failure_clauses", &self.failure_clauses.len())
            .field("result_clauses", &self.result_clauses.len())
            .field("delay", &self.delay)
            .finish()
    }
}

impl<T> RetryPolicy<T> {
    /// Create a policy allowing `max_attempts` total attempts.
    pub fn new(max_attempts: u32) -> Result<Self, HttpApiError> {
        if max_attempts < 1 {
            return Err(HttpApiError::InvalidConfiguration(format!(
                "max_attempts must be >= 1 (got {max_attempts})"
            )));
        }
        Ok(Self {
            max_attempts,
            failure_clauses: Vec::new(),
            result_clauses: Vec::new(),
            delay: RetryDelay::None,
        })
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub const fn delay(&self) -> &RetryDelay {
        &self.delay
    }

    /// Retry failures of kind `K`, found anywhere in the error's source chain.
    pub fn when_catch<K>(mut self) -> Self
    where
        K: StdError + 'static,
    {
        self.failure_clauses
            .push(Arc::new(|err: &(dyn StdError + 'static)| {
                find_kind::<K>(err).is_some()
            }));
        self
    }

    /// Retry failures of kind `K` for which `predicate` holds.
    pub fn when_catch_where<K, F>(mut self, predicate: F) -> Self
    where
        K: StdError + 'static,
        F: Fn(&K) -> bool + Send + Sync + 'static,
    {
        self.failure_clauses
            .push(Arc::new(move |err: &(dyn StdError + 'static)| {
                find_kind::<K>(err).is_some_and(&predicate)
            }));
        self
    }

    /// Retry transient [`HttpApiError`]s (timeouts, 429, 5xx).
    pub fn when_retryable(self) -> Self {
        self.when_catch_where::<HttpApiError, _>(HttpApiError::is_retryable)
    }

    /// Treat a successful value matching `predicate` as needing another attempt.
    pub fn when_result<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.result_clauses.push(Arc::new(predicate));
        self
    }

    pub fn with_delay(mut self, delay: RetryDelay) -> Self {
        self.delay = delay;
        self
    }

    /// Whether a failed attempt should be retried.
    ///
    /// Without failure clauses every failure qualifies.
    pub fn should_retry_failure(&self, err: &BoxError) -> bool {
        if self.failure_clauses.is_empty() {
            return true;
        }
        let err: &(dyn StdError + 'static) = &**err;
        self.failure_clauses.iter().any(|clause| clause(err))
    }

    /// Whether a successful value should be retried.
    ///
    /// Without result clauses no value qualifies.
    pub fn should_retry_result(&self, value: &T) -> bool {
        self.result_clauses.iter().any(|clause| clause(value))
    }
}

pub(crate) fn find_kind<'a, K>(err: &'a (dyn StdError + 'static)) -> Option<&'a K>
where
    K: StdError + 'static,
{
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(kind) = e.downcast_ref::<K>() {
            return Some(kind);
        }
        current = e.source();
    }
    None
}
