//! Bounded retries for remote calls.

use crate::error::{TrainingError, TrainingResult};
use crate::progress::{ProgressEvent, ProgressSink};
use nlu_abstraction::{RemoteError, RemoteErrorKind};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Total attempts allowed for a single remote operation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Which errors are retried and how long to wait before the next attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delays: HashMap<RemoteErrorKind, Duration>,
    honor_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, delays: HashMap::new(), honor_retry_after: false }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts: max_attempts.max(1), ..Self::default() }
    }

    /// Retries errors of `kind` after `delay`.
    #[must_use]
    pub fn with_delay(mut self, kind: RemoteErrorKind, delay: Duration) -> Self {
        self.delays.insert(kind, delay);
        self
    }

    /// Prefer the provider's `Retry-After` hint over the configured delay.
    #[must_use]
    pub fn honoring_retry_after(mut self) -> Self {
        self.honor_retry_after = true;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retrying `err`, or `None` when the error is not transient.
    pub fn delay_for(&self, err: &RemoteError) -> Option<Duration> {
        let configured = self.delays.get(&err.kind).copied()?;
        if self.honor_retry_after {
            Some(err.retry_after.unwrap_or(configured))
        } else {
            Some(configured)
        }
    }
}

/// Runs remote operations under a [`RetryPolicy`].
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    progress: Arc<dyn ProgressSink>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy, progress: Arc<dyn ProgressSink>) -> Self {
        Self { policy, progress }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `op`, retrying errors the policy classifies as transient.
    pub async fn execute<T, F, Fut>(&self, operation: &str, cancel: &CancellationToken, op: F) -> TrainingResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        self.execute_with(operation, cancel, op, |err| self.policy.delay_for(err)).await
    }

    /// Like [`execute`](Self::execute) with a caller-supplied classifier.
    ///
    /// After the final attempt the last remote error is returned unchanged.
    /// Cancellation aborts both in-flight attempts and backoff sleeps.
    pub async fn execute_with<T, F, Fut, C>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut op: F,
        classify: C,
    ) -> TrainingResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
        C: Fn(&RemoteError) -> Option<Duration>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            if cancel.is_cancelled() {
                return Err(TrainingError::Cancelled);
            }

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(TrainingError::Cancelled),
                result = op() => result,
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let Some(delay) = classify(&err) else {
                return Err(err.into());
            };
            if attempt >= self.policy.max_attempts {
                return Err(err.into());
            }

            self.progress.on_event(ProgressEvent::Retrying {
                operation: operation.to_string(),
                kind: err.kind,
                attempt,
                delay,
            });
            sleep_or_cancel(delay, cancel).await?;
        }
    }
}

/// Sleeps for `delay` unless `cancel` fires first.
pub(crate) async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> TrainingResult<()> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(TrainingError::Cancelled),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}
