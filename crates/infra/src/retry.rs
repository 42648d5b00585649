//! Bounded exponential backoff around a single provider call.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::pacing::{DelayKind, Sleeper, uniform_ms};
use crate::provider::ProviderError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound of the attempt loop. The loop runs while
    /// `attempt < max_attempts`, so this is the total number of calls made.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles afterwards.
    pub base_delay: Duration,
    /// Cap applied before jitter.
    pub max_delay: Duration,
    /// Uniform jitter in `[0, max_jitter)` added to every backoff.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            max_jitter: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// `min(max_delay, base_delay * 2^attempt)` for a 0-indexed failed attempt.
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Base backoff plus jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let jitter = uniform_ms(0, self.max_jitter.as_millis() as u64);
        self.base_backoff(attempt) + Duration::from_millis(jitter)
    }
}

/// Outcome of [`send_with_retry`] when no attempt succeeded.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
    /// A non-retryable provider failure, surfaced on the attempt that hit it.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// Every allowed attempt failed transiently.
    #[error("Max retries reached")]
    MaxRetriesExceeded {
        attempts: u32,
        last: Option<ProviderError>,
    },
}

impl SendError {
    pub fn is_max_retries(&self) -> bool {
        matches!(self, Self::MaxRetriesExceeded { .. })
    }
}

/// Run `attempt_fn` until it succeeds, fails permanently, or the policy is exhausted.
///
/// `attempt_fn` receives the 0-indexed attempt number. Backoff is only slept
/// when another attempt will follow.
pub async fn send_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut attempt_fn: F,
) -> Result<T, SendError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    let mut last = None;

    while attempt < policy.max_attempts {
        match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => {
                let failed = attempt;
                attempt += 1;
                if attempt < policy.max_attempts {
                    let delay = policy.backoff(failed);
                    debug!(
                        attempt = failed,
                        status = ?err.http_status(),
                        delay_ms = delay.as_millis() as u64,
                        "transient provider failure; backing off"
                    );
                    sleeper.sleep(DelayKind::Backoff, delay).await;
                }
                last = Some(err);
            }
            Err(err) => return Err(SendError::Provider(err)),
        }
    }

    warn!(
        attempts = attempt,
        last_status = ?last.as_ref().and_then(ProviderError::http_status),
        "giving up after transient provider failures"
    );
    Err(SendError::MaxRetriesExceeded {
        attempts: attempt,
        last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::pacing::RecordingSleeper;

    /// Replays a fixed sequence of outcomes and counts calls.
    struct Script {
        outcomes: Mutex<VecDeque<Result<&'static str, ProviderError>>>,
        calls: Mutex<u32>,
    }

    impl Script {
        fn new(outcomes: Vec<Result<&'static str, ProviderError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(0),
            }
        }

        async fn call(&self) -> Result<&'static str, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok("done"))
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    fn rate_limited() -> Result<&'static str, ProviderError> {
        Err(ProviderError::status(429, None))
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_backoff(0), Duration::from_millis(1000));
        assert_eq!(policy.base_backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.base_backoff(4), Duration::from_millis(16_000));
        assert_eq!(policy.base_backoff(5), Duration::from_millis(30_000));
        assert_eq!(policy.base_backoff(40), Duration::from_millis(30_000));
    }

    #[test]
    fn jitter_is_bounded() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let d = policy.backoff(1);
            assert!(d >= Duration::from_millis(2000));
            assert!(d < Duration::from_millis(2500));
        }
    }

    #[tokio::test]
    async fn succeeds_on_third_call_with_three_attempts() {
        let script = Script::new(vec![rate_limited(), rate_limited(), Ok("wamid.3")]);
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::default().with_max_attempts(3);

        let result = send_with_retry(&policy, &sleeper, |_| script.call()).await;

        assert_eq!(result.unwrap(), "wamid.3");
        assert_eq!(script.calls(), 3);
        assert_eq!(sleeper.count(DelayKind::Backoff), 2);
    }

    #[tokio::test]
    async fn two_attempts_exhaust_before_the_success() {
        let script = Script::new(vec![rate_limited(), rate_limited(), Ok("wamid.3")]);
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::default();

        let err = send_with_retry(&policy, &sleeper, |_| script.call())
            .await
            .unwrap_err();

        assert!(err.is_max_retries());
        assert_eq!(err.to_string(), "Max retries reached");
        assert_eq!(script.calls(), 2);
        // No wait after the final attempt.
        assert_eq!(sleeper.count(DelayKind::Backoff), 1);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let script = Script::new(vec![Err(ProviderError::status(400, None))]);
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::default().with_max_attempts(5);

        let err = send_with_retry(&policy, &sleeper, |_| script.call())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SendError::Provider(ProviderError::Status { status: 400, .. })
        ));
        assert_eq!(script.calls(), 1);
        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let script = Script::new(vec![Err(ProviderError::status(503, None)), Ok("wamid.2")]);
        let sleeper = RecordingSleeper::new();

        let result = send_with_retry(&RetryPolicy::default(), &sleeper, |_| script.call()).await;

        assert_eq!(result.unwrap(), "wamid.2");
        let waits = sleeper.recorded();
        assert_eq!(waits.len(), 1);
        assert!(waits[0].1 >= Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn zero_attempts_never_calls() {
        let script = Script::new(vec![]);
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::default().with_max_attempts(0);

        let err = send_with_retry(&policy, &sleeper, |_| script.call())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SendError::MaxRetriesExceeded {
                attempts: 0,
                last: None
            }
        ));
        assert_eq!(script.calls(), 0);
    }
}
