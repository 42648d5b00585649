//! Send pacing: how long to wait between messages, batches and retries.
//!
//! The provider throttles per phone-number-id; pacing every message with a
//! randomized gap keeps a bulk send under that ceiling. All waits go through a
//! [`Sleeper`] so tests can observe them without spending wall-clock time.

use std::sync::Mutex;
use std::time::Duration;

use rand::Rng;

pub const DEFAULT_MIN_MESSAGE_DELAY: Duration = Duration::from_millis(1200);
pub const DEFAULT_MAX_MESSAGE_DELAY: Duration = Duration::from_millis(2400);
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(10_000);

/// Why a task is waiting.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DelayKind {
    /// After every contact, regardless of outcome.
    Message,
    /// Between two consecutive batches.
    Batch,
    /// Before re-attempting a transient provider failure.
    Backoff,
}

/// Inter-message and inter-batch delay computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayPolicy {
    pub min_message_delay: Duration,
    pub max_message_delay: Duration,
    pub batch_delay: Duration,
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self {
            min_message_delay: DEFAULT_MIN_MESSAGE_DELAY,
            max_message_delay: DEFAULT_MAX_MESSAGE_DELAY,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }
}

impl DelayPolicy {
    /// A policy that never waits.
    pub fn none() -> Self {
        Self {
            min_message_delay: Duration::ZERO,
            max_message_delay: Duration::ZERO,
            batch_delay: Duration::ZERO,
        }
    }

    /// Uniform in `[min, max)` at millisecond granularity.
    ///
    /// Collapses to `min` when the range is empty.
    pub fn inter_message_delay(&self) -> Duration {
        let min = self.min_message_delay.as_millis() as u64;
        let max = self.max_message_delay.as_millis() as u64;
        Duration::from_millis(uniform_ms(min, max))
    }

    pub fn inter_batch_delay(&self) -> Duration {
        self.batch_delay
    }
}

/// Random integer in `[low, high)`, or `low` when that range is empty.
pub(crate) fn uniform_ms(low: u64, high: u64) -> u64 {
    if high <= low {
        return low;
    }
    rand::thread_rng().gen_range(low..high)
}

/// Suspension point used by the dispatcher and the retry loop.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, kind: DelayKind, duration: Duration);
}

/// Real timer backed by `tokio::time::sleep`.
#[derive(Debug, Default, Copy, Clone)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, _kind: DelayKind, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Records requested waits and returns immediately (tests/dev).
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<(DelayKind, Duration)>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every wait requested so far, in order.
    pub fn recorded(&self) -> Vec<(DelayKind, Duration)> {
        self.slept
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, kind: DelayKind) -> usize {
        self.recorded().iter().filter(|(k, _)| *k == kind).count()
    }
}

#[async_trait::async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, kind: DelayKind, duration: Duration) {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push((kind, duration));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let policy = DelayPolicy::default();
        assert_eq!(policy.min_message_delay, Duration::from_millis(1200));
        assert_eq!(policy.max_message_delay, Duration::from_millis(2400));
        assert_eq!(policy.inter_batch_delay(), Duration::from_millis(10_000));
    }

    #[test]
    fn message_delay_stays_in_half_open_range() {
        let policy = DelayPolicy {
            min_message_delay: Duration::from_millis(10),
            max_message_delay: Duration::from_millis(13),
            batch_delay: Duration::ZERO,
        };
        for _ in 0..200 {
            let d = policy.inter_message_delay();
            assert!(d >= Duration::from_millis(10));
            assert!(d < Duration::from_millis(13));
        }
    }

    #[test]
    fn empty_range_collapses_to_min() {
        let policy = DelayPolicy {
            min_message_delay: Duration::from_millis(500),
            max_message_delay: Duration::from_millis(500),
            batch_delay: Duration::ZERO,
        };
        assert_eq!(policy.inter_message_delay(), Duration::from_millis(500));
        assert_eq!(DelayPolicy::none().inter_message_delay(), Duration::ZERO);
    }

    #[tokio::test]
    async fn recording_sleeper_counts_by_kind() {
        let sleeper = RecordingSleeper::new();
        sleeper.sleep(DelayKind::Message, Duration::from_millis(1)).await;
        sleeper.sleep(DelayKind::Batch, Duration::from_millis(2)).await;
        sleeper.sleep(DelayKind::Message, Duration::from_millis(3)).await;

        assert_eq!(sleeper.count(DelayKind::Message), 2);
        assert_eq!(sleeper.count(DelayKind::Batch), 1);
        assert_eq!(sleeper.count(DelayKind::Backoff), 0);
    }
}
