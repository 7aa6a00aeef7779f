//! Retry scheduling with exponential backoff
//!
//! The scheduler drives a remainder (unprocessed writes or unanswered keys)
//! through repeated submission rounds. Round 1 is the initial submission;
//! every later round is preceded by a backoff wait, so a policy with
//! `max_attempts = n` performs at most `n` rounds and `n - 1` waits.
//! Only the remainder of the previous round is ever resubmitted.

use super::batch::UnprocessedSet;
use super::cancel::Cancellation;
use super::item::ItemRef;
use super::outcome::OutcomeStatus;
use crate::utils::error::{BatchError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retry policy for unprocessed items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of submission rounds, including the first
    pub max_attempts: u32,
    /// Wait before the second round
    pub base_delay: Duration,
    /// Multiplier applied to the wait after every round
    pub backoff_factor: f64,
    /// Upper bound for a single wait
    pub max_delay: Option<Duration>,
    /// Whether to add ±5% random jitter to each wait
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(200),
            backoff_factor: 2.0,
            max_delay: None,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Create a validated policy
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Result<Self> {
        let policy = Self {
            max_attempts,
            base_delay,
            backoff_factor,
            ..Self::default()
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Set the maximum single wait
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts < 1 {
            return Err(BatchError::config("retry max_attempts must be at least 1"));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor <= 1.0 {
            return Err(BatchError::config(format!(
                "retry backoff_factor must be a finite number greater than 1, got {}",
                self.backoff_factor
            )));
        }
        if let Some(max_delay) = self.max_delay {
            if max_delay < self.base_delay {
                return Err(BatchError::config(
                    "retry max_delay must not be smaller than base_delay",
                ));
            }
        }
        Ok(())
    }

    /// Wait that follows `current` in the schedule
    pub fn next_delay(&self, current: Duration) -> Duration {
        let nanos = (current.as_nanos() as f64 * self.backoff_factor).round();
        let next = if nanos >= u64::MAX as f64 {
            Duration::from_nanos(u64::MAX)
        } else {
            Duration::from_nanos(nanos as u64)
        };
        self.cap(next)
    }

    /// The waits between consecutive rounds, without jitter
    pub fn backoff_schedule(&self) -> Vec<Duration> {
        let waits = self.max_attempts.saturating_sub(1) as usize;
        let mut schedule = Vec::with_capacity(waits);
        let mut delay = self.cap(self.base_delay);
        for _ in 0..waits {
            schedule.push(delay);
            delay = self.next_delay(delay);
        }
        schedule
    }

    fn cap(&self, delay: Duration) -> Duration {
        match self.max_delay {
            Some(max_delay) => delay.min(max_delay),
            None => delay,
        }
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter {
            return delay;
        }
        let jitter_factor = 0.1;
        self.cap(delay.mul_f64(1.0 + jitter_factor * (rand::random::<f64>() - 0.5)))
    }
}

/// Work that still has to be resubmitted
pub trait Remainder: Clone {
    fn is_empty(&self) -> bool;
    fn len(&self) -> usize;
}

impl Remainder for UnprocessedSet {
    fn is_empty(&self) -> bool {
        UnprocessedSet::is_empty(self)
    }

    fn len(&self) -> usize {
        UnprocessedSet::len(self)
    }
}

impl Remainder for Vec<ItemRef> {
    fn is_empty(&self) -> bool {
        <[ItemRef]>::is_empty(self)
    }

    fn len(&self) -> usize {
        <[ItemRef]>::len(self)
    }
}

/// Final state of a scheduler run
#[derive(Debug, Clone, PartialEq)]
pub struct RetryRun<R> {
    pub remaining: R,
    pub attempts_used: u32,
    pub status: OutcomeStatus,
}

/// Drives a remainder to empty or to budget exhaustion
#[derive(Debug, Clone)]
pub struct RetryScheduler {
    policy: RetryPolicy,
}

impl RetryScheduler {
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run submission rounds until nothing is left, attempts run out, or
    /// `cancel` fires
    ///
    /// `submit_round` receives the current remainder and returns the part of
    /// it the store did not process. A round error aborts the run at once.
    /// Cancellation during a round returns that round's input as the
    /// remainder, since its fate is unknown; cancellation during a wait
    /// returns the remainder of the round that just finished.
    pub async fn run<R, F, Fut>(
        &self,
        initial: R,
        cancel: &Cancellation,
        mut submit_round: F,
    ) -> Result<RetryRun<R>>
    where
        R: Remainder,
        F: FnMut(R) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        if initial.is_empty() {
            return Ok(RetryRun {
                remaining: initial,
                attempts_used: 0,
                status: OutcomeStatus::Completed,
            });
        }

        let mut current = initial;
        let mut attempt: u32 = 0;
        let mut delay = self.policy.cap(self.policy.base_delay);

        loop {
            if cancel.is_cancelled() {
                return Ok(self.cancelled(current, attempt));
            }

            attempt += 1;
            debug!(
                attempt = attempt,
                pending = current.len(),
                "Submitting batch round"
            );

            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Ok(self.cancelled(current, attempt));
                }
                result = submit_round(current.clone()) => result?,
            };
            current = next;

            if current.is_empty() {
                if attempt > 1 {
                    info!(attempt = attempt, "Unprocessed items drained");
                }
                return Ok(RetryRun {
                    remaining: current,
                    attempts_used: attempt,
                    status: OutcomeStatus::Completed,
                });
            }

            if attempt >= self.policy.max_attempts {
                warn!(
                    attempts = attempt,
                    remaining = current.len(),
                    "Retry budget exceeded with unprocessed items"
                );
                return Ok(RetryRun {
                    remaining: current,
                    attempts_used: attempt,
                    status: OutcomeStatus::RetryBudgetExceeded,
                });
            }

            let wait = self.policy.jittered(delay);
            warn!(
                attempt = attempt,
                remaining = current.len(),
                delay_ms = wait.as_millis() as u64,
                "Round left unprocessed items, backing off"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Ok(self.cancelled(current, attempt));
                }
                _ = tokio::time::sleep(wait) => {}
            }

            delay = self.policy.next_delay(delay);
        }
    }

    fn cancelled<R: Remainder>(&self, remaining: R, attempts_used: u32) -> RetryRun<R> {
        warn!(
            attempts = attempts_used,
            remaining = remaining.len(),
            "Batch operation cancelled"
        );
        RetryRun {
            remaining,
            attempts_used,
            status: OutcomeStatus::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::time::Instant;

    fn refs(n: usize) -> Vec<ItemRef> {
        (0..n)
            .map(|i| {
                ItemRef::new(
                    "products",
                    crate::core::batch::ItemKey::hash(
                        "id",
                        crate::core::batch::AttributeValue::number(i),
                    ),
                )
            })
            .collect()
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1), 2.0).unwrap()
    }

    #[test]
    fn test_default_backoff_schedule() {
        let policy = RetryPolicy::new(5, Duration::from_millis(200), 2.0).unwrap();
        assert_eq!(
            policy.backoff_schedule(),
            vec![
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
                Duration::from_millis(1600),
            ]
        );
    }

    #[test]
    fn test_schedule_respects_max_delay() {
        let policy = RetryPolicy::new(5, Duration::from_millis(200), 3.0)
            .unwrap()
            .with_max_delay(Duration::from_millis(1000));
        assert_eq!(
            policy.backoff_schedule(),
            vec![
                Duration::from_millis(200),
                Duration::from_millis(600),
                Duration::from_millis(1000),
                Duration::from_millis(1000),
            ]
        );
    }

    #[test]
    fn test_single_attempt_has_no_waits() {
        assert!(fast_policy(1).backoff_schedule().is_empty());
    }

    #[test]
    fn test_invalid_policies() {
        assert!(matches!(
            RetryPolicy::new(0, Duration::from_millis(200), 2.0),
            Err(BatchError::Config(_))
        ));
        assert!(RetryPolicy::new(3, Duration::from_millis(200), 1.0).is_err());
        assert!(RetryPolicy::new(3, Duration::from_millis(200), f64::NAN).is_err());

        let policy = RetryPolicy {
            max_delay: Some(Duration::from_millis(10)),
            ..RetryPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_jitter_stays_within_five_percent() {
        let policy = RetryPolicy::default().with_jitter(true);
        for _ in 0..100 {
            let wait = policy.jittered(Duration::from_millis(1000));
            assert!(wait >= Duration::from_millis(950) && wait <= Duration::from_millis(1050));
        }
    }

    #[test]
    fn test_jitter_keeps_sub_millisecond_delays() {
        let policy = RetryPolicy::default().with_jitter(true);
        for _ in 0..100 {
            let wait = policy.jittered(Duration::from_micros(500));
            assert!(wait >= Duration::from_micros(475) && wait <= Duration::from_micros(525));
        }
    }

    #[tokio::test]
    async fn test_empty_remainder_makes_no_calls() {
        let scheduler = RetryScheduler::new(fast_policy(5)).unwrap();
        let calls = Arc::new(Mutex::new(0u32));

        let run = scheduler
            .run(Vec::<ItemRef>::new(), &Cancellation::never(), |pending| {
                let calls = calls.clone();
                async move {
                    *calls.lock() += 1;
                    Ok(pending)
                }
            })
            .await
            .unwrap();

        assert_eq!(run.attempts_used, 0);
        assert_eq!(run.status, OutcomeStatus::Completed);
        assert_eq!(*calls.lock(), 0);
    }

    #[tokio::test]
    async fn test_exhaustion_uses_every_attempt() {
        let scheduler = RetryScheduler::new(fast_policy(4)).unwrap();
        let calls = Arc::new(Mutex::new(0u32));

        let run = scheduler
            .run(refs(3), &Cancellation::never(), |pending| {
                let calls = calls.clone();
                async move {
                    *calls.lock() += 1;
                    Ok(pending)
                }
            })
            .await
            .unwrap();

        assert_eq!(*calls.lock(), 4);
        assert_eq!(run.attempts_used, 4);
        assert_eq!(run.status, OutcomeStatus::RetryBudgetExceeded);
        assert_eq!(run.remaining, refs(3));
    }

    #[tokio::test]
    async fn test_only_remainder_is_resubmitted() {
        let scheduler = RetryScheduler::new(fast_policy(5)).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let run = scheduler
            .run(refs(10), &Cancellation::never(), |pending: Vec<ItemRef>| {
                let seen = seen.clone();
                async move {
                    seen.lock().push(pending.len());
                    // Each round drops half of what it was given
                    Ok(pending.into_iter().skip(5).collect::<Vec<_>>())
                }
            })
            .await
            .unwrap();

        assert_eq!(*seen.lock(), vec![10, 5]);
        assert_eq!(run.attempts_used, 2);
        assert_eq!(run.status, OutcomeStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_follow_backoff_schedule() {
        let policy = RetryPolicy::new(5, Duration::from_millis(200), 2.0).unwrap();
        let scheduler = RetryScheduler::new(policy).unwrap();
        let stamps = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();

        scheduler
            .run(refs(1), &Cancellation::never(), |pending| {
                let stamps = stamps.clone();
                async move {
                    stamps.lock().push(start.elapsed());
                    Ok(pending)
                }
            })
            .await
            .unwrap();

        let stamps = stamps.lock().clone();
        let gaps: Vec<Duration> = stamps.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
                Duration::from_millis(1600),
            ]
        );
    }

    #[tokio::test]
    async fn test_round_error_aborts() {
        let scheduler = RetryScheduler::new(fast_policy(5)).unwrap();
        let result = scheduler
            .run(refs(2), &Cancellation::never(), |_pending| async {
                Err::<Vec<ItemRef>, _>(BatchError::permanent("access denied"))
            })
            .await;
        assert!(matches!(result, Err(BatchError::Permanent(_))));
    }

    #[tokio::test]
    async fn test_already_cancelled_makes_no_calls() {
        let scheduler = RetryScheduler::new(fast_policy(5)).unwrap();
        let (handle, cancel) = Cancellation::new();
        handle.cancel();
        let calls = Arc::new(Mutex::new(0u32));

        let run = scheduler
            .run(refs(2), &cancel, |pending| {
                let calls = calls.clone();
                async move {
                    *calls.lock() += 1;
                    Ok(pending)
                }
            })
            .await
            .unwrap();

        assert_eq!(*calls.lock(), 0);
        assert_eq!(run.status, OutcomeStatus::Cancelled);
        assert_eq!(run.attempts_used, 0);
        assert_eq!(run.remaining, refs(2));
    }
}
