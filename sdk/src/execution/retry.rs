//! The generic attempt loop shared by node submission and REST queries.
//!
//! Callers supply one closure that performs a single attempt and classifies
//! its result. The loop owns pacing, the attempt budget, and the overall
//! deadline. It never inspects transport details itself.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Attempt budget and pacing for one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub min_backoff: Duration,
    /// Ceiling on any single delay. Not a cap on the total.
    pub max_backoff: Duration,
    /// Wall-clock deadline for every attempt and delay combined.
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: config::DEFAULT_MAX_ATTEMPTS,
            min_backoff: config::DEFAULT_MIN_BACKOFF,
            max_backoff: config::DEFAULT_MAX_BACKOFF,
            request_timeout: config::DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Checks the invariants every setter relies on.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::argument("maxAttempts must be greater than zero"));
        }
        if self.min_backoff > self.max_backoff {
            return Err(Error::argument(format!(
                "minBackoff ({} ms) must not exceed maxBackoff ({} ms)",
                self.min_backoff.as_millis(),
                self.max_backoff.as_millis()
            )));
        }
        Ok(())
    }

    /// Delay to wait after attempt `attempt` (1-based) failed:
    /// `min(min_backoff * 2^(attempt - 1), max_backoff)`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.min_backoff
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

// ---------------------------------------------------------------------------
// Attempt Outcome
// ---------------------------------------------------------------------------

/// How a single attempt ended, as judged by the caller.
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    Success(T),
    /// Transient failure. Wait out the backoff and try again.
    Retry(Error),
    /// The node failed rather than the request. Try another node right away.
    NextNode(Error),
    /// Trying again cannot help.
    Fatal(Error),
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Runs `attempt` until it succeeds, fails fatally, exhausts the policy's
/// attempt budget, or the overall deadline passes.
///
/// Attempts are strictly sequential: attempt `n + 1` starts only after
/// attempt `n` has an outcome. On exhaustion the last error comes back
/// unchanged so callers can see the real cause.
pub async fn execute_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    attempt: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AttemptOutcome<T>>,
{
    let started = Instant::now();
    match tokio::time::timeout(policy.request_timeout, run_attempts(policy, label, attempt)).await
    {
        Ok(result) => result,
        Err(_) => {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            warn!(label, elapsed_ms, "request deadline passed");
            Err(Error::TimedOut {
                elapsed_ms,
                timeout_ms: policy.request_timeout.as_millis() as u64,
            })
        }
    }
}

async fn run_attempts<T, F, Fut>(policy: &RetryPolicy, label: &str, mut attempt: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AttemptOutcome<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for n in 1..=max_attempts {
        match attempt(n).await {
            AttemptOutcome::Success(value) => {
                debug!(label, attempt = n, "attempt succeeded");
                return Ok(value);
            }
            AttemptOutcome::Fatal(error) => {
                debug!(label, attempt = n, %error, "attempt failed fatally");
                return Err(error);
            }
            AttemptOutcome::NextNode(error) => {
                debug!(label, attempt = n, %error, "node failed, moving on");
                last_error = Some(error);
            }
            AttemptOutcome::Retry(error) => {
                if n < max_attempts {
                    let delay = policy.backoff_for(n);
                    warn!(
                        label,
                        attempt = n,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "Waiting {} ms before next attempt",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                last_error = Some(error);
            }
        }
    }

    warn!(label, attempts = max_attempts, "attempts exhausted");
    Err(last_error.unwrap_or(Error::NoNodes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            min_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(1),
            request_timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let p = policy(10);
        let delays: Vec<u128> = (1..=5).map(|n| p.backoff_for(n).as_millis()).collect();
        assert_eq!(delays, vec![250, 500, 1000, 1000, 1000]);
        // Enormous attempt numbers don't overflow.
        assert_eq!(p.backoff_for(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn validate_rejects_bad_policies() {
        assert!(policy(0).validate().is_err());
        let inverted = RetryPolicy {
            min_backoff: Duration::from_secs(5),
            ..policy(3)
        };
        assert!(matches!(inverted.validate(), Err(Error::Argument(_))));
        assert!(RetryPolicy::default().validate().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_then_success_takes_two_attempts() {
        let calls = AtomicU32::new(0);
        let result = execute_with_retry(&policy(3), "test", |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n == 1 {
                    AttemptOutcome::Retry(Error::transport("mock", "503"))
                } else {
                    AttemptOutcome::Success(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_stops_immediately() {
        let calls = AtomicU32::new(0);
        let err = execute_with_retry::<(), _, _>(&policy(5), "test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { AttemptOutcome::Fatal(Error::argument("nope")) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_returns_last_error_verbatim() {
        let err = execute_with_retry::<(), _, _>(&policy(3), "test", |n| async move {
            AttemptOutcome::Retry(Error::transport("mock", format!("failure {n}")))
        })
        .await
        .unwrap_err();
        match err {
            Error::Transport { message, .. } => assert_eq!(message, "failure 3"),
            other => panic!("expected the last transport error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn waits_follow_the_backoff_schedule() {
        let started = Instant::now();
        let _ = execute_with_retry::<(), _, _>(&policy(4), "test", |_| async {
            AttemptOutcome::Retry(Error::transport("mock", "busy"))
        })
        .await;
        // 250 + 500 + 1000; no wait after the final attempt.
        assert_eq!(started.elapsed(), Duration::from_millis(1750));
    }

    #[tokio::test(start_paused = true)]
    async fn next_node_does_not_wait() {
        let started = Instant::now();
        let _ = execute_with_retry::<(), _, _>(&policy(3), "test", |_| async {
            AttemptOutcome::NextNode(Error::transport("mock", "refused"))
        })
        .await;
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_aborts_before_attempts_run_out() {
        let p = RetryPolicy {
            request_timeout: Duration::from_millis(600),
            ..policy(100)
        };
        let err = execute_with_retry::<(), _, _>(&p, "test", |_| async {
            AttemptOutcome::Retry(Error::transport("mock", "busy"))
        })
        .await
        .unwrap_err();
        match err {
            Error::TimedOut { timeout_ms, elapsed_ms } => {
                assert_eq!(timeout_ms, 600);
                assert!(elapsed_ms >= 600);
            }
            other => panic!("expected TimedOut, got {other:?}"),
        }
    }
}
