//! Bounded retry with failure classification.
//!
//! Attempt 1 is the unmodified call. Failures classified as retryable
//! (network, timeout, rate limit, 5xx) wait out the backoff schedule and try
//! again, up to `attempts` total tries; non-retryable failures abort
//! immediately. The surfaced error is always the one from the last attempt,
//! so callers see the most recent failure mode.

use promptgate_core::error::ProviderError;
use std::time::Duration;
use tracing::warn;

/// How many tries to make and how long to wait between them.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    attempts: u32,
    backoff: Option<Vec<Duration>>,
}

impl RetryPolicy {
    /// A policy with `attempts` total tries (clamped to at least 1) and the
    /// default exponential backoff.
    pub fn new(attempts: u32) -> Self {
        Self { attempts: attempts.max(1), backoff: None }
    }

    /// Replace the default backoff with an explicit schedule in milliseconds.
    /// Retries past the end of the schedule reuse its last entry.
    pub fn with_backoff_ms(mut self, schedule: Vec<u64>) -> Self {
        self.backoff = Some(schedule.into_iter().map(Duration::from_millis).collect());
        self
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay before retry number `retry` (0-based).
    fn delay(&self, retry: u32) -> Duration {
        match &self.backoff {
            Some(schedule) => schedule
                .get(retry as usize)
                .or(schedule.last())
                .copied()
                .unwrap_or(Duration::ZERO),
            // 250ms, 500ms, 1s, ... capped at 8s
            None => Duration::from_millis(250 * 2u64.pow(retry.min(5))),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Executes fallible provider operations under a [`RetryPolicy`].
pub struct RetryController;

impl RetryController {
    /// Run `op` up to `policy.attempts()` times.
    ///
    /// `op` is a factory producing a fresh future per attempt, so it works
    /// for both `complete()` calls and stream *initiation*. Once a stream's
    /// receiver has been handed to the caller, failures are terminal and
    /// must not come back through here (retrying would duplicate partial
    /// output).
    pub async fn execute<T, F, Fut>(
        policy: &RetryPolicy,
        mut op: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let total = policy.attempts();
        let mut last_error;

        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    warn!(attempt, total, error = %e, "Provider call failed, may retry");
                    last_error = e;
                }
            }

            if attempt >= total {
                return Err(last_error);
            }
            tokio::time::sleep(policy.delay(attempt - 1)).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Counter(Mutex<u32>);

    impl Counter {
        fn new() -> Self {
            Self(Mutex::new(0))
        }
        fn bump(&self) -> u32 {
            let mut n = self.0.lock().unwrap();
            *n += 1;
            *n
        }
        fn calls(&self) -> u32 {
            *self.0.lock().unwrap()
        }
    }

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts).with_backoff_ms(vec![0])
    }

    #[tokio::test]
    async fn success_on_first_attempt() {
        let calls = Counter::new();
        let result: Result<&str, _> = RetryController::execute(&policy(3), || async {
            calls.bump();
            Ok("ok")
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.calls(), 1);
    }

    #[tokio::test]
    async fn retryable_error_exhausts_all_attempts() {
        let calls = Counter::new();
        let result: Result<(), _> = RetryController::execute(&policy(3), || async {
            let n = calls.bump();
            Err(ProviderError::Network(format!("attempt {n}")))
        })
        .await;

        assert_eq!(calls.calls(), 3);
        // The surfaced error is from the last attempt, not the first
        match result.unwrap_err() {
            ProviderError::Network(msg) => assert_eq!(msg, "attempt 3"),
            other => panic!("expected Network, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_retryable_error_aborts_immediately() {
        let calls = Counter::new();
        let result: Result<(), _> = RetryController::execute(&policy(5), || async {
            calls.bump();
            Err(ProviderError::Api { status_code: 400, message: "bad request".into() })
        })
        .await;

        assert_eq!(calls.calls(), 1);
        assert!(matches!(result, Err(ProviderError::Api { status_code: 400, .. })));
    }

    #[tokio::test]
    async fn recovers_mid_schedule() {
        let calls = Counter::new();
        let result = RetryController::execute(&policy(3), || async {
            if calls.bump() < 3 {
                Err(ProviderError::Timeout("slow".into()))
            } else {
                Ok("recovered")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(calls.calls(), 3);
    }

    #[tokio::test]
    async fn single_attempt_policy_never_retries() {
        let calls = Counter::new();
        let result: Result<(), _> = RetryController::execute(&policy(1), || async {
            calls.bump();
            Err(ProviderError::Network("down".into()))
        })
        .await;
        assert_eq!(calls.calls(), 1);
        assert!(result.is_err());
    }

    #[test]
    fn attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0).attempts(), 1);
    }

    #[test]
    fn explicit_schedule_reuses_last_entry() {
        let p = RetryPolicy::new(5).with_backoff_ms(vec![10, 20]);
        assert_eq!(p.delay(0), Duration::from_millis(10));
        assert_eq!(p.delay(1), Duration::from_millis(20));
        assert_eq!(p.delay(4), Duration::from_millis(20));
    }

    #[test]
    fn default_schedule_doubles_and_caps() {
        let p = RetryPolicy::new(10);
        assert_eq!(p.delay(0), Duration::from_millis(250));
        assert_eq!(p.delay(1), Duration::from_millis(500));
        assert_eq!(p.delay(5), Duration::from_millis(8000));
        assert_eq!(p.delay(9), Duration::from_millis(8000));
    }
}
