//! Retry Module Tests
//!
//! ## Test Scopes
//! - **Policy**: Delay schedules for each backoff kind and their caps.
//! - **Runner**: Attempt counting, abort short-circuit, success after transient failures.

#[cfg(test)]
mod tests {
    use crate::retry::{retry_with_backoff, Attempt, Backoff, RetryPolicy};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    // ============================================================
    // POLICY TESTS
    // ============================================================

    #[test]
    fn test_fixed_delay_is_constant() {
        let policy = RetryPolicy::fixed(5, Duration::from_secs(2));

        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(4), Duration::from_secs(2));
    }

    #[test]
    fn test_linear_delay_grows_with_attempts() {
        let policy = RetryPolicy::linear(5, Duration::from_secs(5));

        assert_eq!(policy.delay_after(1), Duration::from_secs(5));
        assert_eq!(policy.delay_after(2), Duration::from_secs(10));
        assert_eq!(policy.delay_after(3), Duration::from_secs(15));
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            delay: Duration::from_millis(100),
            backoff: Backoff::Exponential,
            max_delay: Duration::from_millis(500),
            jitter: Duration::ZERO,
        };

        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        assert_eq!(policy.delay_after(4), Duration::from_millis(500));
    }

    #[test]
    fn test_max_delay_caps_linear_growth() {
        let policy = RetryPolicy::linear(5, Duration::from_secs(5)).with_max_delay(Duration::from_secs(12));

        assert_eq!(policy.delay_after(2), Duration::from_secs(10));
        assert_eq!(policy.delay_after(3), Duration::from_secs(12));
        assert_eq!(policy.delay_after(40), Duration::from_secs(12));
    }

    #[test]
    fn test_jitter_stays_within_its_window() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(10)).with_jitter(Duration::from_millis(20));

        let waits: Vec<Duration> = (0..200).map(|_| policy.wait_after(1)).collect();
        assert!(waits
            .iter()
            .all(|w| *w >= Duration::from_millis(10) && *w < Duration::from_millis(30)));
        // 200 draws from 20 values are never all equal in practice
        assert!(waits.iter().any(|w| *w != waits[0]));
    }

    #[test]
    fn test_without_jitter_wait_equals_delay() {
        let policy = RetryPolicy::linear(3, Duration::from_millis(7));
        assert_eq!(policy.wait_after(2), Duration::from_millis(14));
    }

    #[test]
    fn test_zero_attempts_means_one() {
        let policy = RetryPolicy::fixed(0, Duration::ZERO);
        assert_eq!(policy.attempts(), 1);
    }

    // ============================================================
    // RUNNER TESTS
    // ============================================================

    #[tokio::test]
    async fn test_always_failing_uses_every_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::fixed(4, Duration::ZERO);

        let result: Result<((), usize), _> = retry_with_backoff(&policy, |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Attempt::Retry("boom"))
            }
        })
        .await;

        let failure = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(failure.attempts, 4);
        assert!(!failure.aborted);
        assert_eq!(failure.last_error, "boom");
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let policy = RetryPolicy::fixed(5, Duration::from_millis(1));

        let result = retry_with_backoff(&policy, |attempt| async move {
            if attempt < 3 {
                Err(Attempt::Retry(format!("attempt {} failed", attempt)))
            } else {
                Ok(attempt * 10)
            }
        })
        .await;

        let (value, attempts) = result.unwrap();
        assert_eq!(value, 30);
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_abort_stops_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::fixed(5, Duration::ZERO);

        let result: Result<((), usize), _> = retry_with_backoff(&policy, |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Attempt::Abort("fatal"))
            }
        })
        .await;

        let failure = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(failure.aborted);
        assert_eq!(failure.attempts, 1);
    }

    #[tokio::test]
    async fn test_waits_between_attempts() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(20));
        let started = std::time::Instant::now();

        let _: Result<((), usize), _> =
            retry_with_backoff(&policy, |_| async { Err(Attempt::Retry(())) }).await;

        // Two waits between three attempts
        assert!(started.elapsed() >= Duration::from_millis(40));
    }
}
