use super::policy::RetryPolicy;

use std::future::Future;

/// Classification of a failed attempt.
#[derive(Debug)]
pub enum Attempt<E> {
    /// Transient failure, try again if attempts remain.
    Retry(E),
    /// Permanent failure, stop now.
    Abort(E),
}

/// Returned when an operation never succeeded.
#[derive(Debug)]
pub struct RetryFailure<E> {
    /// Attempts actually performed.
    pub attempts: usize,
    pub last_error: E,
    /// `true` when the operation aborted instead of running out of attempts.
    pub aborted: bool,
}

/// Runs `op` until it succeeds, aborts, or exhausts `policy.attempts()`.
///
/// `op` receives the 1-based attempt number. No delay follows the final attempt.
/// On success the value is returned together with the number of attempts used.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<(T, usize), RetryFailure<E>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, Attempt<E>>>,
{
    let max_attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok((value, attempt)),
            Err(Attempt::Abort(err)) => {
                return Err(RetryFailure {
                    attempts: attempt,
                    last_error: err,
                    aborted: true,
                });
            }
            Err(Attempt::Retry(err)) => {
                if attempt >= max_attempts {
                    return Err(RetryFailure {
                        attempts: attempt,
                        last_error: err,
                        aborted: false,
                    });
                }

                let delay = policy.wait_after(attempt);
                tracing::trace!("Attempt {} failed, retrying in {:?}", attempt, delay);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
        }
    }
}
