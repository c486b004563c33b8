use std::{fmt::Display, time::Duration};

use tracing::warn;

/// Bounded exponential backoff: `max_retries` retries after the initial
/// attempt, waiting `base_delay * 2^(attempt-1)` before each.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Classifies an error as transient by its rendered message. Matches the
/// failure modes RPC providers and rate-limited APIs report as retriable.
pub fn transient<E: Display>(err: &E) -> bool {
    let message = err.to_string().to_lowercase();
    [
        "circuit breaker",
        "rate limit",
        "too many requests",
        "timeout",
        "network error",
    ]
    .iter()
    .any(|marker| message.contains(marker))
}

/// Runs `op`, retrying failures accepted by `retryable` up to
/// `policy.max_retries` times with exponential backoff. Other failures and
/// exhaustion return the last error. `sleep` is injected so tests control
/// time.
pub async fn with_backoff<T, E, F, Fut, R, S, SFut>(
    policy: RetryPolicy,
    retryable: R,
    sleep: S,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    R: Fn(&E) -> bool,
    S: Fn(Duration) -> SFut,
    SFut: Future<Output = ()>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt <= policy.max_retries && retryable(&err) => {
                let delay = policy.delay(attempt);
                warn!(%err, attempt, ?delay, "transient failure, retrying");
                sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    };

    use super::*;

    fn recording_sleep(delays: Arc<Mutex<Vec<Duration>>>) -> impl Fn(Duration) -> std::future::Ready<()> {
        move |delay| {
            delays.lock().unwrap().push(delay);
            std::future::ready(())
        }
    }

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(3), Duration::from_secs(4));
    }

    #[test]
    fn test_transient_classification() {
        assert!(transient(&"Rate Limit exceeded".to_string()));
        assert!(transient(&"upstream circuit breaker is open".to_string()));
        assert!(transient(&"429 Too Many Requests".to_string()));
        assert!(transient(&"connection timeout".to_string()));
        assert!(transient(&"network error: connection reset".to_string()));
        assert!(!transient(&"order not found".to_string()));
        assert!(!transient(&"invalid decimal amount".to_string()));
    }

    #[tokio::test]
    async fn test_exhaustion_runs_max_retries_plus_one_attempts() {
        let delays = Arc::new(Mutex::new(Vec::new()));
        let attempts = Arc::new(AtomicU32::new(0));

        let op_attempts = attempts.clone();
        let result: Result<(), String> = with_backoff(
            RetryPolicy::default(),
            transient,
            recording_sleep(delays.clone()),
            move || {
                op_attempts.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Err("rate limit exceeded".to_string()))
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(
            *delays.lock().unwrap(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ]
        );
    }

    #[tokio::test]
    async fn test_recovery_stops_retrying() {
        let delays = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(AtomicU32::new(0));

        let op_calls = calls.clone();
        let result: Result<u32, String> = with_backoff(
            RetryPolicy::default(),
            transient,
            recording_sleep(delays.clone()),
            move || {
                let n = op_calls.fetch_add(1, Ordering::SeqCst);
                std::future::ready(if n < 2 {
                    Err("connection timeout".to_string())
                } else {
                    Ok(7)
                })
            },
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *delays.lock().unwrap(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_permanent_error_fails_fast() {
        let delays = Arc::new(Mutex::new(Vec::new()));
        let attempts = Arc::new(AtomicU32::new(0));

        let op_attempts = attempts.clone();
        let result: Result<(), String> = with_backoff(
            RetryPolicy::default(),
            transient,
            recording_sleep(delays.clone()),
            move || {
                op_attempts.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Err("order not found".to_string()))
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(delays.lock().unwrap().is_empty());
    }
}
