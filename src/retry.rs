use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum attempts for a provider/classifier call.
pub const MAX_RETRIES: u32 = 3;
/// Initial backoff delay, doubled on every retry.
pub const BASE_DELAY_MS: u64 = 1000;

/// Whether an error is worth retrying. 4xx-style client errors are not;
/// everything else (timeouts, 5xx, connection resets) is.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Runs `attempt` up to `MAX_RETRIES` times with exponential backoff
/// (1s, 2s, 4s), re-raising the last error if every attempt fails. Never
/// swallows the failure into an empty/default value — the source this
/// crate is modeled on once did that silently, which is the one thing
/// this helper exists to rule out.
pub async fn with_retry<T, E, F, Fut>(operation_name: &str, mut attempt: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_error = None;

    for n in 0..MAX_RETRIES {
        if n > 0 {
            let delay = BASE_DELAY_MS * 2u64.pow(n - 1);
            debug!("{}: retry {} after {}ms", operation_name, n, delay);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !e.is_retryable() {
                    return Err(e);
                }
                warn!("{}: attempt {} failed: {}", operation_name, n + 1, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.expect("loop runs at least once"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct TestError {
        retryable: bool,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error")
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    #[tokio::test]
    async fn succeeds_after_two_failures() {
        let calls = AtomicUsize::new(0);
        let result: Result<&str, TestError> = with_retry("test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(TestError { retryable: true })
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausting_retries_returns_the_last_error_not_a_default() {
        let calls = AtomicUsize::new(0);
        let result: Result<&str, TestError> = with_retry("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(TestError { retryable: true }) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES as usize);
    }

    #[tokio::test]
    async fn non_retryable_error_short_circuits() {
        let calls = AtomicUsize::new(0);
        let result: Result<&str, TestError> = with_retry("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(TestError { retryable: false }) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
