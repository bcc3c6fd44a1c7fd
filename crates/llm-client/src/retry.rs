use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::error::LlmResult;

/// Exponential backoff for transient backend errors.
///
/// Delay before retry `n` (0-based) is `base_delay * 2^n`, plus up to one
/// second of random jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        if self.jitter {
            backoff + Duration::from_secs_f64(rand::thread_rng().gen_range(0.0..1.0))
        } else {
            backoff
        }
    }
}

/// Run `op`, retrying only while it fails with a transient error and
/// attempts remain. The last error is returned as-is.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, backend: &str, mut op: F) -> LlmResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LlmResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                let wait = policy.delay(attempt);
                tracing::warn!(
                    "{} {}. Retrying in {:.2}s (attempt {}/{})",
                    backend,
                    e,
                    wait.as_secs_f64(),
                    attempt + 1,
                    max_attempts
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            jitter: false,
        }
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy {
            jitter: false,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay(0), Duration::from_secs(2));
        assert_eq!(policy.delay(1), Duration::from_secs(4));
        assert_eq!(policy.delay(2), Duration::from_secs(8));
    }

    #[test]
    fn test_jitter_stays_below_one_second() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let d = policy.delay(1);
            assert!(d >= Duration::from_secs(4) && d < Duration::from_secs(5));
        }
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry(&fast(), "test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(LlmError::RateLimited("429".to_string()))
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: LlmResult<()> = with_retry(&fast(), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::Overloaded("529".to_string()))
        })
        .await;

        assert!(matches!(result, Err(LlmError::Overloaded(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_permanent_error_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: LlmResult<()> = tokio_test::block_on(with_retry(&fast(), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::InvalidResponse("bad json".to_string()))
        }));

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
