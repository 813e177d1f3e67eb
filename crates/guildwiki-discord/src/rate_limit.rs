//! Retry policy for Discord REST calls.
//!
//! 429 responses and network failures are retried; a 429 waits at least as
//! long as the platform's `retry_after`. Everything else (403, 404, bad JSON)
//! is returned on the first failure.

use std::future::Future;
use std::time::Duration;

use crate::error::DiscordError;

fn is_retriable(err: &DiscordError) -> bool {
    matches!(err, DiscordError::RateLimited { .. } | DiscordError::Http(_))
}

/// Seconds to wait before retry number `attempt + 1`.
fn delay_secs(err: &DiscordError, attempt: u32, backoff_base_secs: u64) -> u64 {
    let backoff = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
    match err {
        DiscordError::RateLimited {
            retry_after_secs, ..
        } => backoff.max(*retry_after_secs),
        _ => backoff,
    }
}

/// Run `operation`, retrying transient failures up to `max_retries` extra
/// times with `backoff_base_secs * 2^attempt` second delays.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, DiscordError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DiscordError>>,
{
    let mut attempt = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !is_retriable(&err) || attempt >= max_retries => return Err(err),
            Err(err) => err,
        };

        let delay = delay_secs(&err, attempt, backoff_base_secs);
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs = delay,
            error = %err,
            "transient discord error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay)).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn rate_limited(retry_after_secs: u64) -> DiscordError {
        DiscordError::RateLimited {
            route: "/guilds/1".to_owned(),
            retry_after_secs,
        }
    }

    #[tokio::test]
    async fn returns_first_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, DiscordError>(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_rate_limited_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(rate_limited(0))
                } else {
                    Ok::<u32, DiscordError>(1)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(1, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, DiscordError>(rate_limited(0))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(result, Err(DiscordError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn forbidden_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, DiscordError>(DiscordError::Forbidden {
                    url: "http://localhost/guilds/1/members".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(DiscordError::Forbidden { .. })));
    }

    #[test]
    fn rate_limit_delay_honours_retry_after() {
        assert_eq!(delay_secs(&rate_limited(5), 0, 1), 5);
        assert_eq!(delay_secs(&rate_limited(1), 3, 1), 8);
        let not_found = DiscordError::NotFound { url: String::new() };
        assert_eq!(delay_secs(&not_found, 2, 2), 8);
    }
}
