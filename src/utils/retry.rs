use std::future::Future;
use std::time::Duration;
use anyhow::Result;
use log::{warn, info, debug};
use tokio_util::sync::CancellationToken;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after `delay`, capped at `max_delay`.
    pub fn next_delay(&self, delay: Duration) -> Duration {
        std::cmp::min(
            Duration::from_millis((delay.as_millis() as f64 * self.backoff_multiplier) as u64),
            self.max_delay,
        )
    }
}

pub async fn retry_with_exponential_backoff<T, F, Fut>(
    config: &RetryConfig,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = config.base_delay;
    let max_attempts = config.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!("Operation succeeded on attempt {}", attempt);
                }
                return Ok(value);
            }
            Err(e) => {
                if attempt == max_attempts {
                    warn!("Operation failed after {} attempts: {}", max_attempts, e);
                    return Err(e.context(format!("Failed after {} retry attempts", max_attempts)));
                }

                if is_transient_error(&e) {
                    debug!("Attempt {} failed transiently, retrying in {:?}: {}", attempt, delay, e);
                    tokio::time::sleep(delay).await;
                    delay = config.next_delay(delay);
                } else {
                    debug!("Attempt {} failed with non-transient error, not retrying: {}", attempt, e);
                    return Err(e);
                }
            }
        }
    }

    unreachable!()
}

/// Keeps calling `operation` until it succeeds, backing off between
/// attempts. Returns `None` only when `shutdown` is cancelled first.
pub async fn retry_until_success<T, F, Fut>(
    config: &RetryConfig,
    shutdown: &CancellationToken,
    operation: F,
) -> Option<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = config.base_delay;
    let mut attempt: u64 = 1;

    loop {
        if shutdown.is_cancelled() {
            return None;
        }

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!("Operation succeeded on attempt {}", attempt);
                }
                return Some(value);
            }
            Err(e) => {
                warn!("Attempt {} failed, retrying in {:?}: {}", attempt, delay, e);
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.cancelled() => return None,
        }
        delay = config.next_delay(delay);
        attempt += 1;
    }
}

fn is_transient_error(error: &anyhow::Error) -> bool {
    if let Some(app_error) = error.downcast_ref::<AppError>() {
        return app_error.is_transient();
    }

    let error_str = error.to_string().to_lowercase();

    // Network-related transient errors
    error_str.contains("timeout") ||
    error_str.contains("connection") ||
    error_str.contains("network") ||
    error_str.contains("temporary") ||
    error_str.contains("rate limit") ||
    error_str.contains("too many requests") ||
    error_str.contains("service unavailable") ||
    error_str.contains("internal server error") ||
    error_str.contains("bad gateway") ||
    error_str.contains("gateway timeout") ||
    // HTTP status codes that are typically transient
    error_str.contains("429") || // Too Many Requests
    error_str.contains("502") || // Bad Gateway
    error_str.contains("503") || // Service Unavailable
    error_str.contains("504")    // Gateway Timeout
}
