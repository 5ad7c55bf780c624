//! Rate-limit retry policy shared by every provider adapter.
//!
//! Request spacing is fixed and advisory; when a provider still rejects a
//! request for rate limiting, that single request is retried a bounded
//! number of times (once by default) after a constant backoff window.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};

use crate::platform::{PlatformError, short_error_message};

/// Default wait before retrying a rate-limited request.
pub const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(60);

/// Default number of retries after a rate-limit rejection.
pub const DEFAULT_RATE_LIMIT_RETRIES: usize = 1;

/// Configuration for rate-limit retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Fixed wait before each retry.
    pub backoff: Duration,
    /// Maximum number of retries after the first attempt.
    pub max_retries: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff: DEFAULT_RATE_LIMIT_BACKOFF,
            max_retries: DEFAULT_RATE_LIMIT_RETRIES,
        }
    }
}

impl RetryConfig {
    /// Retry once after `backoff`.
    #[must_use]
    pub fn new(backoff: Duration) -> Self {
        Self {
            backoff,
            ..Self::default()
        }
    }

    /// Set the retry count.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Build a constant backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.backoff)
            .with_max_times(self.max_retries)
    }
}

/// Execute an operation, retrying it only when it fails with
/// [`PlatformError::RateLimited`].
///
/// Any other error is returned immediately. If every attempt is rejected,
/// the last rate-limit error is returned.
pub async fn with_rate_limit_retry<T, F, Fut>(
    mut operation: F,
    config: &RetryConfig,
    what: &str,
) -> Result<T, PlatformError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PlatformError>>,
{
    let attempt = AtomicU32::new(0);

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    retry_op
        .retry(config.into_backoff())
        .notify(|err, dur| {
            tracing::warn!(
                request = what,
                attempt = attempt.load(Ordering::SeqCst),
                retry_after_ms = dur.as_millis() as u64,
                "Rate limited, retrying: {}",
                short_error_message(err)
            );
        })
        .when(PlatformError::is_rate_limited)
        .await
}
