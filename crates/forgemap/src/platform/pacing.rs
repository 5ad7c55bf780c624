use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::entity::provider::Provider;
use crate::retry::{RetryConfig, with_rate_limit_retry};

use super::errors::Result;

/// Default request spacing per provider.
pub mod request_delays {
    use super::{Duration, Provider};

    /// GitHub allows 5000 authenticated requests/hour; 100ms stays well below.
    pub const GITHUB: Duration = Duration::from_millis(100);
    pub const GITLAB: Duration = Duration::from_millis(200);
    /// Bitbucket Cloud's repository-data quota is the tightest of the three.
    pub const BITBUCKET: Duration = Duration::from_millis(500);

    #[must_use]
    pub fn default_for(provider: Provider) -> Duration {
        match provider {
            Provider::GitHub => GITHUB,
            Provider::GitLab => GITLAB,
            Provider::Bitbucket => BITBUCKET,
        }
    }
}

/// Scheduling contract between a sequential sync pass and its request budget.
///
/// `ready` is awaited before every request and `finished` is called when the
/// request completes, successfully or not.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn ready(&self);
    fn finished(&self);
}

/// Pacer that never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPacer;

#[async_trait]
impl Pacer for NoopPacer {
    async fn ready(&self) {}
    fn finished(&self) {}
}

/// Enforces a fixed delay between the end of one request and the start of
/// the next.
#[derive(Debug)]
pub struct FixedDelayPacer {
    delay: Duration,
    last_finished: Mutex<Option<Instant>>,
}

impl FixedDelayPacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_finished: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl Pacer for FixedDelayPacer {
    async fn ready(&self) {
        let deadline = {
            let last = self.last_finished.lock().unwrap_or_else(|e| e.into_inner());
            last.map(|at| at + self.delay)
        };
        if let Some(deadline) = deadline {
            tokio::time::sleep_until(deadline).await;
        }
    }

    fn finished(&self) {
        let mut last = self.last_finished.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some(Instant::now());
    }
}

/// Pacing plus rate-limit retry for every request one pass issues.
#[derive(Clone)]
pub struct Throttle {
    pacer: Arc<dyn Pacer>,
    retry: RetryConfig,
}

impl Throttle {
    pub fn new(pacer: Arc<dyn Pacer>, retry: RetryConfig) -> Self {
        Self { pacer, retry }
    }

    /// Fixed inter-request spacing with the given retry policy.
    pub fn fixed_delay(delay: Duration, retry: RetryConfig) -> Self {
        Self::new(Arc::new(FixedDelayPacer::new(delay)), retry)
    }

    /// No spacing and no backoff wait; rate-limit rejections are still
    /// retried once.
    pub fn unpaced() -> Self {
        Self::new(Arc::new(NoopPacer), RetryConfig::new(Duration::ZERO))
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Issue one paced request, retrying it if the provider rate-limits it.
    ///
    /// `op` builds a fresh request future for each attempt.
    pub async fn call<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let pacer = self.pacer.as_ref();
        with_rate_limit_retry(
            || {
                let request = op();
                async move {
                    pacer.ready().await;
                    let result = request.await;
                    pacer.finished();
                    result
                }
            },
            &self.retry,
            what,
        )
        .await
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
