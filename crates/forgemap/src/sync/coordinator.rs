//! Pass orchestration: re-entrancy guarding and concurrent organizations.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use super::engine;
use super::errors::SyncError;
use super::progress::ProgressCallback;
use super::types::{SyncJob, SyncStatus, distinct_organizations, organization_key};
use crate::entity::provider::Provider;
use crate::platform::{ProviderAdapter, Throttle, create_adapter};
use crate::repository::RepositoryStore;
use crate::retry::RetryConfig;

type PassKey = (Provider, String);

/// Set of (provider, organization) pairs with a pass in flight.
#[derive(Debug, Clone, Default)]
pub struct PassRegistry {
    active: Arc<Mutex<HashSet<PassKey>>>,
}

impl PassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for a pass, failing if one is already running.
    ///
    /// The slot is released when the returned guard drops.
    pub fn try_acquire(&self, provider: Provider, organization: &str) -> Result<PassGuard, SyncError> {
        let key = (provider, organization_key(organization));
        if !self.lock().insert(key.clone()) {
            return Err(SyncError::PassInProgress {
                provider,
                organization: organization.to_string(),
            });
        }
        Ok(PassGuard {
            registry: self.clone(),
            key,
        })
    }

    pub fn is_active(&self, provider: Provider, organization: &str) -> bool {
        self.lock().contains(&(provider, organization_key(organization)))
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<PassKey>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Holds a pass slot; releases it on drop, including on panic or abort.
#[derive(Debug)]
pub struct PassGuard {
    registry: PassRegistry,
    key: PassKey,
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.key);
    }
}

/// Runs passes against a shared store.
#[derive(Clone)]
pub struct SyncCoordinator {
    store: Arc<dyn RepositoryStore>,
    registry: PassRegistry,
    retry: RetryConfig,
}

impl SyncCoordinator {
    pub fn new(store: Arc<dyn RepositoryStore>) -> Self {
        Self {
            store,
            registry: PassRegistry::new(),
            retry: RetryConfig::default(),
        }
    }

    /// Override the rate-limit retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn registry(&self) -> &PassRegistry {
        &self.registry
    }

    /// Run one pass with a fresh fixed-delay pacer for the adapter.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::PassInProgress`] if a pass for the same provider
    /// and organization is already running. Pass-level failures are reported
    /// in the returned status, not as errors.
    pub async fn run_pass(
        &self,
        adapter: &dyn ProviderAdapter,
        organization: &str,
        cancel: &CancellationToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<SyncStatus, SyncError> {
        let _guard = self.registry.try_acquire(adapter.provider(), organization)?;
        let throttle = Throttle::fixed_delay(adapter.request_delay(), self.retry);
        Ok(engine::run_pass(
            adapter,
            self.store.as_ref(),
            &throttle,
            organization,
            cancel,
            on_progress,
        )
        .await)
    }

    /// Run one pass per distinct organization, concurrently.
    ///
    /// Results come back in the order the organizations were given.
    #[tracing::instrument(
        skip_all,
        fields(provider = %adapter.provider(), organization_count = organizations.len())
    )]
    pub async fn run_organizations(
        &self,
        adapter: Arc<dyn ProviderAdapter>,
        organizations: &[String],
        cancel: &CancellationToken,
        on_progress: Option<Arc<ProgressCallback>>,
    ) -> Vec<Result<SyncStatus, SyncError>> {
        let organizations = distinct_organizations(organizations);
        let mut handles = Vec::with_capacity(organizations.len());

        for organization in organizations {
            let coordinator = self.clone();
            let adapter = Arc::clone(&adapter);
            let cancel = cancel.clone();
            let on_progress = on_progress.clone();
            let org = organization.clone();

            let handle = tokio::spawn(async move {
                coordinator
                    .run_pass(adapter.as_ref(), &org, &cancel, on_progress.as_deref())
                    .await
            });
            handles.push((organization, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (organization, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!(organization = %organization, "Pass task failed: {}", e);
                    results.push(Err(SyncError::TaskFailed {
                        organization,
                        message: e.to_string(),
                    }));
                }
            }
        }
        results
    }

    /// Build the adapter a job describes and run all its organizations.
    ///
    /// # Errors
    ///
    /// Returns an error only if the adapter cannot be built.
    pub async fn run_job(
        &self,
        job: &SyncJob,
        cancel: &CancellationToken,
        on_progress: Option<Arc<ProgressCallback>>,
    ) -> Result<Vec<Result<SyncStatus, SyncError>>, SyncError> {
        let adapter = create_adapter(job.provider, job.credentials.clone(), &job.endpoint)?;
        Ok(self
            .run_organizations(adapter, &job.organizations, cancel, on_progress)
            .await)
    }
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("registry", &self.registry)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
