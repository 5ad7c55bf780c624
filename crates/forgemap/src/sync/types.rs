//! Pass state, status output and job input for sync operations.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::provider::Provider;
use crate::platform::{Credentials, ProviderEndpoint};

use super::errors::{FailureKind, SyncError};

/// Lifecycle of one (provider, organization) pass.
///
/// `Idle → Listing → PerRepoProcessing → Completed`, with `Failed` reachable
/// only from `Listing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassState {
    Idle,
    Listing,
    PerRepoProcessing,
    Completed,
    Failed,
}

impl PassState {
    pub fn can_transition_to(self, next: PassState) -> bool {
        matches!(
            (self, next),
            (PassState::Idle, PassState::Listing)
                | (PassState::Listing, PassState::PerRepoProcessing)
                | (PassState::Listing, PassState::Failed)
                | (PassState::PerRepoProcessing, PassState::Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PassState::Completed | PassState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PassState::Idle => "idle",
            PassState::Listing => "listing",
            PassState::PerRepoProcessing => "per_repo_processing",
            PassState::Completed => "completed",
            PassState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PassState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One per-repository failure recorded during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    /// Derived repository id (`"{provider}:{provider_repo_id}"`).
    pub id: String,
    pub kind: FailureKind,
    pub reason: String,
}

/// Outcome of one pass, emitted whether it completed or failed.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub provider: Provider,
    pub organization: String,
    pub state: PassState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Repositories attempted in the per-repository phase.
    pub repo_count: usize,
    /// Repositories written to the store.
    pub upserted: usize,
    pub error_count: usize,
    pub errors: Vec<RecordFailure>,
    /// Why the pass failed, set only in the `Failed` state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    /// Whether cancellation stopped the pass before every repository was attempted.
    pub cancelled: bool,
}

impl SyncStatus {
    pub fn new(provider: Provider, organization: impl Into<String>) -> Self {
        Self {
            provider,
            organization: organization.into(),
            state: PassState::Idle,
            started_at: Utc::now(),
            finished_at: None,
            repo_count: 0,
            upserted: 0,
            error_count: 0,
            errors: Vec::new(),
            failure: None,
            cancelled: false,
        }
    }

    /// Move to `next`, ignoring transitions the state machine does not allow.
    pub(crate) fn transition(&mut self, next: PassState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::warn!(from = %self.state, to = %next, "Ignoring illegal pass transition");
            return false;
        }
        self.state = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        true
    }

    /// Record a per-repository failure.
    pub(crate) fn record(&mut self, error: &SyncError) {
        let Some(kind) = error.kind() else {
            return;
        };
        self.errors.push(RecordFailure {
            id: error.record_id().unwrap_or_default().to_string(),
            kind,
            reason: error.reason(),
        });
        self.error_count = self.errors.len();
    }

    /// End the pass in `Failed`.
    pub(crate) fn fail(&mut self, error: &SyncError) {
        self.failure = Some(error.to_string());
        self.transition(PassState::Failed);
    }

    pub fn is_failed(&self) -> bool {
        self.state == PassState::Failed
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

/// Explicit input for syncing one provider's organizations.
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub provider: Provider,
    pub credentials: Credentials,
    pub organizations: Vec<String>,
    /// How often an external scheduler should re-run this job.
    pub interval_minutes: u64,
    pub endpoint: ProviderEndpoint,
}

impl SyncJob {
    pub fn new(provider: Provider, credentials: Credentials, organizations: Vec<String>) -> Self {
        Self {
            provider,
            credentials,
            organizations,
            interval_minutes: 60,
            endpoint: ProviderEndpoint::default(),
        }
    }

    #[must_use]
    pub fn with_interval_minutes(mut self, minutes: u64) -> Self {
        self.interval_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: ProviderEndpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    /// The organizations a run of this job passes over, in result order.
    pub fn distinct_organizations(&self) -> Vec<String> {
        distinct_organizations(&self.organizations)
    }
}

/// Organizations in first-seen order with duplicates and blanks removed.
///
/// Providers resolve organization names case-insensitively, so `Acme` and
/// `acme` are the same organization; the first spelling wins.
pub(crate) fn distinct_organizations(organizations: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    organizations
        .iter()
        .map(|org| org.trim())
        .filter(|org| !org.is_empty() && seen.insert(organization_key(org)))
        .map(str::to_string)
        .collect()
}

/// Identity of an organization for de-duplication and re-entrancy.
pub(crate) fn organization_key(organization: &str) -> String {
    organization.trim().to_ascii_lowercase()
}
