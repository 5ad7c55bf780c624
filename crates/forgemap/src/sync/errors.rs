use serde::Serialize;
use thiserror::Error;

use crate::entity::provider::Provider;
use crate::path::NormalizeError;
use crate::platform::{PlatformError, short_error_message};
use crate::repository::RepositoryError;

/// Serializable discriminant of a per-pass failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    TraversalFailure,
    InvalidRawRecord,
    LanguageFetchFailure,
    RateLimitRejected,
    UpsertFailure,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::TraversalFailure => "traversal_failure",
            FailureKind::InvalidRawRecord => "invalid_raw_record",
            FailureKind::LanguageFetchFailure => "language_fetch_failure",
            FailureKind::RateLimitRejected => "rate_limit_rejected",
            FailureKind::UpsertFailure => "upsert_failure",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while syncing.
///
/// Only [`SyncError::TraversalFailure`] ends a pass. The per-record kinds are
/// collected into the pass status and the pass moves on.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Containers or repositories for an organization could not be listed.
    #[error("Traversal of {organization} failed: {source}")]
    TraversalFailure {
        organization: String,
        #[source]
        source: PlatformError,
    },

    /// A raw record did not yield a valid path.
    #[error("Invalid raw record {id}: {source}")]
    InvalidRawRecord {
        id: String,
        #[source]
        source: NormalizeError,
    },

    /// Languages could not be fetched; the record is stored without them.
    #[error("Language fetch failed for {id}: {source}")]
    LanguageFetchFailure {
        id: String,
        #[source]
        source: PlatformError,
    },

    /// A per-record request was still rate limited after its retry.
    #[error("Rate limit rejected request for {id}: {source}")]
    RateLimitRejected {
        id: String,
        #[source]
        source: PlatformError,
    },

    /// The store refused the record.
    #[error("Upsert failed for {id}: {source}")]
    UpsertFailure {
        id: String,
        #[source]
        source: RepositoryError,
    },

    /// A pass for the same provider and organization is already running.
    #[error("A {provider} pass for {organization} is already in progress")]
    PassInProgress {
        provider: Provider,
        organization: String,
    },

    /// The task running a pass panicked or was aborted.
    #[error("Pass task for {organization} failed: {message}")]
    TaskFailed {
        organization: String,
        message: String,
    },

    /// The provider adapter could not be built.
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl SyncError {
    /// Classify a failed per-record language request.
    pub fn language_failure(id: impl Into<String>, source: PlatformError) -> Self {
        let id = id.into();
        if source.is_rate_limited() {
            Self::RateLimitRejected { id, source }
        } else {
            Self::LanguageFetchFailure { id, source }
        }
    }

    /// The failure kind, or `None` for orchestration errors.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            SyncError::TraversalFailure { .. } => Some(FailureKind::TraversalFailure),
            SyncError::InvalidRawRecord { .. } => Some(FailureKind::InvalidRawRecord),
            SyncError::LanguageFetchFailure { .. } => Some(FailureKind::LanguageFetchFailure),
            SyncError::RateLimitRejected { .. } => Some(FailureKind::RateLimitRejected),
            SyncError::UpsertFailure { .. } => Some(FailureKind::UpsertFailure),
            SyncError::PassInProgress { .. }
            | SyncError::TaskFailed { .. }
            | SyncError::Platform(_) => None,
        }
    }

    /// The derived repository id a per-record failure refers to.
    pub fn record_id(&self) -> Option<&str> {
        match self {
            SyncError::InvalidRawRecord { id, .. }
            | SyncError::LanguageFetchFailure { id, .. }
            | SyncError::RateLimitRejected { id, .. }
            | SyncError::UpsertFailure { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Whether this error ends the pass.
    pub fn is_pass_fatal(&self) -> bool {
        matches!(self, SyncError::TraversalFailure { .. })
    }

    /// The underlying cause, without the record id prefix.
    pub fn reason(&self) -> String {
        match self {
            SyncError::TraversalFailure { source, .. }
            | SyncError::LanguageFetchFailure { source, .. }
            | SyncError::RateLimitRejected { source, .. } => short_error_message(source),
            SyncError::InvalidRawRecord { source, .. } => short_error_message(source),
            SyncError::UpsertFailure { source, .. } => short_error_message(source),
            other => short_error_message(other),
        }
    }
}
