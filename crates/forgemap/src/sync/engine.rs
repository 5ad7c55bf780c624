//! The per-pass sync loop.
//!
//! One pass lists every repository under an organization, then walks the
//! listing strictly in order: normalize, fetch languages, upsert. Every
//! network call goes through the pass's [`Throttle`], so a single sequential
//! task plus a fixed-delay pacer is all the rate limiting a pass needs.
//!
//! # Example
//!
//! ```ignore
//! use forgemap::platform::Throttle;
//! use forgemap::repository::MemoryStore;
//! use forgemap::sync::run_pass;
//! use tokio_util::sync::CancellationToken;
//!
//! let store = MemoryStore::new();
//! let throttle = Throttle::fixed_delay(adapter.request_delay(), Default::default());
//! let status = run_pass(adapter.as_ref(), &store, &throttle, "rust-lang", &CancellationToken::new(), None).await;
//! println!("{} upserted, {} errors", status.upserted, status.error_count);
//! ```

use tokio_util::sync::CancellationToken;

use super::errors::SyncError;
use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::{PassState, SyncStatus};
use crate::path::{NormalizeError, RepoPath};
use crate::platform::{CanonicalRepo, Languages, ProviderAdapter, RawRepo, Throttle};
use crate::repository::RepositoryStore;

/// Outcome of processing one raw record.
enum RepoOutcome {
    Upserted { full_name: String },
    Skipped,
}

/// Run one complete pass for `organization`.
///
/// Never returns an error: traversal failure ends the pass in
/// [`PassState::Failed`], and every per-record failure is collected into the
/// returned status. Cancellation is checked before each repository.
#[tracing::instrument(
    skip_all,
    fields(provider = %adapter.provider(), organization = %organization)
)]
pub async fn run_pass(
    adapter: &dyn ProviderAdapter,
    store: &dyn RepositoryStore,
    throttle: &Throttle,
    organization: &str,
    cancel: &CancellationToken,
    on_progress: Option<&ProgressCallback>,
) -> SyncStatus {
    let provider = adapter.provider();
    let mut status = SyncStatus::new(provider, organization);

    emit(
        on_progress,
        SyncProgress::PassStarted {
            provider,
            organization: organization.to_string(),
        },
    );

    // ─── Listing ─────────────────────────────────────────────────────────────
    status.transition(PassState::Listing);
    emit(
        on_progress,
        SyncProgress::ListingRepos {
            provider,
            organization: organization.to_string(),
        },
    );

    let raws = match adapter.list_repositories(organization, throttle).await {
        Ok(raws) => raws,
        Err(source) => {
            let err = SyncError::TraversalFailure {
                organization: organization.to_string(),
                source,
            };
            tracing::error!(error = %err, "Pass failed during traversal");
            status.record(&err);
            status.fail(&err);
            emit(
                on_progress,
                SyncProgress::PassFailed {
                    provider,
                    organization: organization.to_string(),
                    reason: err.to_string(),
                },
            );
            return status;
        }
    };

    let total = raws.len();
    tracing::info!(total, "Listed repositories");
    emit(
        on_progress,
        SyncProgress::ListingComplete {
            provider,
            organization: organization.to_string(),
            total,
        },
    );

    // ─── Per-repository processing ───────────────────────────────────────────
    status.transition(PassState::PerRepoProcessing);

    for (index, raw) in raws.iter().enumerate() {
        if cancel.is_cancelled() {
            let remaining = total - index;
            tracing::info!(remaining, "Pass cancelled");
            status.cancelled = true;
            emit(
                on_progress,
                SyncProgress::PassCancelled {
                    provider,
                    organization: organization.to_string(),
                    remaining,
                },
            );
            break;
        }

        status.repo_count += 1;
        let mut failures = Vec::new();
        let outcome =
            sync_repository(adapter, store, throttle, organization, raw, &mut failures).await;

        for err in &failures {
            tracing::warn!(id = err.record_id(), kind = ?err.kind(), "{}", err.reason());
            status.record(err);
            if let Some(kind) = err.kind() {
                emit(
                    on_progress,
                    SyncProgress::RepoFailed {
                        provider,
                        organization: organization.to_string(),
                        id: err.record_id().unwrap_or_default().to_string(),
                        kind,
                        reason: err.reason(),
                    },
                );
            }
        }

        if let RepoOutcome::Upserted { full_name } = outcome {
            status.upserted += 1;
            tracing::debug!(full_name = %full_name, "Upserted repository");
            emit(
                on_progress,
                SyncProgress::RepoSynced {
                    provider,
                    organization: organization.to_string(),
                    full_name,
                    position: index + 1,
                    total,
                },
            );
        }
    }

    status.transition(PassState::Completed);
    tracing::info!(
        repo_count = status.repo_count,
        upserted = status.upserted,
        errors = status.error_count,
        cancelled = status.cancelled,
        "Pass complete"
    );
    emit(
        on_progress,
        SyncProgress::PassComplete {
            provider,
            organization: organization.to_string(),
            upserted: status.upserted,
            errors: status.error_count,
        },
    );

    status
}

/// Normalize, enrich and store one raw record, pushing any failures.
///
/// Normalization runs first so a malformed record costs no requests. A
/// language failure still stores the record with an empty mapping.
async fn sync_repository(
    adapter: &dyn ProviderAdapter,
    store: &dyn RepositoryStore,
    throttle: &Throttle,
    organization: &str,
    raw: &RawRepo,
    failures: &mut Vec<SyncError>,
) -> RepoOutcome {
    let id = raw.id();

    let path = match normalize(adapter, raw) {
        Ok(path) => path,
        Err(source) => {
            failures.push(SyncError::InvalidRawRecord { id, source });
            return RepoOutcome::Skipped;
        }
    };

    let languages = match adapter.get_languages(organization, raw, throttle).await {
        Ok(languages) => languages,
        Err(source) => {
            failures.push(SyncError::language_failure(id.clone(), source));
            Languages::new()
        }
    };

    let repo = CanonicalRepo::new(raw, path, languages);
    match store.upsert(&repo).await {
        Ok(()) => RepoOutcome::Upserted {
            full_name: repo.full_name,
        },
        Err(source) => {
            failures.push(SyncError::UpsertFailure { id, source });
            RepoOutcome::Skipped
        }
    }
}

fn normalize(adapter: &dyn ProviderAdapter, raw: &RawRepo) -> Result<RepoPath, NormalizeError> {
    if raw.provider() != adapter.provider() {
        return Err(NormalizeError::ProviderMismatch {
            expected: adapter.provider(),
            actual: raw.provider(),
        });
    }
    raw.normalize()
}
