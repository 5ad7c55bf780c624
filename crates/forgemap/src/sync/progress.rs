//! Progress events emitted while a pass runs.
//!
//! The engine reports through an optional callback so that the CLI can log,
//! render or ignore them without the engine knowing which.

use crate::entity::provider::Provider;

use super::errors::FailureKind;

/// Progress events emitted during sync passes.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// A pass has acquired its slot and is about to list.
    PassStarted {
        provider: Provider,
        organization: String,
    },

    /// Listing (including sub-container traversal) is in progress.
    ListingRepos {
        provider: Provider,
        organization: String,
    },

    /// Listing finished.
    ListingComplete {
        provider: Provider,
        organization: String,
        /// Number of repositories discovered.
        total: usize,
    },

    /// One repository was written to the store.
    RepoSynced {
        provider: Provider,
        organization: String,
        full_name: String,
        /// 1-indexed position within the pass.
        position: usize,
        total: usize,
    },

    /// One repository hit a per-record failure.
    RepoFailed {
        provider: Provider,
        organization: String,
        id: String,
        kind: FailureKind,
        reason: String,
    },

    /// Cancellation stopped the pass between repositories.
    PassCancelled {
        provider: Provider,
        organization: String,
        /// Repositories left unattempted.
        remaining: usize,
    },

    /// The pass reached `Completed`, possibly with per-record errors.
    PassComplete {
        provider: Provider,
        organization: String,
        upserted: usize,
        errors: usize,
    },

    /// The pass reached `Failed`.
    PassFailed {
        provider: Provider,
        organization: String,
        reason: String,
    },
}

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_emit_with_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let callback: ProgressCallback = Box::new(move |_event| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        emit(
            Some(&callback),
            SyncProgress::PassStarted {
                provider: Provider::GitHub,
                organization: "acme".to_string(),
            },
        );
        emit(
            Some(&callback),
            SyncProgress::ListingComplete {
                provider: Provider::GitHub,
                organization: "acme".to_string(),
                total: 3,
            },
        );

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_emit_without_callback() {
        emit(
            None,
            SyncProgress::PassFailed {
                provider: Provider::GitLab,
                organization: "myorg".to_string(),
                reason: "boom".to_string(),
            },
        );
    }

    #[test]
    fn test_events_preserve_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = Arc::clone(&events);

        let callback: ProgressCallback = Box::new(move |event| {
            events_clone.lock().unwrap().push(format!("{:?}", event));
        });

        emit(
            Some(&callback),
            SyncProgress::ListingRepos {
                provider: Provider::Bitbucket,
                organization: "ws".to_string(),
            },
        );
        emit(
            Some(&callback),
            SyncProgress::PassComplete {
                provider: Provider::Bitbucket,
                organization: "ws".to_string(),
                upserted: 2,
                errors: 0,
            },
        );

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].contains("ListingRepos"));
        assert!(events[1].contains("PassComplete"));
    }
}
