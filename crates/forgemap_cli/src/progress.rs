//! Progress reporting for sync passes.
//!
//! This module provides two modes of progress reporting:
//! - Interactive mode (TTY): Animated progress bars using indicatif
//! - Logging mode (non-TTY): Structured logging using tracing
//!
//! Interactive mode draws one bar per provider/organization pass. The bar
//! spins while listing and switches to a counted bar once the listing total
//! is known.

mod interactive;
mod logging;

use std::sync::Arc;

use console::Term;
use forgemap::sync::{ProgressCallback, SyncProgress};

pub use interactive::InteractiveReporter;
pub use logging::LoggingReporter;

/// Progress reporter that handles both interactive and logging modes.
pub enum ProgressReporter {
    /// Interactive progress bars for TTY.
    Interactive(InteractiveReporter),
    /// Structured logging for non-TTY (CI, pipes).
    Logging(LoggingReporter),
}

impl ProgressReporter {
    /// Create a new progress reporter, auto-detecting TTY mode.
    pub fn new() -> Self {
        if Term::stderr().is_term() {
            Self::Interactive(InteractiveReporter::new())
        } else {
            Self::Logging(LoggingReporter::new())
        }
    }

    /// Handle a progress event.
    pub fn handle(&self, event: SyncProgress) {
        match self {
            Self::Interactive(r) => r.handle(event),
            Self::Logging(r) => r.handle(event),
        }
    }

    /// Convert to a ProgressCallback for the library.
    pub fn as_callback(self: &Arc<Self>) -> Arc<ProgressCallback> {
        let reporter = Arc::clone(self);
        Arc::new(Box::new(move |event| {
            reporter.handle(event);
        }))
    }

    /// Finish all progress bars (interactive mode only).
    pub fn finish(&self) {
        if let Self::Interactive(r) = self {
            r.finish();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Bar key and label for a pass.
fn pass_label(provider: forgemap::Provider, organization: &str) -> String {
    format!("{}:{}", provider, organization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgemap::Provider;
    use forgemap::sync::FailureKind;

    fn events() -> Vec<SyncProgress> {
        let provider = Provider::GitLab;
        let organization = "myorg".to_string();
        vec![
            SyncProgress::PassStarted {
                provider,
                organization: organization.clone(),
            },
            SyncProgress::ListingRepos {
                provider,
                organization: organization.clone(),
            },
            SyncProgress::ListingComplete {
                provider,
                organization: organization.clone(),
                total: 2,
            },
            SyncProgress::RepoSynced {
                provider,
                organization: organization.clone(),
                full_name: "myorg/a".to_string(),
                position: 1,
                total: 2,
            },
            SyncProgress::RepoFailed {
                provider,
                organization: organization.clone(),
                id: "2".to_string(),
                kind: FailureKind::UpsertFailure,
                reason: "database unavailable".to_string(),
            },
            SyncProgress::PassComplete {
                provider,
                organization,
                upserted: 1,
                errors: 1,
            },
        ]
    }

    #[test]
    fn test_pass_label() {
        assert_eq!(pass_label(Provider::GitHub, "acme"), "github:acme");
    }

    #[test]
    fn test_logging_reporter_handles_full_pass() {
        let reporter = Arc::new(ProgressReporter::Logging(LoggingReporter::new()));
        let callback = reporter.as_callback();
        for event in events() {
            (*callback)(event);
        }
        reporter.finish();
    }

    #[test]
    fn test_interactive_reporter_tracks_bar_per_pass() {
        let reporter = InteractiveReporter::hidden();
        for event in events() {
            reporter.handle(event);
        }
        assert_eq!(reporter.bar_position("gitlab:myorg"), Some(2));
        assert_eq!(reporter.bar_length("gitlab:myorg"), Some(2));
        reporter.finish();
    }

    #[test]
    fn test_interactive_reporter_separate_orgs() {
        let reporter = InteractiveReporter::hidden();
        for organization in ["a", "b"] {
            reporter.handle(SyncProgress::ListingComplete {
                provider: Provider::GitHub,
                organization: organization.to_string(),
                total: 5,
            });
        }
        reporter.handle(SyncProgress::RepoSynced {
            provider: Provider::GitHub,
            organization: "b".to_string(),
            full_name: "b/x".to_string(),
            position: 1,
            total: 5,
        });
        assert_eq!(reporter.bar_position("github:a"), Some(0));
        assert_eq!(reporter.bar_position("github:b"), Some(1));
        assert_eq!(reporter.bar_position("github:c"), None);
    }

    #[test]
    fn test_interactive_reporter_failed_pass_without_listing() {
        let reporter = InteractiveReporter::hidden();
        reporter.handle(SyncProgress::PassFailed {
            provider: Provider::Bitbucket,
            organization: "ws".to_string(),
            reason: "workspace not found".to_string(),
        });
        assert!(reporter.bar_position("bitbucket:ws").is_some());
        reporter.finish();
    }
}
