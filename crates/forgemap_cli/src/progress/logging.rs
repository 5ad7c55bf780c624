use forgemap::sync::SyncProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::PassStarted {
                provider,
                organization,
            } => {
                tracing::info!(provider = %provider, organization = %organization, "Sync pass started");
            }

            SyncProgress::ListingRepos {
                provider,
                organization,
            } => {
                tracing::debug!(provider = %provider, organization = %organization, "Listing repositories");
            }

            SyncProgress::ListingComplete {
                provider,
                organization,
                total,
            } => {
                tracing::info!(provider = %provider, organization = %organization, total, "Listing complete");
            }

            SyncProgress::RepoSynced {
                provider,
                full_name,
                position,
                total,
                ..
            } => {
                tracing::debug!(provider = %provider, repo = %full_name, position, total, "Synced");
            }

            SyncProgress::RepoFailed {
                provider,
                organization,
                id,
                kind,
                reason,
            } => {
                tracing::warn!(
                    provider = %provider,
                    organization = %organization,
                    id = %id,
                    kind = %kind,
                    "Repository failed: {}",
                    reason
                );
            }

            SyncProgress::PassCancelled {
                provider,
                organization,
                remaining,
            } => {
                tracing::warn!(provider = %provider, organization = %organization, remaining, "Sync pass cancelled");
            }

            SyncProgress::PassComplete {
                provider,
                organization,
                upserted,
                errors,
            } => {
                if errors > 0 {
                    tracing::warn!(provider = %provider, organization = %organization, upserted, errors, "Sync pass complete with errors");
                } else {
                    tracing::info!(provider = %provider, organization = %organization, upserted, "Sync pass complete");
                }
            }

            SyncProgress::PassFailed {
                provider,
                organization,
                reason,
            } => {
                tracing::error!(provider = %provider, organization = %organization, "Sync pass failed: {}", reason);
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
