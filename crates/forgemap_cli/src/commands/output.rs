//! Rendering of pass results as tables or JSON.

use clap::ValueEnum;
use forgemap::Provider;
use forgemap::sync::{SyncError, SyncJob, SyncStatus};
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

/// Output format for pass results.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// The outcome of one organization within a job run.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum PassReport {
    Ran(SyncStatus),
    NotRun {
        provider: Provider,
        organization: String,
        error: String,
    },
}

impl PassReport {
    /// Pair each result with the organization it was run for.
    pub(crate) fn from_job(
        job: &SyncJob,
        results: Vec<Result<SyncStatus, SyncError>>,
    ) -> Vec<PassReport> {
        job.distinct_organizations()
            .into_iter()
            .zip(results)
            .map(|(organization, result)| match result {
                Ok(status) => PassReport::Ran(status),
                Err(e) => PassReport::NotRun {
                    provider: job.provider,
                    organization,
                    error: e.to_string(),
                },
            })
            .collect()
    }

    /// Whether the pass ran to `Completed`. Per-record errors do not count.
    pub(crate) fn succeeded(&self) -> bool {
        match self {
            PassReport::Ran(status) => !status.is_failed(),
            PassReport::NotRun { .. } => false,
        }
    }
}

#[derive(Debug, Tabled)]
struct StatusRow {
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Organization")]
    organization: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Repos")]
    repos: usize,
    #[tabled(rename = "Upserted")]
    upserted: usize,
    #[tabled(rename = "Errors")]
    errors: usize,
    #[tabled(rename = "Duration")]
    duration: String,
}

impl From<&PassReport> for StatusRow {
    fn from(report: &PassReport) -> Self {
        match report {
            PassReport::Ran(status) => {
                let mut state = status.state.to_string();
                if status.cancelled {
                    state.push_str(" (cancelled)");
                }
                StatusRow {
                    provider: status.provider.to_string(),
                    organization: status.organization.clone(),
                    state,
                    repos: status.repo_count,
                    upserted: status.upserted,
                    errors: status.error_count,
                    duration: status
                        .duration()
                        .map(format_duration)
                        .unwrap_or_else(|| "-".to_string()),
                }
            }
            PassReport::NotRun {
                provider,
                organization,
                ..
            } => StatusRow {
                provider: provider.to_string(),
                organization: organization.clone(),
                state: "not run".to_string(),
                repos: 0,
                upserted: 0,
                errors: 0,
                duration: "-".to_string(),
            },
        }
    }
}

#[derive(Debug, Tabled)]
struct ErrorRow {
    #[tabled(rename = "Organization")]
    organization: String,
    #[tabled(rename = "Repository")]
    id: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

fn error_rows(reports: &[PassReport]) -> Vec<ErrorRow> {
    let mut rows = Vec::new();
    for report in reports {
        match report {
            PassReport::Ran(status) => {
                rows.extend(status.errors.iter().map(|failure| ErrorRow {
                    organization: status.organization.clone(),
                    id: if failure.id.is_empty() {
                        "-".to_string()
                    } else {
                        failure.id.clone()
                    },
                    kind: failure.kind.to_string(),
                    reason: failure.reason.clone(),
                }));
            }
            PassReport::NotRun {
                organization,
                error,
                ..
            } => rows.push(ErrorRow {
                organization: organization.clone(),
                id: "-".to_string(),
                kind: "not_run".to_string(),
                reason: error.clone(),
            }),
        }
    }
    rows
}

fn format_duration(duration: chrono::Duration) -> String {
    let millis = duration.num_milliseconds().max(0);
    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.1}s", millis as f64 / 1000.0)
    } else {
        format!("{}m{:02}s", millis / 60_000, (millis % 60_000) / 1000)
    }
}

/// Render reports in the requested format.
pub(crate) fn render(
    reports: &[PassReport],
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(reports),
        OutputFormat::Table => {
            if reports.is_empty() {
                return Ok("No organizations to sync.".to_string());
            }

            let mut table = Table::new(reports.iter().map(StatusRow::from));
            table.with(Style::rounded());
            let mut out = table.to_string();

            let errors = error_rows(reports);
            if !errors.is_empty() {
                let mut table = Table::new(errors);
                table.with(Style::rounded());
                out.push_str("\n\nErrors:\n");
                out.push_str(&table.to_string());
            }
            Ok(out)
        }
    }
}
