//! One-shot sync of one or more organizations on a single provider.

use std::sync::Arc;

use console::style;
use forgemap::sync::{SyncCoordinator, SyncJob};
use forgemap::{DatabaseStore, MemoryStore, Provider, RepositoryStore, connect_and_migrate};
use tokio_util::sync::CancellationToken;

use crate::commands::output::{OutputFormat, PassReport, render};
use crate::config::Config;
use crate::progress::ProgressReporter;

/// Store passes write into: the database, or memory for dry runs.
pub(crate) async fn open_store(
    database_url: &str,
    dry_run: bool,
) -> Result<Arc<dyn RepositoryStore>, Box<dyn std::error::Error>> {
    if dry_run {
        tracing::info!("Dry run: repositories are normalized but not written");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let db = connect_and_migrate(database_url).await?;
    Ok(Arc::new(DatabaseStore::new(Arc::new(db))))
}

/// Run every organization of `job` once and return a report per organization.
pub(crate) async fn run_job_once(
    coordinator: &SyncCoordinator,
    job: &SyncJob,
    cancel: &CancellationToken,
    reporter: &Arc<ProgressReporter>,
) -> Result<Vec<PassReport>, Box<dyn std::error::Error>> {
    let results = coordinator
        .run_job(job, cancel, Some(reporter.as_callback()))
        .await?;
    Ok(PassReport::from_job(job, results))
}

pub(crate) struct SyncArgs {
    pub provider: Provider,
    pub organizations: Vec<String>,
    pub host: Option<String>,
    pub delay_ms: Option<u64>,
    pub dry_run: bool,
    pub output: OutputFormat,
}

/// Handle `forgemap sync`. Returns whether every pass completed.
pub(crate) async fn handle_sync(
    args: SyncArgs,
    config: &Config,
    database_url: &str,
    cancel: &CancellationToken,
) -> Result<bool, Box<dyn std::error::Error>> {
    let credentials = config.provider(args.provider).credentials();
    if credentials == forgemap::Credentials::None {
        tracing::warn!(
            provider = %args.provider,
            "No credentials configured; only public repositories are visible"
        );
    }

    let job = config.job_for(
        args.provider,
        args.organizations,
        args.host.as_deref(),
        args.delay_ms,
    );

    let store = open_store(database_url, args.dry_run).await?;
    let coordinator = SyncCoordinator::new(store).with_retry(config.retry_config());
    let reporter = Arc::new(ProgressReporter::new());

    let reports = run_job_once(&coordinator, &job, cancel, &reporter).await?;
    reporter.finish();

    println!("{}", render(&reports, args.output)?);

    if args.dry_run && matches!(args.output, OutputFormat::Table) {
        let normalized: usize = reports
            .iter()
            .filter_map(|r| match r {
                PassReport::Ran(status) => Some(status.upserted),
                PassReport::NotRun { .. } => None,
            })
            .sum();
        println!(
            "{} {} repositories normalized, nothing written.",
            style("Dry run:").yellow().bold(),
            normalized
        );
    }

    Ok(reports.iter().all(PassReport::succeeded))
}
