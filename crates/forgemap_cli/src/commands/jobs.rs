//! Run the `[[jobs]]` entries from configuration, once or on their intervals.

use std::sync::Arc;
use std::time::Duration;

use forgemap::sync::{SyncCoordinator, SyncJob};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::commands::output::{OutputFormat, PassReport, render};
use crate::commands::sync::{open_store, run_job_once};
use crate::config::Config;
use crate::progress::{LoggingReporter, ProgressReporter};

/// Shortest interval a watched job is allowed to run at.
const MIN_INTERVAL: Duration = Duration::from_secs(60);

fn watch_interval(job: &SyncJob) -> Duration {
    job.interval().max(MIN_INTERVAL)
}

/// Handle `forgemap jobs`. Returns whether every pass completed.
pub(crate) async fn handle_jobs(
    watch: bool,
    dry_run: bool,
    output: OutputFormat,
    config: &Config,
    database_url: &str,
    cancel: &CancellationToken,
) -> Result<bool, Box<dyn std::error::Error>> {
    let jobs = config.jobs();
    if jobs.is_empty() {
        println!("No jobs configured. Add [[jobs]] entries to forgemap.toml.");
        return Ok(true);
    }

    let store = open_store(database_url, dry_run).await?;
    let coordinator = SyncCoordinator::new(store).with_retry(config.retry_config());

    if watch {
        watch_jobs(coordinator, jobs, cancel).await;
        return Ok(true);
    }

    let reporter = Arc::new(ProgressReporter::new());
    let mut set = JoinSet::new();
    for (index, job) in jobs.into_iter().enumerate() {
        let coordinator = coordinator.clone();
        let cancel = cancel.clone();
        let reporter = Arc::clone(&reporter);
        set.spawn(async move {
            let reports = run_job_once(&coordinator, &job, &cancel, &reporter)
                .await
                .map_err(|e| format!("{} job: {}", job.provider, e));
            (index, reports)
        });
    }

    let mut finished = Vec::new();
    let mut failed_jobs = 0;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, Ok(reports))) => finished.push((index, reports)),
            Ok((_, Err(message))) => {
                tracing::error!("{}", message);
                failed_jobs += 1;
            }
            Err(e) => {
                tracing::error!("Job task failed: {}", e);
                failed_jobs += 1;
            }
        }
    }
    reporter.finish();

    finished.sort_by_key(|(index, _)| *index);
    let reports: Vec<PassReport> = finished
        .into_iter()
        .flat_map(|(_, reports)| reports)
        .collect();

    println!("{}", render(&reports, output)?);
    Ok(failed_jobs == 0 && reports.iter().all(PassReport::succeeded))
}

/// Run each job on its own interval until cancelled.
async fn watch_jobs(coordinator: SyncCoordinator, jobs: Vec<SyncJob>, cancel: &CancellationToken) {
    // Bars do not make sense for a long-running scheduler.
    let reporter = Arc::new(ProgressReporter::Logging(LoggingReporter::new()));
    let mut set = JoinSet::new();

    for job in jobs {
        let coordinator = coordinator.clone();
        let cancel = cancel.clone();
        let reporter = Arc::clone(&reporter);
        set.spawn(async move {
            let period = watch_interval(&job);
            tracing::info!(
                provider = %job.provider,
                organizations = ?job.organizations,
                interval_secs = period.as_secs(),
                "Scheduling job"
            );

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match run_job_once(&coordinator, &job, &cancel, &reporter).await {
                    Ok(reports) => {
                        let failed = reports.iter().filter(|r| !r.succeeded()).count();
                        if failed > 0 {
                            tracing::warn!(provider = %job.provider, failed, "Job run finished with failed passes");
                        }
                    }
                    Err(e) => {
                        tracing::error!(provider = %job.provider, "Job run failed: {}", e);
                    }
                }
            }

            tracing::info!(provider = %job.provider, "Job stopped");
        });
    }

    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Job task failed: {}", e);
        }
    }
}
