//! Forgemap CLI - mirror repository metadata from code hosting providers.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::Term;
use forgemap::Provider;
use tracing_subscriber::EnvFilter;

use crate::commands::output::OutputFormat;
use crate::commands::sync::SyncArgs;

#[derive(Parser)]
#[command(name = "forgemap")]
#[command(version)]
#[command(about = "Mirror repository metadata from GitHub, GitLab and Bitbucket")]
#[command(
    long_about = "Forgemap lists every repository of an organization on GitHub, GitLab or \
Bitbucket Cloud, normalizes each into one record shape with a provider-neutral group path, \
and upserts it into a local database. Rows are never deleted."
)]
#[command(after_long_help = r#"EXAMPLES
    Sync a GitHub organization:
        $ forgemap sync github rust-lang

    Sync GitLab groups (subgroups are traversed):
        $ forgemap sync gitlab my-company other-group

    Sync a self-hosted GitLab with slower request pacing:
        $ forgemap sync gitlab platform -H gitlab.example.com --delay-ms 500

    See what a sync would write without touching the database:
        $ forgemap sync bitbucket my-workspace --dry-run

    Run configured jobs on their intervals:
        $ forgemap jobs --watch

CONFIGURATION
    Forgemap reads configuration from:
      1. ~/.config/forgemap/config.toml (or $XDG_CONFIG_HOME/forgemap/config.toml)
      2. ./forgemap.toml
      3. Environment variables (FORGEMAP_* prefix)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    FORGEMAP_DATABASE_URL        Database connection string (default: ~/.local/state/forgemap/forgemap.db)
    FORGEMAP_GITHUB_TOKEN        GitHub personal access token
    FORGEMAP_GITLAB_TOKEN        GitLab personal access token
    FORGEMAP_GITLAB_HOST         GitLab host (default: gitlab.com)
    FORGEMAP_BITBUCKET_USERNAME  Bitbucket username (app-password auth)
    FORGEMAP_BITBUCKET_TOKEN     Bitbucket app password or access token
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Sync every repository of one or more organizations
    Sync {
        /// Provider: github, gitlab or bitbucket
        provider: Provider,

        /// Organization, group or workspace name(s)
        #[arg(required = true)]
        orgs: Vec<String>,

        /// API root or instance host (default from config, then the public cloud)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Minimum milliseconds between requests (default from config, then provider default)
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Dry run - normalize without writing to the database
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Run the jobs defined in configuration
    Jobs {
        /// Keep running, re-syncing each job on its interval until Ctrl+C
        #[arg(short, long)]
        watch: bool,

        /// Dry run - normalize without writing to the database
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Output format (single run only)
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

fn init_tracing() {
    // Interactive runs draw progress bars, so only warnings are logged by default.
    let default_filter = if Term::stderr().is_term() {
        "forgemap=warn,forgemap_cli=warn"
    } else {
        "forgemap=info,forgemap_cli=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Create the parent directory of a SQLite database file.
fn ensure_sqlite_dir(database_url: &str) -> std::io::Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    if db_path.is_empty() || db_path.contains(":memory:") {
        return Ok(());
    }
    let db_path = std::path::Path::new(db_path);

    if db_path.is_relative() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory. \
             Consider using an absolute path.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    // Handle commands that don't require configuration or the database first
    match &cli.command {
        Commands::Completions { shell } => {
            commands::meta::handle_completions(*shell)?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output.clone())?;
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    // Load configuration (config files -> env vars -> defaults)
    let config = config::Config::load();

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set FORGEMAP_DATABASE_URL")?;
    ensure_sqlite_dir(&database_url)?;

    let all_passed = match cli.command {
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
            true
        }
        Commands::Sync {
            provider,
            orgs,
            host,
            delay_ms,
            dry_run,
            output,
        } => {
            let cancel = shutdown::setup_shutdown_handler();
            let args = SyncArgs {
                provider,
                organizations: orgs,
                host,
                delay_ms,
                dry_run,
                output,
            };
            commands::sync::handle_sync(args, &config, &database_url, &cancel).await?
        }
        Commands::Jobs {
            watch,
            dry_run,
            output,
        } => {
            let cancel = shutdown::setup_shutdown_handler();
            commands::jobs::handle_jobs(watch, dry_run, output, &config, &database_url, &cancel)
                .await?
        }
        Commands::Completions { .. } | Commands::Man { .. } => true,
    };

    Ok(if all_passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
