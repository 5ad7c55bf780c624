//! Configuration file support for forgemap.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `FORGEMAP_`, e.g., `FORGEMAP_DATABASE_URL`)
//! 3. Local config file (./forgemap.toml)
//! 4. XDG config file (~/.config/forgemap/config.toml)
//! 5. Built-in defaults
//!
//! Environment variables map `_` to nesting, so only single-word keys
//! (`url`, `token`, `host`, `username`) can be set that way. Multi-word keys
//! such as `delay_ms` belong in a config file.
//!
//! The database URL defaults to `sqlite://~/.local/state/forgemap/forgemap.db` on Linux
//! (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "postgres:///forgemap"
//!
//! [github]
//! token = "ghp_..."        # or FORGEMAP_GITHUB_TOKEN
//! host = "https://ghe.example.com/api/v3"  # GitHub Enterprise API root
//!
//! [gitlab]
//! host = "gitlab.example.com"
//! token = "glpat-..."      # or FORGEMAP_GITLAB_TOKEN
//! delay_ms = 250
//!
//! [bitbucket]
//! username = "me"          # app-password auth
//! token = "..."            # or FORGEMAP_BITBUCKET_TOKEN
//!
//! [sync]
//! rate_limit_backoff_secs = 60
//! request_timeout_secs = 30
//!
//! [[jobs]]
//! provider = "gitlab"
//! organizations = ["myorg"]
//! interval_minutes = 30
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use forgemap::retry::RetryConfig;
use forgemap::sync::SyncJob;
use forgemap::{Credentials, Provider, ProviderEndpoint};
use serde::Deserialize;

const APP_NAME: &str = "forgemap";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// GitHub configuration.
    pub github: ProviderConfig,
    /// GitLab configuration.
    pub gitlab: ProviderConfig,
    /// Bitbucket Cloud configuration.
    pub bitbucket: ProviderConfig,
    /// Sync tuning.
    pub sync: SyncConfig,
    /// Scheduled jobs run by `forgemap jobs`.
    pub jobs: Vec<JobConfig>,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    pub url: Option<String>,
}

/// Per-provider connection settings.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API root (GitHub, Bitbucket) or instance host (GitLab).
    pub host: Option<String>,
    /// Access token, or the app password when `username` is set.
    pub token: Option<String>,
    /// Username for basic auth (Bitbucket app passwords).
    pub username: Option<String>,
    /// Override for the provider's default request spacing.
    pub delay_ms: Option<u64>,
}

impl ProviderConfig {
    /// Credentials from the configured token and optional username.
    pub fn credentials(&self) -> Credentials {
        let token = self.token.as_deref().map(str::trim).filter(|t| !t.is_empty());
        match (self.username.as_deref(), token) {
            (Some(username), Some(password)) if !username.is_empty() => Credentials::Basic {
                username: username.to_string(),
                password: password.to_string(),
            },
            (_, Some(token)) => Credentials::token(token),
            _ => Credentials::None,
        }
    }
}

/// Sync tuning shared by all providers.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Wait before retrying a rate-limited request.
    pub rate_limit_backoff_secs: u64,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            rate_limit_backoff_secs: 60,
            request_timeout_secs: 30,
        }
    }
}

/// One `[[jobs]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub provider: Provider,
    pub organizations: Vec<String>,
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
}

fn default_interval_minutes() -> u64 {
    60
}

/// Accept bare hosts such as `gitlab.example.com`.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/forgemap/config.toml)
    /// 3. Local config file (./forgemap.toml)
    /// 4. Environment variables with FORGEMAP_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("forgemap.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./forgemap.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., FORGEMAP_DATABASE_URL -> database.url
        builder = builder.add_source(
            Environment::with_prefix("FORGEMAP")
                .separator("_")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("forgemap.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    pub fn provider(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::GitHub => &self.github,
            Provider::GitLab => &self.gitlab,
            Provider::Bitbucket => &self.bitbucket,
        }
    }

    /// Endpoint for `provider`, with CLI overrides taking precedence.
    pub fn endpoint(
        &self,
        provider: Provider,
        host: Option<&str>,
        delay_ms: Option<u64>,
    ) -> ProviderEndpoint {
        let settings = self.provider(provider);
        ProviderEndpoint {
            base_url: host.or(settings.host.as_deref()).map(normalize_host),
            request_delay: delay_ms.or(settings.delay_ms).map(Duration::from_millis),
            timeout: Some(Duration::from_secs(self.sync.request_timeout_secs.max(1))),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(Duration::from_secs(self.sync.rate_limit_backoff_secs))
    }

    /// Build the job for an ad-hoc `sync` invocation.
    pub fn job_for(
        &self,
        provider: Provider,
        organizations: Vec<String>,
        host: Option<&str>,
        delay_ms: Option<u64>,
    ) -> SyncJob {
        SyncJob::new(
            provider,
            self.provider(provider).credentials(),
            organizations,
        )
        .with_endpoint(self.endpoint(provider, host, delay_ms))
    }

    /// Every configured `[[jobs]]` entry as a runnable job.
    pub fn jobs(&self) -> Vec<SyncJob> {
        self.jobs
            .iter()
            .map(|job| {
                self.job_for(job.provider, job.organizations.clone(), None, None)
                    .with_interval_minutes(job.interval_minutes)
            })
            .collect()
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/forgemap` or `~/.local/state/forgemap`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| {
            // state_dir() returns None on macOS/Windows, fall back to data_dir
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
