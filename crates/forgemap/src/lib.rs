//! Forgemap - mirrors repository metadata from GitHub, GitLab and Bitbucket
//! into one normalized table.
//!
//! Each provider organizes repositories differently: GitHub is flat
//! (organization → repository), Bitbucket has exactly two levels
//! (workspace → project → repository) and GitLab nests groups without limit.
//! Every record is reduced to the same shape, with a `group_path` that
//! supports delimiter-aware prefix queries regardless of provider.
//!
//! # Features
//!
//! - `migrate` - Enables database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to automatically run migrations on connection.
//! - `sqlite` / `postgres` - Database backends.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use forgemap::repository::DatabaseStore;
//! use forgemap::sync::{SyncCoordinator, SyncJob};
//! use forgemap::{Credentials, Provider, connect_and_migrate};
//! use tokio_util::sync::CancellationToken;
//!
//! let db = Arc::new(connect_and_migrate("sqlite://forgemap.db?mode=rwc").await?);
//! let coordinator = SyncCoordinator::new(Arc::new(DatabaseStore::new(Arc::clone(&db))));
//! let job = SyncJob::new(Provider::GitLab, Credentials::token(token), vec!["myorg".into()]);
//! let results = coordinator.run_job(&job, &CancellationToken::new(), None).await?;
//!
//! let platform = forgemap::repository::find_by_group_prefix(&*db, "myorg/platform").await?;
//! ```

pub mod bitbucket;
pub mod db;
pub mod entity;
pub mod github;
pub mod gitlab;
pub mod http;
pub mod path;
pub mod platform;
pub mod repository;
pub mod retry;
pub mod sync;

#[cfg(feature = "migrate")]
pub mod migration;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use path::{NormalizeError, RepoPath};
pub use platform::{
    CanonicalRepo, Credentials, PlatformError, ProviderAdapter, ProviderEndpoint, RawRepo,
    Throttle, create_adapter,
};
pub use repository::{DatabaseStore, MemoryStore, RepositoryError, RepositoryStore};
pub use retry::RetryConfig;
pub use sync::{SyncCoordinator, SyncError, SyncJob, SyncStatus};
