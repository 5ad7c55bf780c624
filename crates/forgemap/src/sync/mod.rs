//! Sync engine: runs passes that mirror provider repositories into the store.
//!
//! # Module Structure
//!
//! - [`types`] - `PassState`, `SyncStatus`, `SyncJob`
//! - [`errors`] - `SyncError` taxonomy and `FailureKind`
//! - [`progress`] - Progress reporting: `SyncProgress`, `ProgressCallback`, `emit()`
//! - [`engine`] - The per-pass loop: `run_pass()`
//! - [`coordinator`] - Re-entrancy guard and concurrent organizations
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use forgemap::repository::DatabaseStore;
//! use forgemap::sync::{SyncCoordinator, SyncJob};
//!
//! let coordinator = SyncCoordinator::new(Arc::new(DatabaseStore::new(db)));
//! for result in coordinator.run_job(&job, &cancel, None).await? {
//!     let status = result?;
//!     println!("{}: {} upserted", status.organization, status.upserted);
//! }
//! ```

pub mod coordinator;
pub mod engine;
mod errors;
mod progress;
#[cfg(test)]
mod testing;
mod types;

pub use coordinator::{PassGuard, PassRegistry, SyncCoordinator};
pub use engine::run_pass;
pub use errors::{FailureKind, SyncError};
pub use progress::{ProgressCallback, SyncProgress, emit};
pub use types::{PassState, RecordFailure, SyncJob, SyncStatus};
