//! Persistence seam for the sync engine.
//!
//! The engine only ever upserts, so the trait is one method wide. The
//! database-backed store is what production uses; the in-memory store backs
//! dry runs and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::DatabaseConnection;

use crate::entity::provider::Provider;
use crate::entity::repository::Model;
use crate::platform::CanonicalRepo;

use super::errors::Result;
use super::single;

/// Sink for canonical repository records, keyed by `(provider, provider_repo_id)`.
#[async_trait]
pub trait RepositoryStore: Send + Sync {
    /// Insert or fully replace the record, stamping `last_sync_at` with now.
    async fn upsert(&self, repo: &CanonicalRepo) -> Result<()>;
}

/// Store writing to a shared sea-orm connection.
#[derive(Debug, Clone)]
pub struct DatabaseStore {
    db: Arc<DatabaseConnection>,
}

impl DatabaseStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl RepositoryStore for DatabaseStore {
    async fn upsert(&self, repo: &CanonicalRepo) -> Result<()> {
        single::upsert(self.db.as_ref(), repo).await
    }
}

/// Store holding rows in memory with the same conflict-key semantics.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<(Provider, String), Model>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Look up a row by its conflict key.
    pub fn get(&self, provider: Provider, provider_repo_id: &str) -> Option<Model> {
        self.lock()
            .get(&(provider, provider_repo_id.to_string()))
            .cloned()
    }

    /// Snapshot of every row, ordered by full name.
    pub fn rows(&self) -> Vec<Model> {
        let mut rows: Vec<Model> = self.lock().values().cloned().collect();
        rows.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        rows
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(Provider, String), Model>> {
        // A poisoned map still holds whole rows; each insert is a single call.
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RepositoryStore for MemoryStore {
    async fn upsert(&self, repo: &CanonicalRepo) -> Result<()> {
        single::validate(repo)?;
        let model = repo.to_model(Utc::now());
        self.lock()
            .insert((repo.provider, repo.provider_repo_id.clone()), model);
        Ok(())
    }
}
