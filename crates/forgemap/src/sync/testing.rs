//! Test doubles shared by the engine and coordinator tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::entity::provider::Provider;
use crate::github::GitHubRepo;
use crate::platform::{
    CanonicalRepo, Languages, PlatformError, ProviderAdapter, RawRepo, Result, Throttle,
};
use crate::repository::{self, MemoryStore, RepositoryError, RepositoryStore};

pub(crate) fn github_repo(id: i64, full_name: &str) -> RawRepo {
    RawRepo::GitHub(GitHubRepo {
        id,
        name: full_name.rsplit('/').next().unwrap_or_default().to_string(),
        full_name: Some(full_name.to_string()),
        ..Default::default()
    })
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum LanguageMode {
    NotFound,
    RateLimited,
}

/// Adapter serving a fixed listing with per-repository language behavior.
pub(crate) struct FakeAdapter {
    provider: Provider,
    repos: Vec<RawRepo>,
    fail_listing: bool,
    language_modes: HashMap<String, LanguageMode>,
    list_gate: Option<Arc<Notify>>,
    list_calls: AtomicUsize,
    language_calls: AtomicUsize,
}

impl FakeAdapter {
    pub(crate) fn new(provider: Provider, repos: Vec<RawRepo>) -> Self {
        Self {
            provider,
            repos,
            fail_listing: false,
            language_modes: HashMap::new(),
            list_gate: None,
            list_calls: AtomicUsize::new(0),
            language_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub(crate) fn with_language_mode(mut self, provider_repo_id: &str, mode: LanguageMode) -> Self {
        self.language_modes.insert(provider_repo_id.to_string(), mode);
        self
    }

    /// Block listing until `gate` is notified.
    pub(crate) fn with_list_gate(mut self, gate: Arc<Notify>) -> Self {
        self.list_gate = Some(gate);
        self
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn language_calls(&self) -> usize {
        self.language_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for FakeAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn request_delay(&self) -> Duration {
        Duration::ZERO
    }

    async fn list_repositories(&self, org: &str, throttle: &Throttle) -> Result<Vec<RawRepo>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.list_gate {
            gate.notified().await;
        }
        if self.fail_listing {
            return Err(PlatformError::network(format!("cannot list {}", org)));
        }
        throttle
            .call("list", || async { Ok(self.repos.clone()) })
            .await
    }

    async fn get_languages(
        &self,
        _org: &str,
        raw: &RawRepo,
        throttle: &Throttle,
    ) -> Result<Languages> {
        let mode = self.language_modes.get(&raw.provider_repo_id()).copied();
        throttle
            .call("languages", || async move {
                self.language_calls.fetch_add(1, Ordering::SeqCst);
                match mode {
                    Some(LanguageMode::NotFound) => Err(PlatformError::not_found("languages")),
                    Some(LanguageMode::RateLimited) => {
                        Err(PlatformError::RateLimited { reset_at: None })
                    }
                    None => Ok([("Rust".to_string(), 100.0)].into_iter().collect()),
                }
            })
            .await
    }
}

/// Store that rejects selected provider ids and delegates the rest.
pub(crate) struct FailingStore {
    failing: HashSet<String>,
    inner: MemoryStore,
}

impl FailingStore {
    pub(crate) fn new<const N: usize>(failing: [&str; N]) -> Self {
        Self {
            failing: failing.iter().map(|s| s.to_string()).collect(),
            inner: MemoryStore::new(),
        }
    }

    pub(crate) fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl RepositoryStore for FailingStore {
    async fn upsert(&self, repo: &CanonicalRepo) -> repository::Result<()> {
        if self.failing.contains(&repo.provider_repo_id) {
            return Err(RepositoryError::Database(sea_orm::DbErr::Custom(
                "database is locked".to_string(),
            )));
        }
        self.inner.upsert(repo).await
    }
}
