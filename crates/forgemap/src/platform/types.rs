use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bitbucket::BitbucketRepo;
use crate::entity::provider::Provider;
use crate::entity::repository::repository_id;
use crate::entity::visibility::Visibility;
use crate::github::GitHubRepo;
use crate::gitlab::GitLabProject;
use crate::path::{NormalizeError, RepoPath};

use super::errors::Result;
use super::pacing::Throttle;

/// Language name → relative weight. The scale is provider-defined
/// (bytes for GitHub, percentages for GitLab).
pub type Languages = BTreeMap<String, f64>;

/// Credentials for a provider API.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    /// Unauthenticated (public data only, lowest rate limits).
    #[default]
    None,
    /// Personal/project access token.
    Token(String),
    /// Username plus app password (Bitbucket).
    Basic { username: String, password: String },
}

impl Credentials {
    /// Build a token credential, treating an empty string as absent.
    pub fn token(token: impl Into<String>) -> Self {
        let token = token.into();
        if token.is_empty() {
            Self::None
        } else {
            Self::Token(token)
        }
    }

    /// Value for an `Authorization` header: `Bearer` for tokens, `Basic`
    /// for username/password pairs.
    pub fn authorization(&self) -> Option<String> {
        match self {
            Credentials::None => None,
            Credentials::Token(token) => Some(format!("Bearer {}", token)),
            Credentials::Basic { username, password } => Some(format!(
                "Basic {}",
                BASE64_STANDARD.encode(format!("{}:{}", username, password))
            )),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::None => write!(f, "Credentials::None"),
            Credentials::Token(_) => write!(f, "Credentials::Token(<redacted>)"),
            Credentials::Basic { username, .. } => {
                write!(f, "Credentials::Basic {{ username: {username:?}, password: <redacted> }}")
            }
        }
    }
}

/// Per-provider endpoint overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderEndpoint {
    /// API base URL (GitHub Enterprise, self-hosted GitLab). `None` uses the
    /// public cloud endpoint.
    pub base_url: Option<String>,
    /// Minimum spacing between requests. `None` uses the provider default.
    pub request_delay: Option<Duration>,
    /// Per-request HTTP timeout.
    pub timeout: Option<Duration>,
}

/// A provider-native repository record, as returned by a listing.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRepo {
    GitHub(GitHubRepo),
    GitLab(GitLabProject),
    Bitbucket(BitbucketRepo),
}

impl RawRepo {
    pub fn provider(&self) -> Provider {
        match self {
            RawRepo::GitHub(_) => Provider::GitHub,
            RawRepo::GitLab(_) => Provider::GitLab,
            RawRepo::Bitbucket(_) => Provider::Bitbucket,
        }
    }

    /// Opaque provider-assigned id.
    pub fn provider_repo_id(&self) -> String {
        match self {
            RawRepo::GitHub(repo) => repo.id.to_string(),
            RawRepo::GitLab(project) => project.id.to_string(),
            RawRepo::Bitbucket(repo) => repo.uuid.clone(),
        }
    }

    /// Derived id, `"{provider}:{provider_repo_id}"`.
    pub fn id(&self) -> String {
        repository_id(self.provider(), &self.provider_repo_id())
    }

    /// Best-effort human label for logs, available even for malformed records.
    pub fn label(&self) -> String {
        match self {
            RawRepo::GitHub(repo) => repo.full_name.clone().unwrap_or_else(|| repo.name.clone()),
            RawRepo::GitLab(project) => project
                .path_with_namespace
                .clone()
                .unwrap_or_else(|| project.path.clone()),
            RawRepo::Bitbucket(repo) => repo.slug.clone().unwrap_or_else(|| repo.uuid.clone()),
        }
    }

    /// Derive the normalized path. Pure.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError`] when a required path component is missing
    /// or malformed.
    pub fn normalize(&self) -> std::result::Result<RepoPath, NormalizeError> {
        let path = match self {
            RawRepo::GitHub(repo) => repo.repo_path(),
            RawRepo::GitLab(project) => project.repo_path(),
            RawRepo::Bitbucket(repo) => repo.repo_path(),
        }?;
        path.ensure_shape(self.provider().hierarchy())
    }

    pub fn visibility(&self) -> Visibility {
        match self {
            RawRepo::GitHub(repo) => repo
                .visibility
                .as_deref()
                .and_then(Visibility::from_label)
                .unwrap_or_else(|| Visibility::from_private_flag(repo.private)),
            RawRepo::GitLab(project) => project
                .visibility
                .as_deref()
                .and_then(Visibility::from_label)
                .unwrap_or_default(),
            RawRepo::Bitbucket(repo) => Visibility::from_private_flag(repo.is_private),
        }
    }

    pub fn is_archived(&self) -> bool {
        match self {
            RawRepo::GitHub(repo) => repo.archived,
            RawRepo::GitLab(project) => project.archived,
            RawRepo::Bitbucket(_) => false,
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        match self {
            RawRepo::GitHub(repo) => repo.created_at,
            RawRepo::GitLab(project) => project.created_at,
            RawRepo::Bitbucket(repo) => repo.created_on,
        }
    }

    /// Last push, or the nearest activity timestamp the provider reports.
    pub fn last_push_at(&self) -> Option<DateTime<Utc>> {
        match self {
            RawRepo::GitHub(repo) => repo.pushed_at,
            RawRepo::GitLab(project) => project.last_activity_at,
            RawRepo::Bitbucket(repo) => repo.updated_on,
        }
    }
}

/// The normalized record handed to the store.
///
/// `last_sync_at` is not part of it: the store stamps it on every upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRepo {
    pub provider: Provider,
    pub provider_repo_id: String,
    pub full_name: String,
    pub group_path: String,
    pub languages: Languages,
    pub visibility: Visibility,
    pub is_archived: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_push_at: Option<DateTime<Utc>>,
}

impl CanonicalRepo {
    /// Combine a raw record, its normalized path and its languages.
    pub fn new(raw: &RawRepo, path: RepoPath, languages: Languages) -> Self {
        let (full_name, group_path) = path.into_parts();
        Self {
            provider: raw.provider(),
            provider_repo_id: raw.provider_repo_id(),
            full_name,
            group_path,
            languages,
            visibility: raw.visibility(),
            is_archived: raw.is_archived(),
            created_at: raw.created_at(),
            last_push_at: raw.last_push_at(),
        }
    }

    /// Normalize a raw record in one step.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError`] if the raw record is malformed.
    pub fn from_raw(
        raw: &RawRepo,
        languages: Languages,
    ) -> std::result::Result<Self, NormalizeError> {
        Ok(Self::new(raw, raw.normalize()?, languages))
    }

    /// Derived id, `"{provider}:{provider_repo_id}"`.
    pub fn id(&self) -> String {
        repository_id(self.provider, &self.provider_repo_id)
    }
}

/// Uniform capability set over one provider's API.
///
/// Every network call an adapter issues goes through the supplied
/// [`Throttle`], which spaces requests and retries rate-limit rejections.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The provider this adapter talks to.
    fn provider(&self) -> Provider;

    /// Minimum spacing between consecutive requests to this provider.
    fn request_delay(&self) -> Duration;

    /// List every repository under one top-level container.
    ///
    /// Exhausts pagination and sub-container traversal internally; either the
    /// complete set is returned or the whole call fails.
    async fn list_repositories(&self, org: &str, throttle: &Throttle) -> Result<Vec<RawRepo>>;

    /// Language breakdown for one repository from this adapter's listing.
    async fn get_languages(&self, org: &str, raw: &RawRepo, throttle: &Throttle)
    -> Result<Languages>;

    /// Normalized container path for one raw record. Never performs I/O.
    fn extract_group_path(&self, raw: &RawRepo) -> std::result::Result<String, NormalizeError> {
        if raw.provider() != self.provider() {
            return Err(NormalizeError::ProviderMismatch {
                expected: self.provider(),
                actual: raw.provider(),
            });
        }
        raw.normalize().map(|path| path.group_path().to_string())
    }
}
