//! GitHub API data types.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::path::{NormalizeError, RepoPath, normalize_flat};

/// GitHub repository - fields we need from the API response.
///
/// Only the fields forgemap reads are declared, which keeps decoding
/// resilient to API additions.
///
/// API docs: https://docs.github.com/en/rest/repos/repos#list-organization-repositories
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GitHubRepo {
    /// Numeric repository id (stable across renames and transfers).
    pub id: i64,
    /// Repository name.
    #[serde(default)]
    pub name: String,
    /// Full name including owner (e.g., "owner/repo").
    pub full_name: Option<String>,
    /// Owner account.
    pub owner: Option<GitHubOwner>,
    /// Whether the repository is private.
    #[serde(default)]
    pub private: bool,
    /// "public", "private" or "internal" (Enterprise).
    pub visibility: Option<String>,
    /// Whether the repository is archived.
    #[serde(default)]
    pub archived: bool,
    /// When the repo was created.
    pub created_at: Option<DateTime<Utc>>,
    /// When code was last pushed (may be null for empty repositories).
    pub pushed_at: Option<DateTime<Utc>>,
}

/// Repository owner (user or organization).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GitHubOwner {
    pub login: String,
}

impl GitHubRepo {
    /// Derive the flat `owner/name` path.
    ///
    /// `full_name` is authoritative; when it is absent the path is rebuilt
    /// from the owner login and repository name.
    pub fn repo_path(&self) -> Result<RepoPath, NormalizeError> {
        match (&self.full_name, &self.owner) {
            (Some(full_name), _) => normalize_flat(Some(full_name.as_str())),
            (None, Some(owner)) if !self.name.is_empty() => {
                normalize_flat(Some(format!("{}/{}", owner.login, self.name).as_str()))
            }
            _ => Err(NormalizeError::MissingComponent { field: "full_name" }),
        }
    }
}
