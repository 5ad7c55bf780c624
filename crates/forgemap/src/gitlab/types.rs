//! GitLab API data types.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::path::{NormalizeError, RepoPath, normalize_unbounded};

/// GitLab group or subgroup.
///
/// API docs: https://docs.gitlab.com/ee/api/groups.html
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitLabGroup {
    /// Numeric group id.
    pub id: u64,
    /// The group's own path segment.
    pub path: String,
    /// Full path from the top-level group (e.g., "myorg/platform").
    pub full_path: String,
}

/// GitLab project - fields we need from the API response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GitLabProject {
    /// Numeric project id.
    pub id: u64,
    /// The project's own path segment.
    #[serde(default)]
    pub path: String,
    /// Full path including every ancestor group and the project itself.
    pub path_with_namespace: Option<String>,
    /// "public", "internal" or "private".
    pub visibility: Option<String>,
    #[serde(default)]
    pub archived: bool,
    pub created_at: Option<DateTime<Utc>>,
    /// GitLab has no push timestamp in listings; last activity is the nearest.
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl GitLabProject {
    pub fn repo_path(&self) -> Result<RepoPath, NormalizeError> {
        normalize_unbounded(self.path_with_namespace.as_deref())
    }
}
