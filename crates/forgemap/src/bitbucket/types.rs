//! Bitbucket Cloud API data types.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::path::{NormalizeError, RepoPath, normalize_two_level};
use crate::platform::Languages;

/// One page of a paginated Bitbucket listing.
///
/// API docs: https://developer.atlassian.com/cloud/bitbucket/rest/intro/#pagination
#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketPage<T> {
    pub values: Vec<T>,
    /// Absolute URL of the next page, absent on the last one.
    pub next: Option<String>,
}

/// A project inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BitbucketProject {
    /// Short identifier, unique within the workspace (e.g., "PLAT").
    pub key: String,
    pub name: Option<String>,
}

/// Workspace reference embedded in a repository payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BitbucketWorkspaceRef {
    pub slug: String,
}

/// Project reference embedded in a repository payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BitbucketProjectRef {
    pub key: String,
}

/// Bitbucket repository - fields we need from the API response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BitbucketRepo {
    /// Repository UUID including braces (e.g., "{a1b2...}").
    pub uuid: String,
    /// URL-safe repository name.
    pub slug: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    /// Single primary language, lowercase; empty when unknown.
    pub language: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
    /// Bitbucket reports no push time; last update is the nearest.
    pub updated_on: Option<DateTime<Utc>>,
    pub workspace: Option<BitbucketWorkspaceRef>,
    pub project: Option<BitbucketProjectRef>,
}

impl BitbucketRepo {
    /// `workspace/PROJECT_KEY/slug`.
    pub fn repo_path(&self) -> Result<RepoPath, NormalizeError> {
        normalize_two_level(
            self.workspace.as_ref().map(|w| w.slug.as_str()),
            self.project.as_ref().map(|p| p.key.as_str()),
            self.slug.as_deref(),
        )
    }

    /// Project the embedded language into a weight map.
    pub fn embedded_languages(&self) -> Languages {
        let mut languages = Languages::new();
        if let Some(language) = self.language.as_deref().map(str::trim)
            && !language.is_empty()
        {
            languages.insert(language.to_string(), 100.0);
        }
        languages
    }

    #[cfg(test)]
    pub(crate) fn for_test(uuid: &str, workspace: &str, project: &str, slug: &str) -> Self {
        Self {
            uuid: uuid.to_string(),
            slug: Some(slug.to_string()),
            workspace: Some(BitbucketWorkspaceRef {
                slug: workspace.to_string(),
            }),
            project: Some(BitbucketProjectRef {
                key: project.to_string(),
            }),
            ..Default::default()
        }
    }
}
