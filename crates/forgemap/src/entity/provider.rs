//! Provider enum for the closed set of supported hosting providers.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::path::HierarchyShape;

/// Supported source-code hosting providers.
///
/// Each provider has a fixed container hierarchy shape, which decides how its
/// adapter traverses an organization and how paths are normalized.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// GitHub (github.com or GitHub Enterprise). Flat: org → repository.
    #[sea_orm(string_value = "github")]
    GitHub,
    /// GitLab (gitlab.com or self-hosted). Unbounded: group → subgroups… → project.
    #[sea_orm(string_value = "gitlab")]
    GitLab,
    /// Bitbucket Cloud. Two-level: workspace → project → repository.
    #[sea_orm(string_value = "bitbucket")]
    Bitbucket,
}

impl Provider {
    /// All providers, in display order.
    pub const ALL: [Provider; 3] = [Provider::GitHub, Provider::GitLab, Provider::Bitbucket];

    /// The container hierarchy shape this provider exposes.
    #[must_use]
    pub fn hierarchy(self) -> HierarchyShape {
        match self {
            Provider::GitHub => HierarchyShape::Flat,
            Provider::GitLab => HierarchyShape::Unbounded,
            Provider::Bitbucket => HierarchyShape::TwoLevel,
        }
    }

    /// Lowercase identifier used in derived ids and configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::GitHub => "github",
            Provider::GitLab => "gitlab",
            Provider::Bitbucket => "bitbucket",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" => Ok(Provider::GitHub),
            "gitlab" => Ok(Provider::GitLab),
            "bitbucket" => Ok(Provider::Bitbucket),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}
