//! Path normalization across provider hierarchies.
//!
//! Every provider nests repositories under containers differently: GitHub has
//! a single owner level, Bitbucket a fixed workspace/project pair, and GitLab
//! arbitrarily deep group trees. This module turns each native shape into the
//! same `(full_name, group_path)` pair so downstream consumers can compare and
//! prefix-match paths without knowing where a repository came from.
//!
//! All functions here are pure.

use thiserror::Error;

/// Separator between path segments.
pub const PATH_DELIMITER: char = '/';

/// The container hierarchy a provider exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HierarchyShape {
    /// Exactly one container level (owner → repository).
    Flat,
    /// Exactly two container levels (workspace → project → repository).
    TwoLevel,
    /// One or more container levels of arbitrary depth.
    Unbounded,
}

impl HierarchyShape {
    /// Whether a repository with `depth` containers above it fits this shape.
    #[must_use]
    pub fn admits_depth(self, depth: usize) -> bool {
        match self {
            HierarchyShape::Flat => depth == 1,
            HierarchyShape::TwoLevel => depth == 2,
            HierarchyShape::Unbounded => depth >= 1,
        }
    }
}

impl std::fmt::Display for HierarchyShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HierarchyShape::Flat => write!(f, "flat"),
            HierarchyShape::TwoLevel => write!(f, "two-level"),
            HierarchyShape::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Why a raw record could not be turned into a path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NormalizeError {
    /// A required path component is absent from the raw record.
    #[error("missing path component: {field}")]
    MissingComponent { field: &'static str },

    /// A component is present but unusable as a path segment.
    #[error("invalid path segment {segment:?}: {reason}")]
    InvalidSegment {
        segment: String,
        reason: &'static str,
    },

    /// The number of container levels does not fit the provider's hierarchy.
    #[error("path {path:?} has {depth} container level(s), expected {shape} hierarchy")]
    DepthMismatch {
        path: String,
        depth: usize,
        shape: HierarchyShape,
    },

    /// The raw record was handed to an adapter for a different provider.
    #[error("record belongs to {actual}, not {expected}")]
    ProviderMismatch {
        expected: crate::entity::provider::Provider,
        actual: crate::entity::provider::Provider,
    },
}

/// A normalized repository location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPath {
    full_name: String,
    group_path: String,
}

impl RepoPath {
    /// Build a path from container segments and the repository's own name.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::InvalidSegment`] if any segment is unusable.
    pub fn from_segments(containers: &[&str], repo_name: &str) -> Result<Self, NormalizeError> {
        for segment in containers {
            validate_segment(segment)?;
        }
        validate_segment(repo_name)?;

        let group_path = containers.join("/");
        let full_name = if group_path.is_empty() {
            repo_name.to_string()
        } else {
            format!("{}{}{}", group_path, PATH_DELIMITER, repo_name)
        };

        Ok(Self {
            full_name,
            group_path,
        })
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn group_path(&self) -> &str {
        &self.group_path
    }

    /// The repository's own segment.
    pub fn repo_name(&self) -> &str {
        self.full_name
            .rsplit_once(PATH_DELIMITER)
            .map_or(self.full_name.as_str(), |(_, name)| name)
    }

    /// Number of container levels above the repository.
    pub fn depth(&self) -> usize {
        if self.group_path.is_empty() {
            0
        } else {
            self.group_path.split(PATH_DELIMITER).count()
        }
    }

    /// Check the depth against a hierarchy shape.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::DepthMismatch`] when the shape rejects the depth.
    pub fn ensure_shape(self, shape: HierarchyShape) -> Result<Self, NormalizeError> {
        let depth = self.depth();
        if shape.admits_depth(depth) {
            Ok(self)
        } else {
            Err(NormalizeError::DepthMismatch {
                path: self.full_name,
                depth,
                shape,
            })
        }
    }

    pub fn into_parts(self) -> (String, String) {
        (self.full_name, self.group_path)
    }
}

/// Check that a value can be used as one path segment.
///
/// Segments must survive delimiter-based prefix matching: a segment holding
/// the delimiter, a dot segment, or stray whitespace would make
/// `group_path LIKE 'a/b/%'` match the wrong rows.
///
/// # Errors
///
/// Returns [`NormalizeError::InvalidSegment`] describing the first problem found.
pub fn validate_segment(segment: &str) -> Result<(), NormalizeError> {
    let reason = if segment.is_empty() {
        Some("empty segment")
    } else if segment.contains(PATH_DELIMITER) {
        Some("contains path delimiter")
    } else if segment == "." || segment == ".." {
        Some("relative path segment")
    } else if segment.trim() != segment {
        Some("leading or trailing whitespace")
    } else if segment.chars().any(char::is_control) {
        Some("control character")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(NormalizeError::InvalidSegment {
            segment: segment.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split(PATH_DELIMITER).collect()
}

/// Flat hierarchy: `"{container}/{repo}"`, exactly one container level.
///
/// # Errors
///
/// Fails when `full_name` is absent, has a different number of segments, or
/// contains an invalid segment.
pub fn normalize_flat(full_name: Option<&str>) -> Result<RepoPath, NormalizeError> {
    let full_name = full_name
        .filter(|s| !s.is_empty())
        .ok_or(NormalizeError::MissingComponent { field: "full_name" })?;

    let segments = split_path(full_name);
    match segments.as_slice() {
        [container, repo] => RepoPath::from_segments(&[*container], repo),
        _ => Err(NormalizeError::DepthMismatch {
            path: full_name.to_string(),
            depth: segments.len().saturating_sub(1),
            shape: HierarchyShape::Flat,
        }),
    }
}

/// Two-level hierarchy: `"{container}/{sub_container}/{repo}"`.
///
/// # Errors
///
/// Fails when any of the three components is absent or invalid.
pub fn normalize_two_level(
    container: Option<&str>,
    sub_container: Option<&str>,
    repo_name: Option<&str>,
) -> Result<RepoPath, NormalizeError> {
    let container = required(container, "workspace")?;
    let sub_container = required(sub_container, "project")?;
    let repo_name = required(repo_name, "slug")?;
    RepoPath::from_segments(&[container, sub_container], repo_name)
}

/// Unbounded hierarchy: the provider supplies the whole path, repo included.
///
/// # Errors
///
/// Fails when the path is absent, has no container level, or contains an
/// invalid segment.
pub fn normalize_unbounded(path: Option<&str>) -> Result<RepoPath, NormalizeError> {
    let path = required(path, "path_with_namespace")?;
    let segments = split_path(path);
    let Some((repo_name, containers)) = segments.split_last() else {
        return Err(NormalizeError::MissingComponent {
            field: "path_with_namespace",
        });
    };

    RepoPath::from_segments(containers, repo_name)?.ensure_shape(HierarchyShape::Unbounded)
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, NormalizeError> {
    value
        .filter(|s| !s.is_empty())
        .ok_or(NormalizeError::MissingComponent { field })
}

/// Whether `group_path` equals `prefix` or lies underneath it.
///
/// Matching is segment-aware: `"myorg/plat"` is not a prefix of
/// `"myorg/platform"`.
#[must_use]
pub fn is_under(group_path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches(PATH_DELIMITER);
    if prefix.is_empty() {
        return true;
    }
    match group_path.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with(PATH_DELIMITER),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_prefix_invariant(path: &RepoPath) {
        let expected = format!("{}/{}", path.group_path(), path.repo_name());
        assert_eq!(path.full_name(), expected);
        assert!(path.full_name().starts_with(path.group_path()));
    }

    #[test]
    fn flat_path_uses_owner_as_group() {
        let path = normalize_flat(Some("myorg/api-service")).unwrap();
        assert_eq!(path.full_name(), "myorg/api-service");
        assert_eq!(path.group_path(), "myorg");
        assert_eq!(path.repo_name(), "api-service");
        assert_eq!(path.depth(), 1);
        assert_prefix_invariant(&path);
    }

    #[test]
    fn flat_path_rejects_missing_or_nested_names() {
        assert_eq!(
            normalize_flat(None),
            Err(NormalizeError::MissingComponent { field: "full_name" })
        );
        assert!(matches!(
            normalize_flat(Some("api-service")),
            Err(NormalizeError::DepthMismatch { depth: 0, .. })
        ));
        assert!(matches!(
            normalize_flat(Some("a/b/c")),
            Err(NormalizeError::DepthMismatch { depth: 2, .. })
        ));
        assert!(matches!(
            normalize_flat(Some("myorg/")),
            Err(NormalizeError::InvalidSegment { .. })
        ));
    }

    #[test]
    fn unbounded_path_strips_last_segment() {
        let path = normalize_unbounded(Some("myorg/platform/backend/api-service")).unwrap();
        assert_eq!(path.full_name(), "myorg/platform/backend/api-service");
        assert_eq!(path.group_path(), "myorg/platform/backend");
        assert_eq!(path.depth(), 3);
        assert_prefix_invariant(&path);
    }

    #[test]
    fn unbounded_path_requires_a_container() {
        assert!(matches!(
            normalize_unbounded(Some("api-service")),
            Err(NormalizeError::DepthMismatch { depth: 0, .. })
        ));
        assert!(matches!(
            normalize_unbounded(Some("myorg//api")),
            Err(NormalizeError::InvalidSegment { .. })
        ));
        assert!(matches!(
            normalize_unbounded(Some("")),
            Err(NormalizeError::MissingComponent { .. })
        ));
    }

    #[test]
    fn two_level_path_joins_workspace_and_project() {
        let path = normalize_two_level(
            Some("myworkspace"),
            Some("platform-project"),
            Some("api-service"),
        )
        .unwrap();
        assert_eq!(path.full_name(), "myworkspace/platform-project/api-service");
        assert_eq!(path.group_path(), "myworkspace/platform-project");
        assert_eq!(path.depth(), 2);
        assert_prefix_invariant(&path);
    }

    #[test]
    fn two_level_path_reports_missing_project() {
        assert_eq!(
            normalize_two_level(Some("ws"), None, Some("repo")),
            Err(NormalizeError::MissingComponent { field: "project" })
        );
    }

    #[test]
    fn validate_segment_rejects_prefix_breaking_values() {
        assert!(validate_segment("api-service").is_ok());
        assert!(validate_segment("My Project").is_ok());
        for bad in ["", "a/b", ".", "..", " padded", "tab\tbed"] {
            assert!(validate_segment(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn hierarchy_shape_admits_expected_depths() {
        assert!(HierarchyShape::Flat.admits_depth(1));
        assert!(!HierarchyShape::Flat.admits_depth(2));
        assert!(HierarchyShape::TwoLevel.admits_depth(2));
        assert!(!HierarchyShape::TwoLevel.admits_depth(1));
        assert!(HierarchyShape::Unbounded.admits_depth(7));
        assert!(!HierarchyShape::Unbounded.admits_depth(0));
    }

    #[test]
    fn is_under_matches_whole_segments_only() {
        assert!(is_under("myorg/platform/backend", "myorg/platform"));
        assert!(is_under("myorg/platform", "myorg/platform"));
        assert!(is_under("myorg/platform", "myorg/platform/"));
        assert!(!is_under("myorg/platformx", "myorg/platform"));
        assert!(!is_under("other/platform", "myorg"));
        assert!(is_under("anything", ""));
    }
}
