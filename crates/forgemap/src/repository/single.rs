use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, sea_query::OnConflict,
};

use crate::entity::provider::Provider;
use crate::entity::repository::{Column, Entity as Repository, Model};
use crate::path::PATH_DELIMITER;
use crate::platform::CanonicalRepo;

use super::errors::{RepositoryError, Result};

// ─── Write Path ──────────────────────────────────────────────────────────────

/// Reject records that would break store invariants.
///
/// `group_path` must be `full_name` minus exactly its last segment, and the
/// provider id must be present.
pub(crate) fn validate(repo: &CanonicalRepo) -> Result<()> {
    if repo.provider_repo_id.is_empty() {
        return Err(RepositoryError::invalid_input(format!(
            "{} has an empty provider_repo_id",
            repo.full_name
        )));
    }

    let consistent = match repo.full_name.rsplit_once(PATH_DELIMITER) {
        Some((group, name)) => !group.is_empty() && group == repo.group_path && !name.is_empty(),
        None => false,
    };
    if !consistent {
        return Err(RepositoryError::invalid_input(format!(
            "group_path {:?} is not the container path of {:?}",
            repo.group_path, repo.full_name
        )));
    }

    Ok(())
}

/// Build the ON CONFLICT clause for upserts.
///
/// The conflict target is `(provider, provider_repo_id)`. Every other column
/// is overwritten: last write wins, with no merge or change detection.
pub(crate) fn build_upsert_on_conflict() -> OnConflict {
    OnConflict::columns([Column::Provider, Column::ProviderRepoId])
        .update_columns([
            Column::FullName,
            Column::GroupPath,
            Column::Languages,
            Column::Visibility,
            Column::IsArchived,
            Column::CreatedAt,
            Column::LastPushAt,
            Column::LastSyncAt,
        ])
        .to_owned()
}

/// Insert or fully replace one repository row, stamping `last_sync_at`.
///
/// Runs as a single `INSERT … ON CONFLICT DO UPDATE` statement, so readers
/// never observe a half-written row.
///
/// # Errors
/// Returns `RepositoryError::InvalidInput` for inconsistent paths, or
/// `RepositoryError::Database` if the statement fails.
pub async fn upsert<C: ConnectionTrait>(db: &C, repo: &CanonicalRepo) -> Result<()> {
    validate(repo)?;

    Repository::insert(repo.to_active_model(Utc::now()))
        .on_conflict(build_upsert_on_conflict())
        .exec_without_returning(db)
        .await?;
    Ok(())
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

/// Find a repository by derived id (`"{provider}:{provider_repo_id}"`).
pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: &str) -> Result<Model> {
    Repository::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| RepositoryError::not_found_by_id(id))
}

/// Find a repository by its conflict key.
pub async fn find_by_provider_repo_id<C: ConnectionTrait>(
    db: &C,
    provider: Provider,
    provider_repo_id: &str,
) -> Result<Option<Model>> {
    Repository::find()
        .filter(Column::Provider.eq(provider))
        .filter(Column::ProviderRepoId.eq(provider_repo_id))
        .one(db)
        .await
        .map_err(RepositoryError::from)
}
