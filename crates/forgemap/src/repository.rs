//! Repository persistence: upsert keyed on `(provider, provider_repo_id)`
//! plus the read queries built on the group-path column.
//!
//! Rows are only ever inserted or fully replaced. Nothing in this module
//! deletes a row, so a repository removed upstream keeps its last-seen state.

mod errors;
mod query;
mod single;
mod store;

pub use errors::{RepositoryError, Result};
pub use query::{count, count_by_provider, find_by_group_prefix};
pub use single::{find_by_id, find_by_provider_repo_id, upsert};
pub use store::{DatabaseStore, MemoryStore, RepositoryStore};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sea_orm::{
        DatabaseBackend, EntityTrait, MockDatabase, MockExecResult, QueryFilter, QueryTrait,
    };

    use crate::entity::provider::Provider;
    use crate::entity::repository::Entity as Repository;
    use crate::entity::visibility::Visibility;
    use crate::platform::CanonicalRepo;

    fn make_repo(provider: Provider, id: &str, full_name: &str) -> CanonicalRepo {
        let (group_path, _) = full_name.rsplit_once('/').expect("test names have a group");
        CanonicalRepo {
            provider,
            provider_repo_id: id.to_string(),
            full_name: full_name.to_string(),
            group_path: group_path.to_string(),
            languages: [("Rust".to_string(), 1024.0)].into_iter().collect(),
            visibility: Visibility::Public,
            is_archived: false,
            created_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            last_push_at: None,
        }
    }

    // ─── Errors ──────────────────────────────────────────────────────────────

    #[test]
    fn test_repository_error_not_found_by_id() {
        let err = RepositoryError::not_found_by_id("github:42");
        let msg = err.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("github:42"));
    }

    #[test]
    fn test_repository_error_not_found_by_key() {
        let err = RepositoryError::not_found_by_key(Provider::GitLab, "12345");
        let msg = err.to_string();
        assert!(msg.contains("gitlab"));
        assert!(msg.contains("12345"));
    }

    #[test]
    fn test_repository_error_from_db_err() {
        let err: RepositoryError = sea_orm::DbErr::Custom("boom".to_string()).into();
        assert!(matches!(err, RepositoryError::Database(_)));
        assert!(err.to_string().contains("boom"));
    }

    // ─── Validation ──────────────────────────────────────────────────────────

    #[test]
    fn validate_accepts_consistent_paths() {
        let repo = make_repo(Provider::GitLab, "7", "myorg/platform/backend/api");
        assert!(single::validate(&repo).is_ok());
    }

    #[test]
    fn validate_rejects_group_path_that_is_not_container() {
        let mut repo = make_repo(Provider::GitHub, "1", "acme/api");
        repo.group_path = "other".to_string();
        let err = single::validate(&repo).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidInput { .. }));
    }

    #[test]
    fn validate_rejects_empty_provider_repo_id() {
        let repo = make_repo(Provider::GitHub, "", "acme/api");
        assert!(matches!(
            single::validate(&repo),
            Err(RepositoryError::InvalidInput { .. })
        ));
    }

    // ─── Generated SQL ───────────────────────────────────────────────────────

    #[test]
    fn upsert_targets_provider_and_provider_repo_id() {
        let repo = make_repo(Provider::GitHub, "42", "acme/api");
        let sql = Repository::insert(repo.to_active_model(Utc::now()))
            .on_conflict(single::build_upsert_on_conflict())
            .build(DatabaseBackend::Sqlite)
            .to_string();

        assert!(sql.contains("ON CONFLICT"));
        assert!(sql.contains(r#"("provider", "provider_repo_id")"#));
        assert!(sql.contains("DO UPDATE"));
        assert!(sql.contains(r#""group_path" = "excluded"."group_path""#));
        assert!(sql.contains(r#""last_sync_at" = "excluded"."last_sync_at""#));
    }

    #[test]
    fn upsert_replaces_unconditionally() {
        let repo = make_repo(Provider::GitHub, "42", "acme/api");
        let sql = Repository::insert(repo.to_active_model(Utc::now()))
            .on_conflict(single::build_upsert_on_conflict())
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains("ON CONFLICT"));
        assert!(!sql.contains(" WHERE "));
    }

    #[test]
    fn group_prefix_matches_exact_and_descendants() {
        let sql = Repository::find()
            .filter(query::group_prefix_condition("myorg/platform/"))
            .build(DatabaseBackend::Sqlite)
            .to_string();

        assert!(sql.contains(r#""group_path" = 'myorg/platform'"#));
        assert!(sql.contains(r#""group_path" LIKE 'myorg/platform/%'"#));
        assert!(sql.contains("ESCAPE"));
    }

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(query::escape_like("my_org"), r"my\_org");
        assert_eq!(query::escape_like("100%"), r"100\%");
        assert_eq!(query::escape_like(r"a\b"), r"a\\b");
        assert_eq!(query::escape_like("plain/path"), "plain/path");
    }

    // ─── Mock Database ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn upsert_executes_single_statement() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let repo = make_repo(Provider::Bitbucket, "{abc}", "acme/CORE/billing");
        upsert(&db, &repo).await.expect("mock upsert should succeed");

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
        let sql = format!("{:?}", log[0]);
        assert!(sql.contains("ON CONFLICT"));
    }

    #[tokio::test]
    async fn upsert_rejects_invalid_record_without_touching_db() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let mut repo = make_repo(Provider::GitHub, "1", "acme/api");
        repo.group_path = String::new();

        let err = upsert(&db, &repo).await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidInput { .. }));
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn find_by_id_maps_missing_row_to_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<crate::entity::repository::Model>::new()])
            .into_connection();

        let err = find_by_id(&db, "github:404").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn database_store_shares_connection_with_caller() {
        let db = std::sync::Arc::new(
            MockDatabase::new(DatabaseBackend::Sqlite)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let store = DatabaseStore::new(std::sync::Arc::clone(&db));
        let sync_store = store.clone();
        sync_store
            .upsert(&make_repo(Provider::GitHub, "42", "acme/api"))
            .await
            .expect("mock upsert should succeed");
        drop(sync_store);
        drop(store);

        let db = std::sync::Arc::try_unwrap(db).expect("store should release the connection");
        assert_eq!(db.into_transaction_log().len(), 1);
    }

    // ─── Memory Store ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn memory_store_upsert_is_idempotent() {
        let store = MemoryStore::new();
        let repo = make_repo(Provider::GitHub, "42", "acme/api");

        store.upsert(&repo).await.unwrap();
        let first = store.get(Provider::GitHub, "42").unwrap();
        store.upsert(&repo).await.unwrap();
        let second = store.get(Provider::GitHub, "42").unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(first.full_name, second.full_name);
        assert!(second.last_sync_at >= first.last_sync_at);
    }

    #[tokio::test]
    async fn memory_store_rename_keeps_identity() {
        let store = MemoryStore::new();
        store
            .upsert(&make_repo(Provider::GitLab, "7", "myorg/old/api"))
            .await
            .unwrap();
        store
            .upsert(&make_repo(Provider::GitLab, "7", "myorg/new/api"))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        let row = store.get(Provider::GitLab, "7").unwrap();
        assert_eq!(row.group_path, "myorg/new");
        assert_eq!(row.id, "gitlab:7");
    }

    #[tokio::test]
    async fn memory_store_keys_by_provider() {
        let store = MemoryStore::new();
        store
            .upsert(&make_repo(Provider::GitHub, "1", "acme/api"))
            .await
            .unwrap();
        store
            .upsert(&make_repo(Provider::GitLab, "1", "acme/api"))
            .await
            .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.rows().len(), 2);
    }
}
