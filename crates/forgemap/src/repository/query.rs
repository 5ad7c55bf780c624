use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    sea_query::LikeExpr,
};

use crate::entity::provider::Provider;
use crate::entity::repository::{Column, Entity as Repository, Model};
use crate::path::PATH_DELIMITER;

use super::errors::Result;

const LIKE_ESCAPE: char = '\\';

/// Escape LIKE wildcards so path segments match literally.
pub(crate) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Build the condition matching `prefix` itself and every path beneath it.
pub(crate) fn group_prefix_condition(prefix: &str) -> Condition {
    let prefix = prefix.trim_end_matches(PATH_DELIMITER);
    let descendants = format!("{}{}%", escape_like(prefix), PATH_DELIMITER);
    Condition::any()
        .add(Column::GroupPath.eq(prefix))
        .add(Column::GroupPath.like(LikeExpr::new(descendants).escape(LIKE_ESCAPE)))
}

// ─── Query Operations ────────────────────────────────────────────────────────

/// Find repositories whose group path equals `prefix` or lies beneath it.
///
/// Matching is segment-aware: `myorg/plat` does not match `myorg/platform`.
/// An empty prefix returns every repository. Results are ordered by full name.
pub async fn find_by_group_prefix<C: ConnectionTrait>(db: &C, prefix: &str) -> Result<Vec<Model>> {
    let mut query = Repository::find();
    if !prefix.trim_end_matches(PATH_DELIMITER).is_empty() {
        query = query.filter(group_prefix_condition(prefix));
    }
    Ok(query.order_by_asc(Column::FullName).all(db).await?)
}

/// Count all repositories.
pub async fn count<C: ConnectionTrait>(db: &C) -> Result<u64> {
    Ok(Repository::find().count(db).await?)
}

/// Count repositories per provider, including providers with none.
pub async fn count_by_provider<C: ConnectionTrait>(db: &C) -> Result<Vec<(Provider, u64)>> {
    let mut counts = Vec::with_capacity(Provider::ALL.len());
    for provider in Provider::ALL {
        let n = Repository::find()
            .filter(Column::Provider.eq(provider))
            .count(db)
            .await?;
        counts.push((provider, n));
    }
    Ok(counts)
}
