//! Repository entity - one normalized row per provider repository.

use std::collections::BTreeMap;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::provider::Provider;
use crate::entity::visibility::Visibility;

/// Build the derived repository id, `"{provider}:{provider_repo_id}"`.
///
/// The id is stable across renames because it never includes the path.
#[must_use]
pub fn repository_id(provider: Provider, provider_repo_id: &str) -> String {
    format!("{}:{}", provider, provider_repo_id)
}

/// Repository model - the canonical record for one provider repository.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repositories")]
pub struct Model {
    /// Derived id, `"{provider}:{provider_repo_id}"`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    // ─── Provider Identity ───────────────────────────────────────────────────
    /// Hosting provider.
    pub provider: Provider,
    /// Opaque provider-assigned id, unique only within `provider`.
    pub provider_repo_id: String,

    // ─── Location ────────────────────────────────────────────────────────────
    /// Slash-delimited path including the repository's own segment.
    pub full_name: String,
    /// Container path: `full_name` without its final segment.
    pub group_path: String,

    // ─── Content ─────────────────────────────────────────────────────────────
    /// Language name → relative weight (provider-defined scale).
    #[sea_orm(column_type = "Json")]
    pub languages: serde_json::Value,

    // ─── Visibility ──────────────────────────────────────────────────────────
    pub visibility: Visibility,
    /// False when the provider has no archive concept.
    #[sea_orm(default_value = false)]
    pub is_archived: bool,

    // ─── Timestamps ──────────────────────────────────────────────────────────
    /// Creation time as reported by the provider.
    pub created_at: Option<DateTimeWithTimeZone>,
    /// Last push (or closest provider equivalent).
    pub last_push_at: Option<DateTimeWithTimeZone>,

    // ─── Tracking ────────────────────────────────────────────────────────────
    /// Set on every successful upsert.
    pub last_sync_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// The repository's own path segment.
    pub fn repo_name(&self) -> &str {
        self.full_name
            .rsplit_once('/')
            .map_or(self.full_name.as_str(), |(_, name)| name)
    }

    /// Decode the stored language mapping.
    ///
    /// Non-numeric entries are skipped; a non-object value yields an empty map.
    pub fn languages_map(&self) -> BTreeMap<String, f64> {
        self.languages
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter_map(|(name, weight)| weight.as_f64().map(|w| (name.clone(), w)))
                    .collect()
            })
            .unwrap_or_default()
    }
}
