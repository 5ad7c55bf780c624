use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::Set;

use crate::entity::repository::{
    ActiveModel as RepositoryActiveModel, Model as RepositoryModel, repository_id,
};

use super::types::{CanonicalRepo, Languages};

/// Encode a language mapping as a JSON object.
///
/// Non-finite weights cannot be represented in JSON and are dropped.
pub fn languages_to_json(languages: &Languages) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = languages
        .iter()
        .filter_map(|(name, weight)| {
            serde_json::Number::from_f64(*weight)
                .map(|n| (name.clone(), serde_json::Value::Number(n)))
        })
        .collect();
    serde_json::Value::Object(map)
}

impl CanonicalRepo {
    /// Convert to a fully-populated active model, stamping `last_sync_at`.
    ///
    /// Every column is `Set`, so an upsert overwrites the whole row.
    pub fn to_active_model(&self, synced_at: DateTime<Utc>) -> RepositoryActiveModel {
        RepositoryActiveModel {
            id: Set(self.id()),
            provider: Set(self.provider),
            provider_repo_id: Set(self.provider_repo_id.clone()),
            full_name: Set(self.full_name.clone()),
            group_path: Set(self.group_path.clone()),
            languages: Set(languages_to_json(&self.languages)),
            visibility: Set(self.visibility),
            is_archived: Set(self.is_archived),
            created_at: Set(self.created_at.map(|t| t.fixed_offset())),
            last_push_at: Set(self.last_push_at.map(|t| t.fixed_offset())),
            last_sync_at: Set(synced_at.fixed_offset()),
        }
    }

    /// Convert to a model, as the store would persist it at `synced_at`.
    pub fn to_model(&self, synced_at: DateTime<Utc>) -> RepositoryModel {
        RepositoryModel {
            id: repository_id(self.provider, &self.provider_repo_id),
            provider: self.provider,
            provider_repo_id: self.provider_repo_id.clone(),
            full_name: self.full_name.clone(),
            group_path: self.group_path.clone(),
            languages: languages_to_json(&self.languages),
            visibility: self.visibility,
            is_archived: self.is_archived,
            created_at: self.created_at.map(|t| t.fixed_offset()),
            last_push_at: self.last_push_at.map(|t| t.fixed_offset()),
            last_sync_at: synced_at.fixed_offset(),
        }
    }
}

impl From<&RepositoryModel> for CanonicalRepo {
    fn from(model: &RepositoryModel) -> Self {
        let to_utc = |t: DateTime<FixedOffset>| t.with_timezone(&Utc);
        Self {
            provider: model.provider,
            provider_repo_id: model.provider_repo_id.clone(),
            full_name: model.full_name.clone(),
            group_path: model.group_path.clone(),
            languages: model.languages_map(),
            visibility: model.visibility,
            is_archived: model.is_archived,
            created_at: model.created_at.map(to_utc),
            last_push_at: model.last_push_at.map(to_utc),
        }
    }
}
