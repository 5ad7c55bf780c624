use sea_orm::DbErr;
use thiserror::Error;

use crate::entity::provider::Provider;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Repository not found.
    #[error("Repository not found: {context}")]
    NotFound { context: String },

    /// Record violates a store invariant and was not written.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl RepositoryError {
    /// Create a NotFound error for a derived-id lookup.
    pub fn not_found_by_id(id: &str) -> Self {
        Self::NotFound {
            context: format!("id={}", id),
        }
    }

    /// Create a NotFound error for a conflict-key lookup.
    pub fn not_found_by_key(provider: Provider, provider_repo_id: &str) -> Self {
        Self::NotFound {
            context: format!("{} provider_repo_id={}", provider, provider_repo_id),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
