//! Common re-exports for convenient entity usage.

pub use super::provider::Provider;
pub use super::repository::{
    ActiveModel as RepositoryActiveModel, Column as RepositoryColumn, Entity as Repository,
    Model as RepositoryModel, repository_id,
};
pub use super::visibility::Visibility;
