//! SeaORM entity definitions for the forgemap database schema.

pub mod prelude;
pub mod provider;
pub mod repository;
pub mod visibility;
