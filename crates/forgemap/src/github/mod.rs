//! GitHub adapter: a flat hierarchy (organization or user → repository).
//!
//! - [`types`] - Raw repository records as returned by the REST API
//! - [`client`] - Listing and language fetching over [`crate::http::HttpTransport`]

mod client;
mod types;

pub use client::{GITHUB_API_URL, GitHubAdapter, PER_PAGE};
pub use types::{GitHubOwner, GitHubRepo};
