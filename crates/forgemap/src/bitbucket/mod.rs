//! Bitbucket Cloud adapter: a two-level hierarchy (workspace → project → repository).
//!
//! Projects are listed first, then repositories per project. Language data
//! is embedded in the repository payload, so no per-repository request is
//! needed for it.

mod client;
mod types;

pub use client::{BITBUCKET_API_URL, BitbucketAdapter, PAGE_LEN};
pub use types::{
    BitbucketPage, BitbucketProject, BitbucketProjectRef, BitbucketRepo, BitbucketWorkspaceRef,
};
