//! GitLab adapter: an unbounded hierarchy (group → subgroups… → project).
//!
//! Groups may nest to arbitrary depth, so listing walks the group tree with an
//! explicit work-list and a visited set rather than recursion. Each group is
//! listed at most once per pass even if the API reports it under two parents.

mod client;
mod types;

pub use client::{GITLAB_URL, GitLabAdapter, MAX_GROUP_DEPTH, PER_PAGE};
pub use types::{GitLabGroup, GitLabProject};
