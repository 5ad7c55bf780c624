use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::entity::provider::Provider;
use crate::http::{HttpRequest, HttpTransport};
use crate::platform::{
    Credentials, JsonResponse, Languages, PlatformError, ProviderAdapter, RawRepo, Result,
    Throttle, USER_AGENT, fetch_json,
};

use super::types::{BitbucketPage, BitbucketProject, BitbucketRepo};

/// Bitbucket Cloud REST API.
pub const BITBUCKET_API_URL: &str = "https://api.bitbucket.org/2.0";

/// Page size for listings (the API maximum).
pub const PAGE_LEN: usize = 100;

/// Hard stop for pagination of a single listing.
const MAX_PAGES: u32 = 1000;

/// Bitbucket adapter over an HTTP transport.
#[derive(Clone)]
pub struct BitbucketAdapter {
    transport: Arc<dyn HttpTransport>,
    api_url: String,
    credentials: Credentials,
    request_delay: Duration,
}

impl BitbucketAdapter {
    /// Create an adapter over `transport`.
    pub fn new_with_transport(
        transport: Arc<dyn HttpTransport>,
        api_url: Option<&str>,
        credentials: Credentials,
        request_delay: Duration,
    ) -> Self {
        Self {
            transport,
            api_url: api_url
                .unwrap_or(BITBUCKET_API_URL)
                .trim_end_matches('/')
                .to_string(),
            credentials,
            request_delay,
        }
    }

    fn request(&self, url: &str) -> HttpRequest {
        let mut request = HttpRequest::get(url)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT);
        if let Some(auth) = self.credentials.authorization() {
            request = request.header("Authorization", auth);
        }
        request
    }

    /// Fetch every page of a listing by following `next` links.
    async fn get_paged<T: DeserializeOwned>(
        &self,
        first_url: String,
        resource: &str,
        throttle: &Throttle,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut url = first_url;

        for _ in 0..MAX_PAGES {
            let request = self.request(&url);
            let response: JsonResponse<BitbucketPage<T>> = throttle
                .call("bitbucket list", || {
                    fetch_json(self.transport.as_ref(), request.clone(), resource)
                })
                .await?;

            let page = response.body;
            items.extend(page.values);
            match page.next {
                Some(next) if next != url => url = next,
                _ => return Ok(items),
            }
        }

        Err(PlatformError::api(format!(
            "pagination for {} exceeded {} pages",
            resource, MAX_PAGES
        )))
    }
}

#[async_trait]
impl ProviderAdapter for BitbucketAdapter {
    fn provider(&self) -> Provider {
        Provider::Bitbucket
    }

    fn request_delay(&self) -> Duration {
        self.request_delay
    }

    async fn list_repositories(&self, org: &str, throttle: &Throttle) -> Result<Vec<RawRepo>> {
        let workspace = urlencoding::encode(org);
        let projects: Vec<BitbucketProject> = self
            .get_paged(
                format!(
                    "{}/workspaces/{}/projects?pagelen={}",
                    self.api_url, workspace, PAGE_LEN
                ),
                org,
                throttle,
            )
            .await?;

        let mut seen_projects = HashSet::new();
        let mut seen_repos = HashSet::new();
        let mut repos = Vec::new();

        for project in projects {
            if !seen_projects.insert(project.key.clone()) {
                continue;
            }

            let query = urlencoding::encode(&format!("project.key=\"{}\"", project.key)).into_owned();
            let listed: Vec<BitbucketRepo> = self
                .get_paged(
                    format!(
                        "{}/repositories/{}?pagelen={}&q={}",
                        self.api_url, workspace, PAGE_LEN, query
                    ),
                    &format!("{}/{}", org, project.key),
                    throttle,
                )
                .await?;

            tracing::debug!(
                workspace = org,
                project = %project.key,
                repositories = listed.len(),
                "listed Bitbucket project"
            );
            repos.extend(
                listed
                    .into_iter()
                    .filter(|r| seen_repos.insert(r.uuid.clone()))
                    .map(RawRepo::Bitbucket),
            );
        }

        Ok(repos)
    }

    async fn get_languages(
        &self,
        _org: &str,
        raw: &RawRepo,
        _throttle: &Throttle,
    ) -> Result<Languages> {
        match raw {
            RawRepo::Bitbucket(repo) => Ok(repo.embedded_languages()),
            other => Err(PlatformError::internal(format!(
                "Bitbucket adapter cannot read languages from a {} record",
                other.provider()
            ))),
        }
    }
}
