use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::entity::provider::Provider;
use crate::http::{HttpRequest, HttpTransport};
use crate::platform::{
    Credentials, JsonResponse, Languages, PlatformError, ProviderAdapter, RawRepo, Result,
    Throttle, USER_AGENT, fetch_json,
};

use super::types::GitHubRepo;

/// Public GitHub REST API.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Page size for repository listings (the API maximum).
pub const PER_PAGE: usize = 100;

/// Hard stop for pagination; 100k repositories per org.
const MAX_PAGES: u32 = 1000;

/// GitHub adapter over an HTTP transport.
#[derive(Clone)]
pub struct GitHubAdapter {
    transport: Arc<dyn HttpTransport>,
    api_url: String,
    credentials: Credentials,
    request_delay: Duration,
}

impl GitHubAdapter {
    /// Create an adapter over `transport`.
    ///
    /// `api_url` overrides the public API (e.g. `https://ghe.example.com/api/v3`).
    pub fn new_with_transport(
        transport: Arc<dyn HttpTransport>,
        api_url: Option<&str>,
        credentials: Credentials,
        request_delay: Duration,
    ) -> Self {
        Self {
            transport,
            api_url: api_url
                .unwrap_or(GITHUB_API_URL)
                .trim_end_matches('/')
                .to_string(),
            credentials,
            request_delay,
        }
    }

    fn request(&self, url: &str) -> HttpRequest {
        let mut request = HttpRequest::get(url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", USER_AGENT);
        if let Some(auth) = self.credentials.authorization() {
            request = request.header("Authorization", auth);
        }
        request
    }

    /// Fetch every page of a repository listing.
    ///
    /// `base` must already carry a query string. A repository that shifts
    /// onto a later page mid-listing is kept once.
    async fn list_pages(
        &self,
        base: &str,
        resource: &str,
        throttle: &Throttle,
    ) -> Result<Vec<GitHubRepo>> {
        let mut repos = Vec::new();
        let mut seen: HashSet<i64> = HashSet::new();

        for page in 1..=MAX_PAGES {
            let request = self.request(&format!("{}&per_page={}&page={}", base, PER_PAGE, page));
            let response: JsonResponse<Vec<GitHubRepo>> = throttle
                .call("github list repositories", || {
                    fetch_json(self.transport.as_ref(), request.clone(), resource)
                })
                .await?;

            let count = response.body.len();
            repos.extend(response.body.into_iter().filter(|r| seen.insert(r.id)));
            tracing::debug!(resource, page, count, "fetched GitHub repository page");

            if count < PER_PAGE {
                return Ok(repos);
            }
        }

        Err(PlatformError::api(format!(
            "pagination for {} exceeded {} pages",
            resource, MAX_PAGES
        )))
    }
}

#[async_trait]
impl ProviderAdapter for GitHubAdapter {
    fn provider(&self) -> Provider {
        Provider::GitHub
    }

    fn request_delay(&self) -> Duration {
        self.request_delay
    }

    async fn list_repositories(&self, org: &str, throttle: &Throttle) -> Result<Vec<RawRepo>> {
        let owner = urlencoding::encode(org);
        let org_listing = format!("{}/orgs/{}/repos?type=all", self.api_url, owner);

        let repos = match self.list_pages(&org_listing, org, throttle).await {
            // Personal accounts are flat containers too.
            Err(PlatformError::NotFound { .. }) => {
                tracing::debug!(org, "no GitHub organization found, listing user repositories");
                let user_listing = format!("{}/users/{}/repos?type=owner", self.api_url, owner);
                self.list_pages(&user_listing, org, throttle).await?
            }
            other => other?,
        };

        Ok(repos.into_iter().map(RawRepo::GitHub).collect())
    }

    async fn get_languages(
        &self,
        _org: &str,
        raw: &RawRepo,
        throttle: &Throttle,
    ) -> Result<Languages> {
        let RawRepo::GitHub(repo) = raw else {
            return Err(PlatformError::internal(format!(
                "GitHub adapter cannot fetch languages for a {} record",
                raw.provider()
            )));
        };
        let path = repo
            .repo_path()
            .map_err(|e| PlatformError::internal(e.to_string()))?;

        let request = self.request(&format!(
            "{}/repos/{}/languages",
            self.api_url,
            path.full_name()
        ));
        let response: JsonResponse<std::collections::BTreeMap<String, u64>> = throttle
            .call("github languages", || {
                fetch_json(self.transport.as_ref(), request.clone(), path.full_name())
            })
            .await?;

        Ok(response
            .body
            .into_iter()
            .map(|(name, bytes)| (name, bytes as f64))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockTransport, json_response};

    fn repo_json(id: i64, full_name: &str) -> serde_json::Value {
        let (owner, name) = full_name.split_once('/').unwrap();
        serde_json::json!({
            "id": id,
            "name": name,
            "full_name": full_name,
            "owner": {"login": owner},
            "private": false,
            "archived": false,
            "created_at": "2021-03-04T05:06:07Z",
            "pushed_at": "2024-01-02T03:04:05Z"
        })
    }

    fn adapter(transport: &MockTransport, credentials: Credentials) -> GitHubAdapter {
        GitHubAdapter::new_with_transport(
            Arc::new(transport.clone()),
            Some("https://api.github.test/"),
            credentials,
            Duration::ZERO,
        )
    }

    fn org_page_url(org: &str, page: u32) -> String {
        format!(
            "https://api.github.test/orgs/{}/repos?type=all&per_page={}&page={}",
            org, PER_PAGE, page
        )
    }

    #[tokio::test]
    async fn lists_all_pages_until_short_page() {
        let transport = MockTransport::new();
        let full_page: Vec<_> = (0..PER_PAGE as i64)
            .map(|i| repo_json(i, &format!("myorg/repo-{i}")))
            .collect();
        transport.push_json(org_page_url("myorg", 1), serde_json::Value::Array(full_page));
        transport.push_json(
            org_page_url("myorg", 2),
            serde_json::json!([repo_json(500, "myorg/last")]),
        );

        let repos = adapter(&transport, Credentials::None)
            .list_repositories("myorg", &Throttle::unpaced())
            .await
            .expect("listing should succeed");

        assert_eq!(repos.len(), PER_PAGE + 1);
        assert_eq!(repos.last().unwrap().id(), "github:500");
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn repository_shifted_across_pages_is_listed_once() {
        let transport = MockTransport::new();
        let full_page: Vec<_> = (0..PER_PAGE as i64)
            .map(|i| repo_json(i, &format!("myorg/repo-{i}")))
            .collect();
        transport.push_json(org_page_url("myorg", 1), serde_json::Value::Array(full_page));
        transport.push_json(
            org_page_url("myorg", 2),
            serde_json::json!([
                repo_json(PER_PAGE as i64 - 1, &format!("myorg/repo-{}", PER_PAGE - 1)),
                repo_json(500, "myorg/last"),
            ]),
        );

        let repos = adapter(&transport, Credentials::None)
            .list_repositories("myorg", &Throttle::unpaced())
            .await
            .expect("listing should succeed");

        assert_eq!(repos.len(), PER_PAGE + 1);
        let ids: HashSet<String> = repos.iter().map(|r| r.id()).collect();
        assert_eq!(ids.len(), PER_PAGE + 1);
    }

    #[tokio::test]
    async fn falls_back_to_user_repositories_on_missing_org() {
        let transport = MockTransport::new();
        transport.push_response(org_page_url("someone", 1), json_response(404, serde_json::json!({})));
        transport.push_json(
            format!(
                "https://api.github.test/users/someone/repos?type=owner&per_page={}&page=1",
                PER_PAGE
            ),
            serde_json::json!([repo_json(1, "someone/dotfiles")]),
        );

        let repos = adapter(&transport, Credentials::None)
            .list_repositories("someone", &Throttle::unpaced())
            .await
            .expect("user fallback should succeed");

        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].normalize().unwrap().group_path(), "someone");
    }

    #[tokio::test]
    async fn listing_error_fails_the_whole_call() {
        let transport = MockTransport::new();
        let full_page: Vec<_> = (0..PER_PAGE as i64)
            .map(|i| repo_json(i, &format!("myorg/repo-{i}")))
            .collect();
        transport.push_json(org_page_url("myorg", 1), serde_json::Value::Array(full_page));
        transport.push_response(org_page_url("myorg", 2), json_response(500, serde_json::json!({})));

        let err = adapter(&transport, Credentials::None)
            .list_repositories("myorg", &Throttle::unpaced())
            .await
            .expect_err("second page failure should fail the listing");
        assert!(matches!(err, PlatformError::Api { .. }));
    }

    #[tokio::test]
    async fn sends_bearer_token_and_api_headers() {
        let transport = MockTransport::new();
        transport.push_json(org_page_url("myorg", 1), serde_json::json!([]));

        adapter(&transport, Credentials::token("ghp_abc"))
            .list_repositories("myorg", &Throttle::unpaced())
            .await
            .unwrap();

        let request = &transport.requests()[0];
        assert_eq!(
            crate::http::header_get(&request.headers, "authorization"),
            Some("Bearer ghp_abc")
        );
        assert_eq!(
            crate::http::header_get(&request.headers, "accept"),
            Some("application/vnd.github+json")
        );
    }

    #[tokio::test]
    async fn fetches_languages_by_full_name() {
        let transport = MockTransport::new();
        transport.push_json(
            "https://api.github.test/repos/myorg/api-service/languages",
            serde_json::json!({"Rust": 52000, "Shell": 800}),
        );
        let raw: GitHubRepo = serde_json::from_value(repo_json(42, "myorg/api-service")).unwrap();

        let languages = adapter(&transport, Credentials::None)
            .get_languages("myorg", &RawRepo::GitHub(raw), &Throttle::unpaced())
            .await
            .unwrap();

        assert_eq!(languages.get("Rust"), Some(&52000.0));
        assert_eq!(languages.len(), 2);
    }

    #[tokio::test]
    async fn rate_limited_language_request_is_retried_once() {
        let transport = MockTransport::new();
        let url = "https://api.github.test/repos/myorg/api-service/languages";
        transport.push_response(
            url,
            crate::http::HttpResponse {
                status: 403,
                headers: vec![("x-ratelimit-remaining".to_string(), "0".to_string())],
                body: Vec::new(),
            },
        );
        transport.push_json(url, serde_json::json!({"Go": 10}));
        let raw: GitHubRepo = serde_json::from_value(repo_json(42, "myorg/api-service")).unwrap();

        let languages = adapter(&transport, Credentials::None)
            .get_languages("myorg", &RawRepo::GitHub(raw), &Throttle::unpaced())
            .await
            .unwrap();

        assert_eq!(languages.get("Go"), Some(&10.0));
        assert_eq!(transport.requests().len(), 2);
    }
}
