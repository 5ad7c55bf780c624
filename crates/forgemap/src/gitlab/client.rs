use std::collections::{BTreeMap, HashSet, VecDeque};
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

use super::types::{GitLabGroup, GitLabProject};

/// Public GitLab instance.
pub const GITLAB_URL: &str = "https://gitlab.com";

/// Page size for listings (the API maximum).
pub const PER_PAGE: usize = 100;

/// Deepest group nesting followed. GitLab itself caps subgroups at 20 levels.
pub const MAX_GROUP_DEPTH: usize = 20;

/// Hard stop for pagination of a single listing.
const MAX_PAGES: u32 = 1000;

/// A group waiting to be listed.
#[derive(Debug)]
struct PendingGroup {
    id: u64,
    /// Path accumulated from the root, used for logs and errors.
    path: String,
    depth: usize,
}

/// GitLab adapter over an HTTP transport.
#[derive(Clone)]
pub struct GitLabAdapter {
    transport: Arc<dyn HttpTransport>,
    api_url: String,
    credentials: Credentials,
    request_delay: Duration,
}

impl GitLabAdapter {
    /// Create an adapter over `transport`.
    ///
    /// `host` is the instance root (e.g. `https://gitlab.example.com`); the
    /// `/api/v4` suffix is added here.
    pub fn new_with_transport(
        transport: Arc<dyn HttpTransport>,
        host: Option<&str>,
        credentials: Credentials,
        request_delay: Duration,
    ) -> Self {
        let host = host.unwrap_or(GITLAB_URL).trim_end_matches('/');
        Self {
            transport,
            api_url: format!("{}/api/v4", host),
            credentials,
            request_delay,
        }
    }

    fn request(&self, url: &str) -> HttpRequest {
        let request = HttpRequest::get(url)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT);
        match &self.credentials {
            Credentials::None => request,
            Credentials::Token(token) => request.header("PRIVATE-TOKEN", token.as_str()),
            basic @ Credentials::Basic { .. } => match basic.authorization() {
                Some(auth) => request.header("Authorization", auth),
                None => request,
            },
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        resource: &str,
        throttle: &Throttle,
    ) -> Result<T> {
        let request = self.request(&format!("{}{}", self.api_url, path));
        let response: JsonResponse<T> = throttle
            .call("gitlab get", || {
                fetch_json(self.transport.as_ref(), request.clone(), resource)
            })
            .await?;
        Ok(response.body)
    }

    /// Fetch every page of a listing, following `x-next-page`.
    ///
    /// `path` must already carry a query string.
    async fn get_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        resource: &str,
        throttle: &Throttle,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page: u32 = 1;

        for _ in 0..MAX_PAGES {
            let request = self.request(&format!(
                "{}{}&per_page={}&page={}",
                self.api_url, path, PER_PAGE, page
            ));
            let response: JsonResponse<Vec<T>> = throttle
                .call("gitlab list", || {
                    fetch_json(self.transport.as_ref(), request.clone(), resource)
                })
                .await?;

            let next_page = response
                .header("x-next-page")
                .map(str::trim)
                .and_then(|v| v.parse::<u32>().ok());
            items.extend(response.body);

            match next_page {
                Some(next) if next > page => page = next,
                _ => return Ok(items),
            }
        }

        Err(PlatformError::api(format!(
            "pagination for {} exceeded {} pages",
            resource, MAX_PAGES
        )))
    }

    /// Walk the group tree under `root` and collect every project.
    ///
    /// Breadth-first over an explicit queue. A group id is listed at most
    /// once; references to already-visited groups (shared subgroups, or a
    /// cycle reported by the API) are skipped.
    async fn walk_groups(&self, root: &GitLabGroup, throttle: &Throttle) -> Result<Vec<GitLabProject>> {
        let mut pending = VecDeque::from([PendingGroup {
            id: root.id,
            path: root.full_path.clone(),
            depth: 1,
        }]);
        let mut visited: HashSet<u64> = HashSet::new();
        let mut seen_projects: HashSet<u64> = HashSet::new();
        let mut projects = Vec::new();

        while let Some(group) = pending.pop_front() {
            if !visited.insert(group.id) {
                tracing::debug!(group_id = group.id, path = %group.path, "group already listed");
                continue;
            }

            let listed: Vec<GitLabProject> = self
                .get_paged(
                    &format!(
                        "/groups/{}/projects?with_shared=false&order_by=id&sort=asc",
                        group.id
                    ),
                    &group.path,
                    throttle,
                )
                .await?;
            let listed_count = listed.len();
            projects.extend(listed.into_iter().filter(|p| seen_projects.insert(p.id)));

            let subgroups: Vec<GitLabGroup> = self
                .get_paged(
                    &format!("/groups/{}/subgroups?order_by=id&sort=asc", group.id),
                    &group.path,
                    throttle,
                )
                .await?;

            tracing::debug!(
                path = %group.path,
                depth = group.depth,
                projects = listed_count,
                subgroups = subgroups.len(),
                "listed GitLab group"
            );

            for sub in subgroups {
                if visited.contains(&sub.id) {
                    tracing::warn!(
                        group_id = sub.id,
                        parent = %group.path,
                        "GitLab reported an already-visited subgroup, skipping"
                    );
                    continue;
                }
                if group.depth >= MAX_GROUP_DEPTH {
                    return Err(PlatformError::api(format!(
                        "group {} nests deeper than {} levels",
                        group.path, MAX_GROUP_DEPTH
                    )));
                }
                pending.push_back(PendingGroup {
                    id: sub.id,
                    path: format!("{}/{}", group.path, sub.path),
                    depth: group.depth + 1,
                });
            }
        }

        Ok(projects)
    }
}

#[async_trait]
impl ProviderAdapter for GitLabAdapter {
    fn provider(&self) -> Provider {
        Provider::GitLab
    }

    fn request_delay(&self) -> Duration {
        self.request_delay
    }

    async fn list_repositories(&self, org: &str, throttle: &Throttle) -> Result<Vec<RawRepo>> {
        let root: GitLabGroup = self
            .get(
                &format!("/groups/{}?with_projects=false", urlencoding::encode(org)),
                org,
                throttle,
            )
            .await?;

        let projects = self.walk_groups(&root, throttle).await?;
        Ok(projects.into_iter().map(RawRepo::GitLab).collect())
    }

    async fn get_languages(
        &self,
        _org: &str,
        raw: &RawRepo,
        throttle: &Throttle,
    ) -> Result<Languages> {
        let RawRepo::GitLab(project) = raw else {
            return Err(PlatformError::internal(format!(
                "GitLab adapter cannot fetch languages for a {} record",
                raw.provider()
            )));
        };

        let languages: BTreeMap<String, f64> = self
            .get(
                &format!("/projects/{}/languages", project.id),
                &raw.label(),
                throttle,
            )
            .await?;
        Ok(languages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResponse, MockTransport};

    const API: &str = "https://gitlab.test/api/v4";

    fn adapter(transport: &MockTransport) -> GitLabAdapter {
        GitLabAdapter::new_with_transport(
            Arc::new(transport.clone()),
            Some("https://gitlab.test/"),
            Credentials::token("glpat-xyz"),
            Duration::ZERO,
        )
    }

    fn group_json(id: u64, full_path: &str) -> serde_json::Value {
        let path = full_path.rsplit('/').next().unwrap();
        serde_json::json!({"id": id, "path": path, "full_path": full_path})
    }

    fn project_json(id: u64, path_with_namespace: &str) -> serde_json::Value {
        let path = path_with_namespace.rsplit('/').next().unwrap();
        serde_json::json!({
            "id": id,
            "path": path,
            "path_with_namespace": path_with_namespace,
            "visibility": "private",
            "archived": false
        })
    }

    fn projects_url(group: u64, page: u32) -> String {
        format!(
            "{API}/groups/{group}/projects?with_shared=false&order_by=id&sort=asc&per_page={PER_PAGE}&page={page}"
        )
    }

    fn subgroups_url(group: u64) -> String {
        format!("{API}/groups/{group}/subgroups?order_by=id&sort=asc&per_page={PER_PAGE}&page=1")
    }

    fn push_root(transport: &MockTransport, org: &str, id: u64) {
        transport.push_json(
            format!("{API}/groups/{org}?with_projects=false"),
            group_json(id, org),
        );
    }

    fn push_group(
        transport: &MockTransport,
        id: u64,
        projects: Vec<serde_json::Value>,
        subgroups: Vec<serde_json::Value>,
    ) {
        transport.push_json(projects_url(id, 1), serde_json::Value::Array(projects));
        transport.push_json(subgroups_url(id), serde_json::Value::Array(subgroups));
    }

    #[tokio::test]
    async fn walks_nested_subgroups() {
        let transport = MockTransport::new();
        push_root(&transport, "myorg", 1);
        push_group(
            &transport,
            1,
            vec![project_json(10, "myorg/website")],
            vec![group_json(2, "myorg/platform")],
        );
        push_group(&transport, 2, vec![], vec![group_json(3, "myorg/platform/backend")]);
        push_group(
            &transport,
            3,
            vec![project_json(30, "myorg/platform/backend/api-service")],
            vec![],
        );

        let repos = adapter(&transport)
            .list_repositories("myorg", &Throttle::unpaced())
            .await
            .expect("walk should succeed");

        let paths: Vec<String> = repos
            .iter()
            .map(|r| r.normalize().unwrap().group_path().to_string())
            .collect();
        assert_eq!(paths, vec!["myorg", "myorg/platform/backend"]);
    }

    #[tokio::test]
    async fn shared_subgroup_and_cycle_are_listed_once() {
        let transport = MockTransport::new();
        push_root(&transport, "myorg", 1);
        push_group(
            &transport,
            1,
            vec![],
            vec![group_json(2, "myorg/a"), group_json(3, "myorg/b")],
        );
        // Both parents report group 4.
        push_group(&transport, 2, vec![], vec![group_json(4, "myorg/a/shared")]);
        push_group(&transport, 3, vec![], vec![group_json(4, "myorg/a/shared")]);
        // Group 4 points back at the root.
        push_group(
            &transport,
            4,
            vec![project_json(40, "myorg/a/shared/tool")],
            vec![group_json(1, "myorg")],
        );

        let repos = adapter(&transport)
            .list_repositories("myorg", &Throttle::unpaced())
            .await
            .expect("walk should terminate without relisting");

        assert_eq!(repos.len(), 1);
        let project_listings = transport
            .request_urls()
            .into_iter()
            .filter(|u| u.contains("/groups/4/projects"))
            .count();
        assert_eq!(project_listings, 1);
    }

    #[tokio::test]
    async fn follows_next_page_header() {
        let transport = MockTransport::new();
        push_root(&transport, "myorg", 1);
        transport.push_response(
            projects_url(1, 1),
            HttpResponse {
                status: 200,
                headers: vec![("X-Next-Page".to_string(), "2".to_string())],
                body: serde_json::to_vec(&serde_json::json!([project_json(1, "myorg/one")]))
                    .unwrap(),
            },
        );
        transport.push_response(
            projects_url(1, 2),
            HttpResponse {
                status: 200,
                headers: vec![("X-Next-Page".to_string(), String::new())],
                body: serde_json::to_vec(&serde_json::json!([project_json(2, "myorg/two")]))
                    .unwrap(),
            },
        );
        transport.push_json(subgroups_url(1), serde_json::json!([]));

        let repos = adapter(&transport)
            .list_repositories("myorg", &Throttle::unpaced())
            .await
            .unwrap();
        assert_eq!(repos.len(), 2);
    }

    #[tokio::test]
    async fn subgroup_failure_fails_the_listing() {
        let transport = MockTransport::new();
        push_root(&transport, "myorg", 1);
        transport.push_json(projects_url(1, 1), serde_json::json!([]));
        // No subgroups response registered: the transport errors.

        let err = adapter(&transport)
            .list_repositories("myorg", &Throttle::unpaced())
            .await
            .expect_err("missing subgroup listing should fail");
        assert!(matches!(err, PlatformError::Network { .. }));
    }

    #[tokio::test]
    async fn encodes_nested_root_path_and_sends_private_token() {
        let transport = MockTransport::new();
        transport.push_json(
            format!("{API}/groups/myorg%2Fplatform?with_projects=false"),
            group_json(2, "myorg/platform"),
        );
        push_group(&transport, 2, vec![project_json(5, "myorg/platform/svc")], vec![]);

        let repos = adapter(&transport)
            .list_repositories("myorg/platform", &Throttle::unpaced())
            .await
            .unwrap();
        assert_eq!(repos.len(), 1);

        let request = &transport.requests()[0];
        assert_eq!(
            crate::http::header_get(&request.headers, "private-token"),
            Some("glpat-xyz")
        );
    }

    #[tokio::test]
    async fn fetches_languages_by_project_id() {
        let transport = MockTransport::new();
        transport.push_json(
            format!("{API}/projects/30/languages"),
            serde_json::json!({"Ruby": 66.69, "JavaScript": 22.98}),
        );
        let project: GitLabProject =
            serde_json::from_value(project_json(30, "myorg/platform/backend/api-service")).unwrap();

        let languages = adapter(&transport)
            .get_languages("myorg", &RawRepo::GitLab(project), &Throttle::unpaced())
            .await
            .unwrap();
        assert_eq!(languages.get("Ruby"), Some(&66.69));
    }
}
