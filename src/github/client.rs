use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{header, Client};
use serde::de::DeserializeOwned;

use crate::error::{Result, SubFetchError};
use crate::github::auth::AuthContext;
use crate::github::paginator::{Paged, Paginator};
use crate::github::rate_limiter::RateLimitTracker;
use crate::models::{
    CommitSummary, Event, Gist, Issue, Organization, Profile, PullRequest, Repository,
    SearchResults,
};

pub const GITHUB_API_URL: &str = "https://api.github.com";

const REPOSITORY_PAGES: usize = 10;
const GIST_PAGES: usize = 3;
const EVENT_PAGES: usize = 3;
const COMMIT_PAGES: usize = 2;

/// Headers of interest on a GitHub response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseMeta {
    pub link: Option<String>,
    pub rate_limit_remaining: Option<u32>,
    pub rate_limit_limit: Option<u32>,
    /// Epoch seconds.
    pub rate_limit_reset: Option<i64>,
    /// Budget the counters belong to, e.g. `core` or `search`.
    pub rate_limit_resource: Option<String>,
}

impl ResponseMeta {
    pub fn from_headers(headers: &header::HeaderMap) -> Self {
        fn value<T: std::str::FromStr>(headers: &header::HeaderMap, name: &str) -> Option<T> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        }

        Self {
            link: headers
                .get(header::LINK)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            rate_limit_remaining: value(headers, "x-ratelimit-remaining"),
            rate_limit_limit: value(headers, "x-ratelimit-limit"),
            rate_limit_reset: value(headers, "x-ratelimit-reset"),
            rate_limit_resource: value(headers, "x-ratelimit-resource"),
        }
    }

    fn reset_at(&self) -> Option<DateTime<Utc>> {
        self.rate_limit_reset
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Status, body and headers of a completed request. A non-2xx status is an
/// ordinary value here, classified only when the body is consumed.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
    pub meta: ResponseMeta,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn error_for_status(&self, url: &str) -> Option<SubFetchError> {
        match self.status {
            200..=299 => None,
            401 => Some(SubFetchError::Unauthorized),
            403 | 429 => Some(SubFetchError::RateLimited {
                reset_at: self.meta.reset_at(),
            }),
            404 => Some(SubFetchError::NotFound {
                url: url.to_string(),
            }),
            status => Some(SubFetchError::Status(status)),
        }
    }

    pub fn json<T: DeserializeOwned>(&self, url: &str) -> std::result::Result<T, SubFetchError> {
        if let Some(err) = self.error_for_status(url) {
            return Err(err);
        }
        serde_json::from_str(&self.body).map_err(|e| SubFetchError::Decode(e.to_string()))
    }
}

/// Issues a single authenticated GET.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, token: &str) -> std::result::Result<ApiResponse, SubFetchError>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            header::HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("devscope/0.1"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, token: &str) -> std::result::Result<ApiResponse, SubFetchError> {
        let response = self.client.get(url).bearer_auth(token).send().await?;
        let status = response.status().as_u16();
        let meta = ResponseMeta::from_headers(response.headers());
        let body = response.text().await?;
        Ok(ApiResponse { status, body, meta })
    }
}

pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    rate_limiter: RateLimitTracker,
    base_url: String,
}

impl GitHubClient {
    pub fn new() -> Result<Self> {
        Ok(Self::with_transport(ReqwestTransport::new()?, GITHUB_API_URL))
    }

    pub fn with_transport(transport: impl HttpTransport + 'static, base_url: impl Into<String>) -> Self {
        Self {
            transport: Arc::new(transport),
            rate_limiter: RateLimitTracker::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// A client on the same transport with a rate limit tracker of its own.
    pub fn session(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            rate_limiter: RateLimitTracker::new(),
            base_url: self.base_url.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    pub async fn get(
        &self,
        auth: &AuthContext,
        url: &str,
    ) -> std::result::Result<ApiResponse, SubFetchError> {
        let url = self.url(url);
        tracing::debug!("GET {}", url);

        let response = self.transport.get(&url, auth.token()).await?;
        self.rate_limiter.update_from_meta(&response.meta);

        if !response.is_success() {
            tracing::debug!("GET {} returned {}", url, response.status);
        }
        Ok(response)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        auth: &AuthContext,
        url: &str,
    ) -> std::result::Result<T, SubFetchError> {
        let response = self.get(auth, url).await?;
        response.json(&self.url(url))
    }

    pub async fn get_all_pages<T: DeserializeOwned>(
        &self,
        auth: &AuthContext,
        url: &str,
        max_pages: usize,
    ) -> Paged<T> {
        Paginator::new(self).fetch_all(auth, &self.url(url), max_pages).await
    }

    pub async fn get_authenticated_user(
        &self,
        auth: &AuthContext,
    ) -> std::result::Result<Profile, SubFetchError> {
        tracing::info!("Fetching authenticated GitHub profile");
        self.get_json(auth, "/user").await
    }

    pub async fn list_repositories(&self, auth: &AuthContext) -> Paged<Repository> {
        self.get_all_pages(auth, "/user/repos?per_page=100&sort=updated", REPOSITORY_PAGES)
            .await
    }

    pub async fn list_organizations(
        &self,
        auth: &AuthContext,
    ) -> std::result::Result<Vec<Organization>, SubFetchError> {
        self.get_json(auth, "/user/orgs").await
    }

    pub async fn list_gists(&self, auth: &AuthContext) -> Paged<Gist> {
        self.get_all_pages(auth, "/gists?per_page=100", GIST_PAGES).await
    }

    pub async fn list_user_events(&self, auth: &AuthContext, login: &str) -> Paged<Event> {
        let url = format!("/users/{}/events?per_page=100", login);
        self.get_all_pages(auth, &url, EVENT_PAGES).await
    }

    pub async fn list_commits(
        &self,
        auth: &AuthContext,
        owner: &str,
        repo: &str,
        author: &str,
        since: DateTime<Utc>,
    ) -> Paged<CommitSummary> {
        let url = format!(
            "/repos/{}/{}/commits?author={}&since={}&per_page=100",
            owner,
            repo,
            author,
            since.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        self.get_all_pages(auth, &url, COMMIT_PAGES).await
    }

    /// `query` is inserted verbatim, e.g. `is:pr+author:@me`.
    pub async fn search_issues(
        &self,
        auth: &AuthContext,
        query: &str,
    ) -> std::result::Result<SearchResults<Issue>, SubFetchError> {
        let url = format!("/search/issues?q={}&per_page=100&sort=created", query);
        self.get_json(auth, &url).await
    }

    pub async fn get_pull_request(
        &self,
        auth: &AuthContext,
        url: &str,
    ) -> std::result::Result<PullRequest, SubFetchError> {
        self.get_json(auth, url).await
    }

    pub fn rate_limiter(&self) -> &RateLimitTracker {
        &self.rate_limiter
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
