use std::collections::HashSet;
use std::future::Future;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;

use crate::config::AggregationConfig;
use crate::error::{AggregationError, SubFetchError};
use crate::github::{AuthContext, GitHubClient, Paged, RateLimitResource};
use crate::metrics::activity::lookback_start;
use crate::models::{Commit, PartialFailure, PullRequest, Issue, Repository, Snapshot, SubFetch};

const PULL_REQUEST_QUERY: &str = "is:pr+author:@me";
const ISSUE_QUERY: &str = "author:@me+is:issue";

/// Builds a [`Snapshot`] from the GitHub API on behalf of one user.
///
/// Only the profile request is mandatory. Every other request is a
/// sub-fetch: its failure is recorded on the snapshot as a
/// [`PartialFailure`] and the cycle carries on with whatever succeeded.
pub struct AggregationEngine {
    github: GitHubClient,
    config: AggregationConfig,
}

impl AggregationEngine {
    pub fn new(github: GitHubClient, config: AggregationConfig) -> Self {
        Self { github, config }
    }

    pub fn github(&self) -> &GitHubClient {
        &self.github
    }

    pub async fn fetch_snapshot(&self, auth: &AuthContext) -> Result<Snapshot, AggregationError> {
        self.fetch_snapshot_at(auth, Utc::now()).await
    }

    /// Same as [`fetch_snapshot`](Self::fetch_snapshot) with a fixed clock,
    /// which sets both the commit lookback and `fetched_at`.
    pub async fn fetch_snapshot_at(
        &self,
        auth: &AuthContext,
        now: DateTime<Utc>,
    ) -> Result<Snapshot, AggregationError> {
        // Each cycle meters its own budget.
        let cycle = Cycle {
            github: self.github.session(),
            config: &self.config,
            auth,
            now,
        };
        cycle.run().await
    }

    /// The repositories whose commit history gets fetched: the most recently
    /// updated ones, capped to stay under secondary rate limits.
    pub fn select_commit_repositories<'r>(&self, repositories: &'r [Repository]) -> Vec<&'r Repository> {
        select_commit_repositories(&self.config, repositories)
    }
}

/// State of one aggregation cycle.
struct Cycle<'a> {
    github: GitHubClient,
    config: &'a AggregationConfig,
    auth: &'a AuthContext,
    now: DateTime<Utc>,
}

impl Cycle<'_> {
    async fn run(&self) -> Result<Snapshot, AggregationError> {
        let auth = self.auth;

        // Step 1: everything below needs the login
        let profile = self
            .github
            .get_authenticated_user(auth)
            .await
            .map_err(|e| {
                tracing::warn!("Profile fetch failed: {}", e);
                AggregationError::from_profile_failure(e)
            })?;
        let login = profile.login.clone();
        tracing::info!("Aggregating GitHub data for {}", login);

        let mut failures = Vec::new();

        // Step 2: independent listings
        let (repositories, organizations, gists, events) = tokio::join!(
            self.paged_unless_exhausted(self.github.list_repositories(auth)),
            self.unless_exhausted(RateLimitResource::Core, self.github.list_organizations(auth)),
            self.paged_unless_exhausted(self.github.list_gists(auth)),
            self.paged_unless_exhausted(self.github.list_user_events(auth, &login)),
        );

        let repositories = dedup_by_key(
            collect_paged(repositories, SubFetch::Repositories, &mut failures),
            |r| r.id,
        );
        let organizations = match organizations {
            Ok(orgs) => dedup_by_key(orgs, |o| o.id),
            Err(e) => {
                record(&mut failures, SubFetch::Organizations, e);
                Vec::new()
            }
        };
        let gists = dedup_by_key(collect_paged(gists, SubFetch::Gists, &mut failures), |g| {
            g.id.clone()
        });
        let events = dedup_by_key(collect_paged(events, SubFetch::Events, &mut failures), |e| {
            e.id.clone()
        });
        tracing::info!(
            "Found {} repositories, {} organizations, {} gists, {} events",
            repositories.len(),
            organizations.len(),
            gists.len(),
            events.len()
        );

        // Step 3: per-repository commit history, bounded fan-out
        let (commits, commit_failures) = self.fetch_commits(&login, &repositories).await;
        failures.extend(commit_failures);

        // Step 4: search-based pull requests and issues
        let ((pull_requests, pr_failures), (issues, issue_failures)) =
            tokio::join!(self.fetch_pull_requests(), self.fetch_issues());
        failures.extend(pr_failures);
        failures.extend(issue_failures);

        let snapshot = Snapshot {
            fetched_at: self.now,
            profile,
            repositories,
            organizations,
            gists,
            events,
            commits,
            pull_requests,
            issues,
            partial_failures: failures,
            rate_limit: self.github.rate_limiter().status(),
        };

        tracing::info!(
            "Snapshot for {}: {} commits, {} pull requests, {} issues ({} partial failures)",
            login,
            snapshot.commits.len(),
            snapshot.pull_requests.len(),
            snapshot.issues.len(),
            snapshot.partial_failures.len()
        );

        Ok(snapshot)
    }

    async fn fetch_commits(
        &self,
        login: &str,
        repositories: &[Repository],
    ) -> (Vec<Commit>, Vec<PartialFailure>) {
        let selected = select_commit_repositories(self.config, repositories);
        let since = lookback_start(self.now);
        let semaphore = Semaphore::new(self.config.concurrency_limit.max(1));
        let pb = self.progress_bar(selected.len(), "repos");

        tracing::info!(
            "Fetching commits since {} from {} of {} repositories",
            since.date_naive(),
            selected.len(),
            repositories.len()
        );

        let commit_futures = selected.iter().map(|repo| {
            let semaphore = &semaphore;
            let pb = &pb;
            async move {
                let _permit = semaphore.acquire().await;

                let result = if let Some(err) = self.budget_exhausted(RateLimitResource::Core) {
                    Err(err)
                } else {
                    let paged = self
                        .github
                        .list_commits(self.auth, &repo.owner.login, &repo.name, login, since)
                        .await;
                    match paged.stopped_by {
                        // Pages read before the failure still count.
                        Some(e) if paged.items.is_empty() => Err(e),
                        Some(e) => Ok((paged.items, Some(e))),
                        None => Ok((paged.items, None)),
                    }
                };

                pb.inc(1);
                (*repo, result)
            }
        });

        let results = join_all(commit_futures).await;
        pb.finish_and_clear();

        let mut failures = Vec::new();
        let mut commits = Vec::new();
        for (repo, result) in results {
            let sub_fetch = SubFetch::Commits {
                repository: repo.full_name.clone(),
            };
            match result {
                Ok((items, stopped_by)) => {
                    // `since` filters on committer date; rebased work can
                    // carry an older author date.
                    commits.extend(
                        items
                            .into_iter()
                            .map(|summary| Commit::from_summary(summary, &repo.full_name))
                            .filter(|commit| commit.authored_at >= since),
                    );
                    if let Some(e) = stopped_by {
                        record(&mut failures, sub_fetch, e);
                    }
                }
                Err(e) => record(&mut failures, sub_fetch, e),
            }
        }

        (dedup_by_key(commits, |c| c.sha.clone()), failures)
    }

    async fn fetch_pull_requests(&self) -> (Vec<PullRequest>, Vec<PartialFailure>) {
        let mut failures = Vec::new();

        let search = match self
            .unless_exhausted(
                RateLimitResource::Search,
                self.github.search_issues(self.auth, PULL_REQUEST_QUERY),
            )
            .await
        {
            Ok(search) => search,
            Err(e) => {
                record(&mut failures, SubFetch::PullRequestSearch, e);
                return (Vec::new(), failures);
            }
        };

        let detail_urls: Vec<String> = search
            .items
            .into_iter()
            .filter_map(|hit| hit.pull_request.map(|pr| pr.url))
            .take(self.config.pr_detail_limit)
            .collect();
        tracing::info!("Fetching details for {} pull requests", detail_urls.len());

        let semaphore = Semaphore::new(self.config.concurrency_limit.max(1));
        let detail_futures = detail_urls.into_iter().map(|url| {
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore.acquire().await;
                let result = match self.budget_exhausted(RateLimitResource::Core) {
                    Some(err) => Err(err),
                    None => self.github.get_pull_request(self.auth, &url).await,
                };
                (url, result)
            }
        });

        let mut pull_requests = Vec::new();
        for (url, result) in join_all(detail_futures).await {
            match result {
                Ok(pr) => pull_requests.push(pr),
                Err(e) => record(&mut failures, SubFetch::PullRequestDetail { url }, e),
            }
        }

        (dedup_by_key(pull_requests, |pr| pr.id), failures)
    }

    async fn fetch_issues(&self) -> (Vec<Issue>, Vec<PartialFailure>) {
        match self
            .unless_exhausted(
                RateLimitResource::Search,
                self.github.search_issues(self.auth, ISSUE_QUERY),
            )
            .await
        {
            Ok(search) => {
                let issues = search
                    .items
                    .into_iter()
                    .filter(|issue| !issue.is_pull_request())
                    .collect();
                (dedup_by_key(issues, |i| i.id), Vec::new())
            }
            Err(e) => {
                let mut failures = Vec::new();
                record(&mut failures, SubFetch::IssueSearch, e);
                (Vec::new(), failures)
            }
        }
    }

    fn budget_exhausted(&self, resource: RateLimitResource) -> Option<SubFetchError> {
        let limiter = self.github.rate_limiter();
        if limiter.is_exhausted(resource, self.now) {
            Some(SubFetchError::RateLimited {
                reset_at: limiter.status_for(resource).and_then(|s| s.reset_at),
            })
        } else {
            None
        }
    }

    /// Runs `request` only while the `resource` budget lasts.
    async fn unless_exhausted<T>(
        &self,
        resource: RateLimitResource,
        request: impl Future<Output = Result<T, SubFetchError>>,
    ) -> Result<T, SubFetchError> {
        match self.budget_exhausted(resource) {
            Some(err) => Err(err),
            None => request.await,
        }
    }

    /// Listings all draw from the core budget.
    async fn paged_unless_exhausted<T>(&self, request: impl Future<Output = Paged<T>>) -> Paged<T> {
        match self.budget_exhausted(RateLimitResource::Core) {
            Some(err) => Paged {
                items: Vec::new(),
                pages: 0,
                stopped_by: Some(err),
            },
            None => request.await,
        }
    }

    fn progress_bar(&self, len: usize, unit: &str) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {}",
            unit
        );
        let style = ProgressStyle::default_bar()
            .template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb
    }
}

fn select_commit_repositories<'r>(
    config: &AggregationConfig,
    repositories: &'r [Repository],
) -> Vec<&'r Repository> {
    let mut selected: Vec<&Repository> = repositories
        .iter()
        .filter(|r| config.include_forks_in_commits || !r.fork)
        .collect();
    selected.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    selected.truncate(config.commit_repo_limit);
    selected
}

fn record(failures: &mut Vec<PartialFailure>, sub_fetch: SubFetch, error: SubFetchError) {
    tracing::warn!("Skipping {}: {}", sub_fetch, error);
    failures.push(PartialFailure { sub_fetch, error });
}

fn collect_paged<T>(paged: Paged<T>, sub_fetch: SubFetch, failures: &mut Vec<PartialFailure>) -> Vec<T> {
    if let Some(e) = paged.stopped_by {
        record(failures, sub_fetch, e);
    }
    paged.items
}

/// Keeps the first occurrence of every key, preserving order.
fn dedup_by_key<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(key(item))).collect()
}
