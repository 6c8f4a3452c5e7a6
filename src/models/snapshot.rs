use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SubFetchError;
use super::commit::Commit;
use super::event::Event;
use super::issue::{Issue, PullRequest};
use super::repository::Repository;
use super::user::{Gist, Organization, Profile};

/// Result of one aggregation cycle. Built by a single engine invocation and
/// treated as immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub fetched_at: DateTime<Utc>,
    pub profile: Profile,
    pub repositories: Vec<Repository>,
    pub organizations: Vec<Organization>,
    pub gists: Vec<Gist>,
    pub events: Vec<Event>,
    pub commits: Vec<Commit>,
    pub pull_requests: Vec<PullRequest>,
    /// Issue search hits that are not pull requests.
    pub issues: Vec<Issue>,
    pub partial_failures: Vec<PartialFailure>,
    pub rate_limit: Option<RateLimitStatus>,
}

impl Snapshot {
    /// A snapshot holding only a profile; every collection is empty.
    pub fn empty(profile: Profile, fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetched_at,
            profile,
            repositories: Vec::new(),
            organizations: Vec::new(),
            gists: Vec::new(),
            events: Vec::new(),
            commits: Vec::new(),
            pull_requests: Vec::new(),
            issues: Vec::new(),
            partial_failures: Vec::new(),
            rate_limit: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.partial_failures.is_empty()
    }

    pub fn failed(&self, sub_fetch: &SubFetch) -> bool {
        self.partial_failures.iter().any(|f| &f.sub_fetch == sub_fetch)
    }

    pub fn total_stars(&self) -> u64 {
        self.repositories
            .iter()
            .map(|r| r.stargazers_count as u64)
            .sum()
    }
}

/// Identifies one sub-fetch within a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "sub_fetch", rename_all = "snake_case")]
pub enum SubFetch {
    Repositories,
    Organizations,
    Gists,
    Events,
    Commits { repository: String },
    PullRequestSearch,
    PullRequestDetail { url: String },
    IssueSearch,
}

impl std::fmt::Display for SubFetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubFetch::Repositories => write!(f, "repositories"),
            SubFetch::Organizations => write!(f, "organizations"),
            SubFetch::Gists => write!(f, "gists"),
            SubFetch::Events => write!(f, "events"),
            SubFetch::Commits { repository } => write!(f, "commits of {}", repository),
            SubFetch::PullRequestSearch => write!(f, "pull request search"),
            SubFetch::PullRequestDetail { url } => write!(f, "pull request {}", url),
            SubFetch::IssueSearch => write!(f, "issue search"),
        }
    }
}

/// A sub-fetch whose data is missing from the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialFailure {
    pub sub_fetch: SubFetch,
    pub error: SubFetchError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub limit: Option<u32>,
    pub remaining: u32,
    pub reset_at: Option<DateTime<Utc>>,
}
