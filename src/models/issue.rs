use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response envelope of `GET /search/issues`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResults<T> {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub login: String,
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

/// A search hit. GitHub reports pull requests as issues with a
/// `pull_request` link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    pub state: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: u32,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub pull_request: Option<PullRequestRef>,
    pub html_url: String,
    pub user: Option<UserRef>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub number: u64,
    pub state: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub merged: bool,
    pub html_url: String,
    pub user: Option<UserRef>,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.merged || self.merged_at.is_some()
    }
}
