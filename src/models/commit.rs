use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire shape of an item from `GET /repos/{owner}/{repo}/commits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    pub commit: CommitDetails,
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDetails {
    pub message: String,
    pub author: CommitAuthor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
    pub date: DateTime<Utc>,
}

/// A commit authored by the user, tagged with the repository it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub authored_at: DateTime<Utc>,
    pub repository: String,
    pub html_url: Option<String>,
}

impl Commit {
    pub fn from_summary(summary: CommitSummary, repository: &str) -> Self {
        Self {
            sha: summary.sha,
            message: summary.commit.message,
            authored_at: summary.commit.author.date,
            repository: repository.to_string(),
            html_url: summary.html_url,
        }
    }

    pub fn headline(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}
