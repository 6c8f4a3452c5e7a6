//! Pure derivations over a [`Snapshot`]. Nothing here performs I/O or reads
//! the clock: "now" is always passed in.

pub mod activity;
pub mod calendar;
pub mod goals;
pub mod languages;
pub mod topics;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MetricsConfig;
use crate::models::{
    ContributionDay, LanguageShare, MonthlyActivity, Snapshot, SnapshotStats, TopicCount,
};

pub use activity::monthly_activity;
pub use calendar::contribution_calendar;
pub use goals::{default_goals, goal_progress};
pub use languages::{language_color, language_share};
pub use topics::{top_topics, topic_frequency};

/// How commits, pull requests and issues are grouped into twelve buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MonthBucketing {
    /// The twelve calendar months ending at the reference month, each with
    /// its year.
    #[default]
    YearMonth,
    /// January through December, with the trailing year folded onto month
    /// names. Two different years of the same month share a bucket.
    MonthOfYear,
}

impl FromStr for MonthBucketing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "year-month" => Ok(MonthBucketing::YearMonth),
            "month-of-year" => Ok(MonthBucketing::MonthOfYear),
            other => Err(format!(
                "unknown month bucketing '{}', expected year-month or month-of-year",
                other
            )),
        }
    }
}

impl fmt::Display for MonthBucketing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthBucketing::YearMonth => write!(f, "year-month"),
            MonthBucketing::MonthOfYear => write!(f, "month-of-year"),
        }
    }
}

impl SnapshotStats {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            total_commits: snapshot.commits.len() as u32,
            total_prs: snapshot.pull_requests.len() as u32,
            total_issues: snapshot
                .issues
                .iter()
                .filter(|issue| !issue.is_pull_request())
                .count() as u32,
            total_stars: snapshot.total_stars(),
            total_repositories: snapshot.repositories.len() as u32,
        }
    }
}

/// Everything the dashboard renders besides the profile and summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub stats: SnapshotStats,
    pub monthly_activity: Vec<MonthlyActivity>,
    pub contribution_calendar: Vec<ContributionDay>,
    pub languages: Vec<LanguageShare>,
    pub topics: Vec<TopicCount>,
}

impl DashboardMetrics {
    pub fn compute(snapshot: &Snapshot, config: &MetricsConfig, now: DateTime<Utc>) -> Self {
        Self {
            stats: SnapshotStats::from_snapshot(snapshot),
            monthly_activity: monthly_activity(snapshot, now, config.bucketing),
            contribution_calendar: contribution_calendar(
                snapshot,
                config.calendar_window_days,
                now.date_naive(),
            ),
            languages: language_share(&snapshot.repositories),
            topics: topic_frequency(&snapshot.repositories, config.topic_limit),
        }
    }

    /// Days in the calendar window with at least one commit.
    pub fn active_days(&self) -> usize {
        self.contribution_calendar
            .iter()
            .filter(|day| day.count > 0)
            .count()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::models::{Commit, Profile, Repository, RepositoryOwner, Snapshot};

    pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    pub fn profile() -> Profile {
        Profile {
            login: "octocat".to_string(),
            id: 1,
            name: Some("The Octocat".to_string()),
            avatar_url: "https://avatars.test/1".to_string(),
            bio: None,
            company: None,
            location: None,
            blog: None,
            email: None,
            twitter_username: None,
            public_repos: 0,
            public_gists: 0,
            followers: 0,
            following: 0,
            created_at: at(2015, 1, 1),
        }
    }

    pub fn repo(id: u64, language: Option<&str>, topics: &[&str]) -> Repository {
        Repository {
            id,
            name: format!("repo-{}", id),
            full_name: format!("octocat/repo-{}", id),
            owner: RepositoryOwner {
                login: "octocat".to_string(),
            },
            description: None,
            language: language.map(str::to_string),
            stargazers_count: 0,
            forks_count: 0,
            watchers_count: 0,
            open_issues_count: 0,
            topics: topics.iter().map(|t| t.to_string()).collect(),
            private: false,
            fork: false,
            archived: false,
            visibility: Some("public".to_string()),
            html_url: format!("https://github.test/octocat/repo-{}", id),
            homepage: None,
            created_at: at(2020, 1, 1),
            updated_at: at(2024, 1, 1),
            pushed_at: None,
        }
    }

    pub fn commit(sha: &str, authored_at: DateTime<Utc>) -> Commit {
        Commit {
            sha: sha.to_string(),
            message: "work".to_string(),
            authored_at,
            repository: "octocat/repo-1".to_string(),
            html_url: None,
        }
    }

    pub fn snapshot() -> Snapshot {
        Snapshot::empty(profile(), at(2024, 3, 10))
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_bucketing_from_str() {
        assert_eq!("year-month".parse::<MonthBucketing>(), Ok(MonthBucketing::YearMonth));
        assert_eq!(
            " Month-Of-Year ".parse::<MonthBucketing>(),
            Ok(MonthBucketing::MonthOfYear)
        );
        assert!("weekly".parse::<MonthBucketing>().is_err());
        assert_eq!(MonthBucketing::default(), MonthBucketing::YearMonth);
        assert_eq!(MonthBucketing::MonthOfYear.to_string(), "month-of-year");
    }

    #[test]
    fn test_compute_bundles_everything() {
        let mut snapshot = snapshot();
        snapshot.repositories = vec![repo(1, Some("Rust"), &["cli"])];
        snapshot.repositories[0].stargazers_count = 4;
        snapshot.commits = vec![commit("a", at(2024, 3, 1)), commit("b", at(2024, 3, 2))];

        let metrics = DashboardMetrics::compute(&snapshot, &MetricsConfig::default(), at(2024, 3, 10));

        assert_eq!(metrics.stats.total_commits, 2);
        assert_eq!(metrics.stats.total_stars, 4);
        assert_eq!(metrics.stats.total_repositories, 1);
        assert_eq!(metrics.monthly_activity.len(), 12);
        assert_eq!(metrics.contribution_calendar.len(), 90);
        assert_eq!(metrics.active_days(), 2);
        assert_eq!(metrics.languages[0].name, "Rust");
        assert_eq!(metrics.topics[0].topic, "cli");
    }
}
