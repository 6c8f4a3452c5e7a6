use crate::error::{Error, Result};
use crate::metrics::MonthBucketing;
use std::env;

pub const DEFAULT_SUMMARY_MODEL: &str = "gemini-2.5-flash-lite";

#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: Option<String>,
    pub gemini_api_key: Option<String>,
    pub summary_model: String,
    pub database_path: String,
    pub commit_repo_limit: usize,
    pub concurrency_limit: usize,
    pub pr_detail_limit: usize,
    pub calendar_window_days: u32,
    pub topic_limit: usize,
    pub month_bucketing: MonthBucketing,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // A missing token is reported later as an auth failure, not a config error.
        let github_token = non_blank_var("GITHUB_TOKEN");

        // No key selects the local summary, silently.
        let gemini_api_key = non_blank_var("GEMINI_API_KEY");

        let summary_model = env::var("SUMMARY_MODEL")
            .unwrap_or_else(|_| DEFAULT_SUMMARY_MODEL.to_string());

        let database_path = env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "devscope.db".to_string());

        let commit_repo_limit = parsed_var("COMMIT_REPO_LIMIT").unwrap_or(20);
        let concurrency_limit = parsed_var("CONCURRENCY_LIMIT").unwrap_or(5);
        let pr_detail_limit = parsed_var("PR_DETAIL_LIMIT").unwrap_or(100);
        let calendar_window_days = parsed_var("CALENDAR_WINDOW_DAYS").unwrap_or(90);
        let topic_limit = parsed_var("TOPIC_LIMIT").unwrap_or(15);

        let month_bucketing = match env::var("MONTH_BUCKETING") {
            Ok(value) => value.parse().map_err(Error::Config)?,
            Err(_) => MonthBucketing::default(),
        };

        if concurrency_limit == 0 {
            return Err(Error::Config("CONCURRENCY_LIMIT must be at least 1".to_string()));
        }
        if calendar_window_days == 0 {
            return Err(Error::Config("CALENDAR_WINDOW_DAYS must be at least 1".to_string()));
        }

        Ok(Self {
            github_token,
            gemini_api_key,
            summary_model,
            database_path,
            commit_repo_limit,
            concurrency_limit,
            pr_detail_limit,
            calendar_window_days,
            topic_limit,
            month_bucketing,
        })
    }
}

fn non_blank_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Knobs bounding the request budget of one aggregation cycle.
#[derive(Debug, Clone)]
pub struct AggregationConfig {
    /// How many recently updated repositories get a commit history fetch.
    pub commit_repo_limit: usize,
    /// Concurrent commit / pull request detail requests in flight.
    pub concurrency_limit: usize,
    /// How many pull request search hits get a detail fetch.
    pub pr_detail_limit: usize,
    pub include_forks_in_commits: bool,
    pub show_progress: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            commit_repo_limit: 20,
            concurrency_limit: 5,
            pr_detail_limit: 100,
            include_forks_in_commits: false,
            show_progress: false,
        }
    }
}

impl From<&Config> for AggregationConfig {
    fn from(config: &Config) -> Self {
        Self {
            commit_repo_limit: config.commit_repo_limit,
            concurrency_limit: config.concurrency_limit,
            pr_detail_limit: config.pr_detail_limit,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub bucketing: MonthBucketing,
    pub calendar_window_days: u32,
    pub topic_limit: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            bucketing: MonthBucketing::default(),
            calendar_window_days: 90,
            topic_limit: 15,
        }
    }
}

impl From<&Config> for MetricsConfig {
    fn from(config: &Config) -> Self {
        Self {
            bucketing: config.month_bucketing,
            calendar_window_days: config.calendar_window_days,
            topic_limit: config.topic_limit,
        }
    }
}
