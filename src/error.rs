use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error("GitHub API error: {0}")]
    GitHubApi(#[from] SubFetchError),

    #[error("Summary generation error: {0}")]
    Summary(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Aggregation(e) => e.is_retryable(),
            Error::GitHubApi(e) => e.is_rate_limited() || matches!(e, SubFetchError::Network(_)),
            Error::Network(_) => true,
            _ => false,
        }
    }
}

/// Failure of a whole aggregation cycle. Only the mandatory profile call
/// (or a missing token) can produce one of these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("no valid GitHub token available, cannot refresh")]
    AuthFailure,

    #[error("GitHub rate limit reached while fetching the profile")]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("GitHub profile unavailable: {0}")]
    UpstreamUnavailable(SubFetchError),
}

impl AggregationError {
    pub(crate) fn from_profile_failure(err: SubFetchError) -> Self {
        match err {
            SubFetchError::Unauthorized => AggregationError::AuthFailure,
            SubFetchError::RateLimited { reset_at } => AggregationError::RateLimited { reset_at },
            other => AggregationError::UpstreamUnavailable(other),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            AggregationError::AuthFailure => false,
            AggregationError::RateLimited { .. } => true,
            AggregationError::UpstreamUnavailable(e) => {
                matches!(e, SubFetchError::Network(_) | SubFetchError::Status(500..=599))
            }
        }
    }

    /// The single notification surfaced to a user for a failed refresh.
    pub fn user_message(&self) -> &'static str {
        match self {
            AggregationError::AuthFailure => "GitHub token missing or invalid, please sign in again",
            _ => "Failed to load GitHub data, try refreshing",
        }
    }
}

/// Outcome of a single failed sub-fetch. Kept cloneable and comparable so it
/// can be recorded on a snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SubFetchError {
    #[error("resource not found: {url}")]
    NotFound { url: String },

    #[error("request unauthorized")]
    Unauthorized,

    #[error("rate limited")]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("network failure: {0}")]
    Network(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl SubFetchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SubFetchError::RateLimited { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SubFetchError::NotFound { .. })
    }
}

impl From<reqwest::Error> for SubFetchError {
    fn from(err: reqwest::Error) -> Self {
        SubFetchError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_failure_classification() {
        assert_eq!(
            AggregationError::from_profile_failure(SubFetchError::Unauthorized),
            AggregationError::AuthFailure
        );
        assert_eq!(
            AggregationError::from_profile_failure(SubFetchError::RateLimited { reset_at: None }),
            AggregationError::RateLimited { reset_at: None }
        );
        assert!(matches!(
            AggregationError::from_profile_failure(SubFetchError::Status(502)),
            AggregationError::UpstreamUnavailable(SubFetchError::Status(502))
        ));
    }

    #[test]
    fn test_retryable() {
        assert!(AggregationError::RateLimited { reset_at: None }.is_retryable());
        assert!(!AggregationError::AuthFailure.is_retryable());
        assert!(AggregationError::UpstreamUnavailable(SubFetchError::Status(503)).is_retryable());
        assert!(!AggregationError::UpstreamUnavailable(SubFetchError::Status(404)).is_retryable());
        assert!(Error::from(AggregationError::RateLimited { reset_at: None }).is_retryable());
    }
}
