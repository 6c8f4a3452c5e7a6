use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::github::client::ResponseMeta;
use crate::models::RateLimitStatus;

/// The separately metered GitHub budgets the engine draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitResource {
    /// REST calls, 5000 an hour for a user token.
    Core,
    /// `/search/*`, 30 a minute.
    Search,
}

impl RateLimitResource {
    /// Maps `x-ratelimit-resource`. A missing header is the core budget;
    /// budgets the engine never uses (graphql, code_search, ...) give `None`.
    pub fn from_header(value: Option<&str>) -> Option<Self> {
        match value.map(str::trim) {
            None | Some("core") => Some(RateLimitResource::Core),
            Some("search") => Some(RateLimitResource::Search),
            Some(_) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitResource::Core => "core",
            RateLimitResource::Search => "search",
        }
    }
}

impl fmt::Display for RateLimitResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Remembers the most recent `x-ratelimit-*` headers GitHub sent, per budget.
///
/// The tracker never sleeps or retries. Once a budget is reported as spent
/// the engine stops issuing optional requests against it for the rest of the
/// cycle.
pub struct RateLimitTracker {
    state: Mutex<HashMap<RateLimitResource, RateLimitStatus>>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RateLimitResource, RateLimitStatus>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn update_from_meta(&self, meta: &ResponseMeta) {
        let Some(remaining) = meta.rate_limit_remaining else {
            return;
        };
        let Some(resource) = RateLimitResource::from_header(meta.rate_limit_resource.as_deref())
        else {
            tracing::debug!(
                "Ignoring rate limit headers for {:?}",
                meta.rate_limit_resource
            );
            return;
        };

        let reset_at = meta
            .rate_limit_reset
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        self.lock().insert(
            resource,
            RateLimitStatus {
                limit: meta.rate_limit_limit,
                remaining,
                reset_at,
            },
        );

        if remaining == 0 {
            tracing::warn!(
                "GitHub {} rate limit exhausted, resets at {:?}",
                resource,
                reset_at
            );
        }
    }

    /// The core budget, which is what "requests remaining" means to a user.
    pub fn status(&self) -> Option<RateLimitStatus> {
        self.status_for(RateLimitResource::Core)
    }

    pub fn status_for(&self, resource: RateLimitResource) -> Option<RateLimitStatus> {
        self.lock().get(&resource).copied()
    }

    pub fn is_exhausted(&self, resource: RateLimitResource, now: DateTime<Utc>) -> bool {
        match self.status_for(resource) {
            Some(status) => {
                status.remaining == 0 && status.reset_at.map_or(true, |reset| reset > now)
            }
            None => false,
        }
    }
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta(remaining: Option<u32>, reset: Option<i64>) -> ResponseMeta {
        ResponseMeta {
            rate_limit_remaining: remaining,
            rate_limit_limit: Some(5000),
            rate_limit_reset: reset,
            ..Default::default()
        }
    }

    fn search_meta(remaining: u32) -> ResponseMeta {
        ResponseMeta {
            rate_limit_remaining: Some(remaining),
            rate_limit_limit: Some(30),
            rate_limit_reset: Some(1_700_000_000),
            rate_limit_resource: Some("search".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_tracks_latest_headers() {
        let tracker = RateLimitTracker::new();
        assert!(tracker.status().is_none());

        tracker.update_from_meta(&meta(Some(42), Some(1_700_000_000)));
        let status = tracker.status().unwrap();
        assert_eq!(status.remaining, 42);
        assert_eq!(status.limit, Some(5000));
        assert_eq!(status.reset_at, Utc.timestamp_opt(1_700_000_000, 0).single());

        // Responses without rate limit headers leave the state alone.
        tracker.update_from_meta(&meta(None, None));
        assert_eq!(tracker.status().unwrap().remaining, 42);
    }

    #[test]
    fn test_exhaustion_ends_at_reset() {
        let tracker = RateLimitTracker::new();
        tracker.update_from_meta(&meta(Some(0), Some(1_700_000_000)));

        let before = Utc.timestamp_opt(1_699_999_000, 0).unwrap();
        let after = Utc.timestamp_opt(1_700_000_100, 0).unwrap();
        assert!(tracker.is_exhausted(RateLimitResource::Core, before));
        assert!(!tracker.is_exhausted(RateLimitResource::Core, after));
    }

    #[test]
    fn test_budgets_are_tracked_separately() {
        let tracker = RateLimitTracker::new();
        let now = Utc.timestamp_opt(1_699_999_000, 0).unwrap();

        tracker.update_from_meta(&meta(Some(4000), Some(1_700_000_000)));
        tracker.update_from_meta(&search_meta(0));

        assert!(tracker.is_exhausted(RateLimitResource::Search, now));
        assert!(!tracker.is_exhausted(RateLimitResource::Core, now));
        assert_eq!(tracker.status().unwrap().remaining, 4000);
        assert_eq!(
            tracker.status_for(RateLimitResource::Search).unwrap().limit,
            Some(30)
        );
    }

    #[test]
    fn test_untracked_budget_is_ignored() {
        let tracker = RateLimitTracker::new();
        tracker.update_from_meta(&ResponseMeta {
            rate_limit_remaining: Some(0),
            rate_limit_resource: Some("graphql".to_string()),
            ..Default::default()
        });

        assert!(tracker.status().is_none());
        assert!(tracker.status_for(RateLimitResource::Search).is_none());
    }
}
