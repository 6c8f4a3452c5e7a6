use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::event::Event;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyActivity {
    /// Short month name, e.g. `Mar`.
    pub label: String,
    /// Absent when buckets merge the same month across years.
    pub year: Option<i32>,
    /// 1 through 12.
    pub month: u32,
    pub commits: u32,
    pub prs: u32,
    pub issues: u32,
}

impl MonthlyActivity {
    pub fn total(&self) -> u32 {
        self.commits + self.prs + self.issues
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionDay {
    pub date: NaiveDate,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageShare {
    pub name: String,
    pub percent: u32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCount {
    pub topic: String,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub total_commits: u32,
    pub total_prs: u32,
    pub total_issues: u32,
    pub total_stars: u64,
    #[serde(default)]
    pub total_repositories: u32,
}

/// One line of the recent-activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub occurred_at: DateTime<Utc>,
    pub event_type: String,
    pub repository: String,
    pub description: String,
}

impl ActivityEntry {
    pub fn from_event(event: &Event) -> Self {
        Self {
            occurred_at: event.created_at,
            event_type: event.payload.event_type().to_string(),
            repository: event.repo.name.clone(),
            description: event.describe(),
        }
    }
}

/// A personal target. `current` is the last value seen, which is all a goal
/// not tied to a GitHub total ever has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub name: String,
    pub target: u32,
    #[serde(default)]
    pub current: u32,
    /// Icon name for the dashboard, e.g. `Star`.
    pub icon: String,
}

impl Goal {
    pub fn new(name: impl Into<String>, target: u32, icon: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target,
            current: 0,
            icon: icon.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub name: String,
    pub icon: String,
    pub current: u32,
    pub target: u32,
    /// Rounded, at most 100.
    pub percent: u32,
    pub completed: bool,
}

impl GoalProgress {
    /// The goal with its current value brought up to date.
    pub fn to_goal(&self) -> Goal {
        Goal {
            name: self.name.clone(),
            target: self.target,
            current: self.current,
            icon: self.icon.clone(),
        }
    }
}
