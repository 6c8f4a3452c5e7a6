pub mod sqlite;

use crate::error::Result;
use crate::models::{Event, Goal, MonthlyActivity, Profile, Repository};
use crate::summary::Summary;

pub use sqlite::{Storage, StoredDashboard};

/// Where refresh results are written. Every operation may be repeated with
/// the same input without changing the stored state.
pub trait SnapshotStore {
    fn upsert_profile(&self, profile: &Profile) -> Result<()>;

    /// Replaces the stored repository list of `login` wholesale.
    fn replace_repositories(&self, login: &str, repositories: &[Repository]) -> Result<()>;

    /// Records events not seen before and returns how many were new.
    fn append_activity_logs(&self, login: &str, events: &[Event]) -> Result<usize>;

    /// Replaces the monthly buckets of `login`. A bucket's own year takes
    /// precedence over `year`.
    fn replace_monthly_stats(&self, login: &str, year: i32, stats: &[MonthlyActivity]) -> Result<()>;

    /// In the order they were saved; empty when none were.
    fn list_goals(&self, login: &str) -> Result<Vec<Goal>>;

    /// Replaces the goals of `login`, keeping their order.
    fn replace_goals(&self, login: &str, goals: &[Goal]) -> Result<()>;

    fn save_summary(&self, login: &str, summary: &Summary) -> Result<()>;
}
