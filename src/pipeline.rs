use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregation::AggregationEngine;
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::github::AuthContext;
use crate::metrics::{default_goals, goal_progress, language_share, topic_frequency, DashboardMetrics};
use crate::models::{
    ActivityEntry, Goal, GoalProgress, PartialFailure, Profile, RateLimitStatus, Snapshot,
    SnapshotStats,
};
use crate::storage::{SnapshotStore, Storage, StoredDashboard};
use crate::summary::{Summary, SummaryService};

const RECENT_ACTIVITY: usize = 20;

/// What the dashboard shows for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub profile: Profile,
    pub fetched_at: DateTime<Utc>,
    pub metrics: DashboardMetrics,
    pub summary: Summary,
    pub recent_activity: Vec<ActivityEntry>,
    pub goals: Vec<GoalProgress>,
    pub partial_failures: Vec<PartialFailure>,
    pub rate_limit: Option<RateLimitStatus>,
    /// Rendered from storage rather than a fresh fetch.
    pub cached: bool,
}

impl DashboardReport {
    pub fn from_snapshot(
        snapshot: Snapshot,
        metrics: DashboardMetrics,
        summary: Summary,
        goals: Vec<GoalProgress>,
    ) -> Self {
        let recent_activity = snapshot
            .events
            .iter()
            .take(RECENT_ACTIVITY)
            .map(ActivityEntry::from_event)
            .collect();

        Self {
            profile: snapshot.profile,
            fetched_at: snapshot.fetched_at,
            metrics,
            summary,
            recent_activity,
            goals,
            partial_failures: snapshot.partial_failures,
            rate_limit: snapshot.rate_limit,
            cached: false,
        }
    }

    /// Rebuilds what can be rebuilt from storage. Commits are not stored, so
    /// the contribution calendar is empty and totals come from the monthly
    /// buckets.
    pub fn from_stored(stored: StoredDashboard, config: &MetricsConfig) -> Self {
        let stats = SnapshotStats {
            total_commits: stored.monthly_activity.iter().map(|m| m.commits).sum(),
            total_prs: stored.monthly_activity.iter().map(|m| m.prs).sum(),
            total_issues: stored.monthly_activity.iter().map(|m| m.issues).sum(),
            total_stars: stored
                .repositories
                .iter()
                .map(|r| r.stargazers_count as u64)
                .sum(),
            total_repositories: stored.repositories.len() as u32,
        };

        let goals = if stored.goals.is_empty() {
            goal_progress(&stats, &default_goals())
        } else {
            goal_progress(&stats, &stored.goals)
        };

        let summary = match stored.summary {
            Some(summary) => summary,
            None => {
                let mut snapshot = Snapshot::empty(stored.profile.clone(), stored.updated_at);
                snapshot.repositories = stored.repositories.clone();
                Summary::local(&snapshot)
            }
        };

        Self {
            metrics: DashboardMetrics {
                stats,
                languages: language_share(&stored.repositories),
                topics: topic_frequency(&stored.repositories, config.topic_limit),
                monthly_activity: stored.monthly_activity,
                contribution_calendar: Vec::new(),
            },
            profile: stored.profile,
            fetched_at: stored.updated_at,
            summary,
            recent_activity: stored.recent_activity,
            goals,
            partial_failures: Vec::new(),
            rate_limit: None,
            cached: true,
        }
    }
}

/// One refresh: fetch, derive, store, summarize.
pub struct RefreshPipeline<S: SnapshotStore = Storage> {
    engine: AggregationEngine,
    summaries: SummaryService,
    storage: S,
    metrics: MetricsConfig,
    added_goals: Vec<Goal>,
}

impl<S: SnapshotStore> RefreshPipeline<S> {
    pub fn new(
        engine: AggregationEngine,
        summaries: SummaryService,
        storage: S,
        metrics: MetricsConfig,
    ) -> Self {
        Self {
            engine,
            summaries,
            storage,
            metrics,
            added_goals: Vec::new(),
        }
    }

    /// Goals added to the user's list on the next refresh. A goal with the
    /// name of an existing one replaces its target.
    pub fn with_goals(mut self, goals: Vec<Goal>) -> Self {
        self.added_goals = goals;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub async fn refresh(&self, auth: &AuthContext) -> Result<DashboardReport> {
        self.refresh_at(auth, Utc::now()).await
    }

    pub async fn refresh_at(&self, auth: &AuthContext, now: DateTime<Utc>) -> Result<DashboardReport> {
        // Step 1: only an auth or profile failure ends the refresh here
        let snapshot = self.engine.fetch_snapshot_at(auth, now).await?;
        let login = snapshot.profile.login.clone();

        // Step 2: derived metrics
        let metrics = DashboardMetrics::compute(&snapshot, &self.metrics, now);

        // Step 3: persist; a storage failure never fails the refresh
        self.persist(&snapshot, &metrics);

        // Step 4: goals against the fresh totals
        let goals = self.refresh_goals(&login, &metrics.stats);

        // Step 5: summary
        let summary = self.summaries.summarize(&snapshot).await;
        if let Err(e) = self.storage.save_summary(&login, &summary) {
            tracing::warn!("Failed to store summary for {}: {}", login, e);
        }

        tracing::info!(
            "Refresh for {} complete: {} commits, {} languages, {} partial failures",
            login,
            metrics.stats.total_commits,
            metrics.languages.len(),
            snapshot.partial_failures.len()
        );

        Ok(DashboardReport::from_snapshot(snapshot, metrics, summary, goals))
    }

    fn refresh_goals(&self, login: &str, stats: &SnapshotStats) -> Vec<GoalProgress> {
        let mut goals = match self.storage.list_goals(login) {
            Ok(goals) if !goals.is_empty() => goals,
            Ok(_) => default_goals(),
            Err(e) => {
                tracing::warn!("Failed to load goals for {}: {}", login, e);
                default_goals()
            }
        };

        for added in &self.added_goals {
            match goals.iter_mut().find(|g| g.name == added.name) {
                Some(existing) => existing.target = added.target,
                None => goals.push(added.clone()),
            }
        }

        let progress = goal_progress(stats, &goals);
        let refreshed: Vec<Goal> = progress.iter().map(GoalProgress::to_goal).collect();
        if let Err(e) = self.storage.replace_goals(login, &refreshed) {
            tracing::warn!("Failed to store goals for {}: {}", login, e);
        }
        progress
    }

    fn persist(&self, snapshot: &Snapshot, metrics: &DashboardMetrics) {
        let login = snapshot.profile.login.as_str();
        let year = snapshot.fetched_at.year();

        let results = [
            ("profile", self.storage.upsert_profile(&snapshot.profile)),
            (
                "repositories",
                self.storage.replace_repositories(login, &snapshot.repositories),
            ),
            (
                "activity logs",
                self.storage
                    .append_activity_logs(login, &snapshot.events)
                    .map(|inserted| tracing::debug!("Stored {} new events for {}", inserted, login)),
            ),
            (
                "monthly stats",
                self.storage
                    .replace_monthly_stats(login, year, &metrics.monthly_activity),
            ),
        ];

        for (what, result) in results {
            if let Err(e) = result {
                tracing::warn!("Failed to store {} for {}: {}", what, login, e);
            }
        }
    }
}
