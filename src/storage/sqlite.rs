use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::{ActivityEntry, Event, Goal, MonthlyActivity, Profile, Repository};
use crate::storage::SnapshotStore;
use crate::summary::{Summary, SummarySource};

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub struct Storage {
    conn: Connection,
}

/// Everything persisted for one user, enough to render a dashboard without
/// calling GitHub.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDashboard {
    pub profile: Profile,
    /// When the profile was last written.
    pub updated_at: DateTime<Utc>,
    pub repositories: Vec<Repository>,
    pub monthly_activity: Vec<MonthlyActivity>,
    pub summary: Option<Summary>,
    pub recent_activity: Vec<ActivityEntry>,
    pub goals: Vec<Goal>,
}

impl Storage {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let storage = Self { conn };
        storage.init_db()?;
        Ok(storage)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.init_db()?;
        Ok(storage)
    }

    fn init_db(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS user_profiles (
                login TEXT PRIMARY KEY,
                github_id INTEGER NOT NULL,
                name TEXT,
                public_repos INTEGER NOT NULL,
                followers INTEGER NOT NULL,
                data_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS repository_snapshots (
                id INTEGER PRIMARY KEY,
                login TEXT NOT NULL,
                repo_id INTEGER NOT NULL,
                full_name TEXT NOT NULL,
                language TEXT,
                stargazers_count INTEGER NOT NULL,
                updated_at TEXT NOT NULL,
                data_json TEXT NOT NULL,
                UNIQUE(login, repo_id)
            );

            CREATE TABLE IF NOT EXISTS monthly_stats (
                login TEXT NOT NULL,
                year INTEGER NOT NULL,
                month INTEGER NOT NULL,
                commits INTEGER NOT NULL,
                prs INTEGER NOT NULL,
                issues INTEGER NOT NULL,
                PRIMARY KEY(login, year, month)
            );

            CREATE TABLE IF NOT EXISTS activity_logs (
                login TEXT NOT NULL,
                event_id TEXT NOT NULL,
                event_type TEXT NOT NULL,
                repo_name TEXT NOT NULL,
                occurred_at TEXT NOT NULL,
                event_json TEXT NOT NULL,
                PRIMARY KEY(login, event_id)
            );

            CREATE TABLE IF NOT EXISTS ai_summaries (
                id INTEGER PRIMARY KEY,
                login TEXT NOT NULL,
                content TEXT NOT NULL,
                generation_type TEXT NOT NULL,
                model_version TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS user_goals (
                login TEXT NOT NULL,
                position INTEGER NOT NULL,
                goal_name TEXT NOT NULL,
                target_value INTEGER NOT NULL,
                current_value INTEGER NOT NULL,
                icon_name TEXT NOT NULL,
                is_completed INTEGER NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY(login, position)
            );

            CREATE INDEX IF NOT EXISTS idx_repository_snapshots_login ON repository_snapshots(login);
            CREATE INDEX IF NOT EXISTS idx_activity_logs_occurred ON activity_logs(login, occurred_at);
            CREATE INDEX IF NOT EXISTS idx_ai_summaries_login ON ai_summaries(login);
            "#,
        )?;

        Ok(())
    }

    pub fn get_profile(&self, login: &str) -> Result<Option<Profile>> {
        Ok(self.get_profile_row(login)?.map(|(profile, _)| profile))
    }

    fn get_profile_row(&self, login: &str) -> Result<Option<(Profile, DateTime<Utc>)>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT data_json, updated_at FROM user_profiles WHERE login = ?1",
                params![login],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((json, updated_at)) = row else {
            return Ok(None);
        };

        let profile = serde_json::from_str(&json)?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::ParseError(format!("invalid updated_at '{}': {}", updated_at, e)))?;
        Ok(Some((profile, updated_at)))
    }

    /// Most recently updated first.
    pub fn list_repositories(&self, login: &str) -> Result<Vec<Repository>> {
        let mut stmt = self.conn.prepare(
            "SELECT data_json FROM repository_snapshots WHERE login = ?1 ORDER BY updated_at DESC, id ASC",
        )?;

        let rows = stmt.query_map(params![login], |row| row.get::<_, String>(0))?;
        let mut repositories = Vec::new();
        for json in rows {
            repositories.push(serde_json::from_str(&json?)?);
        }
        Ok(repositories)
    }

    /// Oldest month first.
    pub fn monthly_stats(&self, login: &str) -> Result<Vec<MonthlyActivity>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT year, month, commits, prs, issues
            FROM monthly_stats
            WHERE login = ?1
            ORDER BY year ASC, month ASC
            "#,
        )?;

        let stats = stmt.query_map(params![login], |row| {
            let year: i32 = row.get(0)?;
            let month: u32 = row.get(1)?;
            Ok(MonthlyActivity {
                label: MONTH_LABELS
                    .get(month.saturating_sub(1) as usize)
                    .copied()
                    .unwrap_or("?")
                    .to_string(),
                year: Some(year),
                month,
                commits: row.get(2)?,
                prs: row.get(3)?,
                issues: row.get(4)?,
            })
        })?;

        stats.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn latest_summary(&self, login: &str) -> Result<Option<Summary>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT content, generation_type, model_version
                FROM ai_summaries
                WHERE login = ?1
                ORDER BY id DESC
                LIMIT 1
                "#,
                params![login],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((content, generation_type, model)) => {
                let source: SummarySource = generation_type.parse().map_err(Error::ParseError)?;
                Ok(Some(Summary {
                    content,
                    source,
                    model,
                }))
            }
            None => Ok(None),
        }
    }

    pub fn activity_log_count(&self, login: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM activity_logs WHERE login = ?1",
            params![login],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Newest first.
    pub fn recent_activity(&self, login: &str, limit: usize) -> Result<Vec<ActivityEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT event_json FROM activity_logs
            WHERE login = ?1
            ORDER BY occurred_at DESC, event_id DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![login, limit as i64], |row| row.get::<_, String>(0))?;
        let mut entries = Vec::new();
        for json in rows {
            let event: Event = serde_json::from_str(&json?)?;
            entries.push(ActivityEntry::from_event(&event));
        }
        Ok(entries)
    }

    pub fn load_dashboard(&self, login: &str) -> Result<Option<StoredDashboard>> {
        let Some((profile, updated_at)) = self.get_profile_row(login)? else {
            return Ok(None);
        };

        Ok(Some(StoredDashboard {
            repositories: self.list_repositories(login)?,
            monthly_activity: self.monthly_stats(login)?,
            summary: self.latest_summary(login)?,
            recent_activity: self.recent_activity(login, 20)?,
            goals: self.list_goals(login)?,
            profile,
            updated_at,
        }))
    }

    pub fn list_logins(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT login FROM user_profiles ORDER BY updated_at DESC")?;

        let logins = stmt.query_map([], |row| row.get(0))?;
        logins.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl SnapshotStore for Storage {
    fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        let data_json = serde_json::to_string(profile)?;
        self.conn.execute(
            r#"
            INSERT INTO user_profiles (login, github_id, name, public_repos, followers, data_json, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(login) DO UPDATE SET
                github_id = excluded.github_id,
                name = excluded.name,
                public_repos = excluded.public_repos,
                followers = excluded.followers,
                data_json = excluded.data_json,
                updated_at = excluded.updated_at
            "#,
            params![
                profile.login,
                profile.id as i64,
                profile.name,
                profile.public_repos,
                profile.followers,
                data_json,
                timestamp(),
            ],
        )?;

        Ok(())
    }

    fn replace_repositories(&self, login: &str, repositories: &[Repository]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "DELETE FROM repository_snapshots WHERE login = ?1",
            params![login],
        )?;

        for repo in repositories {
            let data_json = serde_json::to_string(repo)?;
            tx.execute(
                r#"
                INSERT OR REPLACE INTO repository_snapshots
                    (login, repo_id, full_name, language, stargazers_count, updated_at, data_json)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    login,
                    repo.id as i64,
                    repo.full_name,
                    repo.language,
                    repo.stargazers_count,
                    repo.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                    data_json,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn append_activity_logs(&self, login: &str, events: &[Event]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;

        for event in events {
            let event_json = serde_json::to_string(event)?;
            inserted += tx.execute(
                r#"
                INSERT OR IGNORE INTO activity_logs
                    (login, event_id, event_type, repo_name, occurred_at, event_json)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    login,
                    event.id,
                    event.payload.event_type(),
                    event.repo.name,
                    event.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                    event_json,
                ],
            )?;
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn replace_monthly_stats(&self, login: &str, year: i32, stats: &[MonthlyActivity]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute("DELETE FROM monthly_stats WHERE login = ?1", params![login])?;

        for bucket in stats {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO monthly_stats (login, year, month, commits, prs, issues)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    login,
                    bucket.year.unwrap_or(year),
                    bucket.month,
                    bucket.commits,
                    bucket.prs,
                    bucket.issues,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn list_goals(&self, login: &str) -> Result<Vec<Goal>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT goal_name, target_value, current_value, icon_name
            FROM user_goals
            WHERE login = ?1
            ORDER BY position ASC
            "#,
        )?;

        let goals = stmt.query_map(params![login], |row| {
            Ok(Goal {
                name: row.get(0)?,
                target: row.get(1)?,
                current: row.get(2)?,
                icon: row.get(3)?,
            })
        })?;

        goals.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn replace_goals(&self, login: &str, goals: &[Goal]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute("DELETE FROM user_goals WHERE login = ?1", params![login])?;

        let updated_at = timestamp();
        for (position, goal) in goals.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO user_goals
                    (login, position, goal_name, target_value, current_value, icon_name, is_completed, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    login,
                    position as i64,
                    goal.name,
                    goal.target,
                    goal.current,
                    goal.icon,
                    goal.current >= goal.target,
                    updated_at,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn save_summary(&self, login: &str, summary: &Summary) -> Result<()> {
        // Saving the latest summary again must not grow the history.
        if self.latest_summary(login)?.as_ref() == Some(summary) {
            return Ok(());
        }

        self.conn.execute(
            r#"
            INSERT INTO ai_summaries (login, content, generation_type, model_version, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                login,
                summary.content,
                summary.source.as_str(),
                summary.model,
                timestamp(),
            ],
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::{at, profile, repo};
    use crate::metrics::{monthly_activity, MonthBucketing};
    use crate::models::Snapshot;
    use serde_json::json;

    fn event(id: &str, created_at: &str) -> Event {
        serde_json::from_value(json!({
            "id": id, "type": "PushEvent", "actor": {"id": 1, "login": "octocat"},
            "repo": {"id": 1, "name": "octocat/repo-1"},
            "payload": {"size": 1, "commits": []},
            "created_at": created_at
        }))
        .unwrap()
    }

    #[test]
    fn test_profile_upsert() {
        let storage = Storage::in_memory().unwrap();
        let mut profile = profile();

        storage.upsert_profile(&profile).unwrap();
        profile.followers = 99;
        storage.upsert_profile(&profile).unwrap();

        assert_eq!(storage.get_profile("octocat").unwrap(), Some(profile));
        assert_eq!(storage.list_logins().unwrap(), vec!["octocat"]);
        assert!(storage.get_profile("nobody").unwrap().is_none());
    }

    #[test]
    fn test_repositories_are_replaced() {
        let storage = Storage::in_memory().unwrap();
        let first = vec![repo(1, Some("Rust"), &[]), repo(2, Some("Go"), &[])];
        let second = vec![repo(3, Some("C"), &["kernel"])];

        storage.replace_repositories("octocat", &first).unwrap();
        storage.replace_repositories("octocat", &first).unwrap();
        assert_eq!(storage.list_repositories("octocat").unwrap().len(), 2);

        storage.replace_repositories("octocat", &second).unwrap();
        assert_eq!(storage.list_repositories("octocat").unwrap(), second);
    }

    #[test]
    fn test_activity_logs_insert_once() {
        let storage = Storage::in_memory().unwrap();
        let events = vec![
            event("1", "2024-03-01T00:00:00Z"),
            event("2", "2024-03-02T00:00:00Z"),
        ];

        assert_eq!(storage.append_activity_logs("octocat", &events).unwrap(), 2);
        assert_eq!(storage.append_activity_logs("octocat", &events).unwrap(), 0);
        assert_eq!(storage.activity_log_count("octocat").unwrap(), 2);

        let recent = storage.recent_activity("octocat", 10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].description, "Pushed 1 commit to repo-1");
        assert!(recent[0].occurred_at > recent[1].occurred_at);
    }

    #[test]
    fn test_monthly_stats_replace() {
        let storage = Storage::in_memory().unwrap();
        let snapshot = Snapshot::empty(profile(), at(2024, 3, 10));
        let buckets = monthly_activity(&snapshot, at(2024, 3, 10), MonthBucketing::YearMonth);

        storage.replace_monthly_stats("octocat", 2024, &buckets).unwrap();
        storage.replace_monthly_stats("octocat", 2024, &buckets).unwrap();

        let stored = storage.monthly_stats("octocat").unwrap();
        assert_eq!(stored, buckets);
    }

    #[test]
    fn test_month_of_year_buckets_use_given_year() {
        let storage = Storage::in_memory().unwrap();
        let snapshot = Snapshot::empty(profile(), at(2024, 3, 10));
        let buckets = monthly_activity(&snapshot, at(2024, 3, 10), MonthBucketing::MonthOfYear);

        storage.replace_monthly_stats("octocat", 2024, &buckets).unwrap();

        let stored = storage.monthly_stats("octocat").unwrap();
        assert_eq!(stored.len(), 12);
        assert!(stored.iter().all(|b| b.year == Some(2024)));
        assert_eq!(stored[0].label, "Jan");
    }

    #[test]
    fn test_summary_history() {
        let storage = Storage::in_memory().unwrap();
        assert!(storage.latest_summary("octocat").unwrap().is_none());

        let local = Summary {
            content: "Local text.".to_string(),
            source: SummarySource::Local,
            model: None,
        };
        let generated = Summary {
            content: "Generated text.".to_string(),
            source: SummarySource::Generated,
            model: Some("gemini-2.5-flash-lite".to_string()),
        };

        storage.save_summary("octocat", &local).unwrap();
        storage.save_summary("octocat", &local).unwrap();
        let rows: i64 = storage
            .conn
            .query_row("SELECT COUNT(*) FROM ai_summaries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);

        storage.save_summary("octocat", &generated).unwrap();
        assert_eq!(storage.latest_summary("octocat").unwrap(), Some(generated));
    }

    #[test]
    fn test_goals_are_replaced_in_order() {
        let storage = Storage::in_memory().unwrap();
        assert!(storage.list_goals("octocat").unwrap().is_empty());

        let mut stars = Goal::new("GitHub Stars", 100, "Star");
        stars.current = 150;
        let goals = vec![Goal::new("Commit Contributions", 500, "Heart"), stars];

        storage.replace_goals("octocat", &goals).unwrap();
        storage.replace_goals("octocat", &goals).unwrap();
        assert_eq!(storage.list_goals("octocat").unwrap(), goals);

        let completed: i64 = storage
            .conn
            .query_row(
                "SELECT SUM(is_completed) FROM user_goals WHERE login = 'octocat'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(completed, 1);

        storage
            .replace_goals("octocat", &[Goal::new("Code Reviews", 50, "CheckCircle2")])
            .unwrap();
        assert_eq!(storage.list_goals("octocat").unwrap().len(), 1);
        assert!(storage.list_goals("someone-else").unwrap().is_empty());
    }

    #[test]
    fn test_load_dashboard() {
        let storage = Storage::in_memory().unwrap();
        assert!(storage.load_dashboard("octocat").unwrap().is_none());

        storage.upsert_profile(&profile()).unwrap();
        storage
            .replace_repositories("octocat", &[repo(1, Some("Rust"), &[])])
            .unwrap();
        storage
            .append_activity_logs("octocat", &[event("1", "2024-03-01T00:00:00Z")])
            .unwrap();

        let dashboard = storage.load_dashboard("octocat").unwrap().unwrap();
        assert_eq!(dashboard.profile.login, "octocat");
        assert_eq!(dashboard.repositories.len(), 1);
        assert!(dashboard.monthly_activity.is_empty());
        assert!(dashboard.summary.is_none());
        assert_eq!(dashboard.recent_activity.len(), 1);
        assert!(dashboard.goals.is_empty());
    }
}
