use crate::models::{Goal, GoalProgress, SnapshotStats};

pub const COMMIT_GOAL: &str = "Commit Contributions";
pub const REPOSITORY_GOAL: &str = "Public Repositories";
pub const STAR_GOAL: &str = "GitHub Stars";
pub const REVIEW_GOAL: &str = "Code Reviews";

/// What a user starts with before saving goals of their own.
pub fn default_goals() -> Vec<Goal> {
    vec![
        Goal::new(COMMIT_GOAL, 500, "Heart"),
        Goal::new(REPOSITORY_GOAL, 20, "BookMarked"),
        Goal::new(STAR_GOAL, 100, "Star"),
        Goal::new(REVIEW_GOAL, 50, "CheckCircle2"),
    ]
}

/// Progress of each goal, in order. Goals named after a GitHub total take
/// their value from `stats`; the rest keep their stored value.
pub fn goal_progress(stats: &SnapshotStats, goals: &[Goal]) -> Vec<GoalProgress> {
    goals
        .iter()
        .map(|goal| {
            let current = tracked_value(stats, &goal.name).unwrap_or(goal.current);
            GoalProgress {
                name: goal.name.clone(),
                icon: goal.icon.clone(),
                current,
                target: goal.target,
                percent: percent(current, goal.target),
                completed: current >= goal.target,
            }
        })
        .collect()
}

fn tracked_value(stats: &SnapshotStats, name: &str) -> Option<u32> {
    match name {
        COMMIT_GOAL => Some(stats.total_commits),
        REPOSITORY_GOAL => Some(stats.total_repositories),
        STAR_GOAL => Some(u32::try_from(stats.total_stars).unwrap_or(u32::MAX)),
        _ => None,
    }
}

fn percent(current: u32, target: u32) -> u32 {
    if target == 0 {
        return 100;
    }
    let percent = (f64::from(current) * 100.0 / f64::from(target)).round();
    percent.min(100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> SnapshotStats {
        SnapshotStats {
            total_commits: 125,
            total_prs: 4,
            total_issues: 2,
            total_stars: 150,
            total_repositories: 7,
        }
    }

    #[test]
    fn test_defaults_track_github_totals() {
        let progress = goal_progress(&stats(), &default_goals());

        assert_eq!(progress.len(), 4);
        assert_eq!((progress[0].current, progress[0].percent), (125, 25));
        assert!(!progress[0].completed);
        assert_eq!((progress[1].current, progress[1].percent), (7, 35));
        // Over target is capped, not 150%.
        assert_eq!((progress[2].current, progress[2].percent), (150, 100));
        assert!(progress[2].completed);
        assert_eq!(progress[3].name, REVIEW_GOAL);
        assert_eq!(progress[3].current, 0);
    }

    #[test]
    fn test_custom_goal_keeps_stored_value() {
        let mut talks = Goal::new("Conference Talks", 3, "Trophy");
        talks.current = 2;

        let progress = goal_progress(&stats(), &[talks]);

        assert_eq!(progress[0].current, 2);
        assert_eq!(progress[0].percent, 67);
        assert_eq!(progress[0].to_goal().current, 2);
    }

    #[test]
    fn test_zero_target_is_complete() {
        let progress = goal_progress(&SnapshotStats::default(), &[Goal::new("Anything", 0, "Trophy")]);
        assert_eq!(progress[0].percent, 100);
        assert!(progress[0].completed);
    }
}
