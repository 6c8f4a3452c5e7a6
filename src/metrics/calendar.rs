use chrono::{Days, NaiveDate};

use crate::models::{ContributionDay, Snapshot};

/// Commits per UTC day over the `window_days` days ending at `today`,
/// oldest first. Every day is present, including days without commits.
pub fn contribution_calendar(
    snapshot: &Snapshot,
    window_days: u32,
    today: NaiveDate,
) -> Vec<ContributionDay> {
    if window_days == 0 {
        return Vec::new();
    }

    let Some(start) = today.checked_sub_days(Days::new(u64::from(window_days - 1))) else {
        return Vec::new();
    };

    let mut days: Vec<ContributionDay> = start
        .iter_days()
        .take(window_days as usize)
        .map(|date| ContributionDay { date, count: 0 })
        .collect();

    for commit in &snapshot.commits {
        let date = commit.authored_at.date_naive();
        if date < start || date > today {
            continue;
        }
        let offset = (date - start).num_days() as usize;
        if let Some(day) = days.get_mut(offset) {
            day.count += 1;
        }
    }

    days
}
