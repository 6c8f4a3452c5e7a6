use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};

use crate::metrics::MonthBucketing;
use crate::models::{MonthlyActivity, Snapshot, SubFetch};

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Twelve buckets of commits, opened pull requests and opened issues.
///
/// Pull request and issue counts come from the search results. When a search
/// failed during the cycle, the counts for that category are taken from the
/// `opened` events in the activity feed instead, which only reach back a few
/// hundred events.
pub fn monthly_activity(
    snapshot: &Snapshot,
    as_of: DateTime<Utc>,
    bucketing: MonthBucketing,
) -> Vec<MonthlyActivity> {
    let window = Window::new(as_of, bucketing);
    let mut buckets = window.empty_buckets();

    for commit in &snapshot.commits {
        if let Some(i) = window.slot(commit.authored_at) {
            buckets[i].commits += 1;
        }
    }

    if snapshot.failed(&SubFetch::PullRequestSearch) {
        for event in snapshot.events.iter().filter(|e| e.opened_pull_request()) {
            if let Some(i) = window.slot(event.created_at) {
                buckets[i].prs += 1;
            }
        }
    } else {
        for pr in &snapshot.pull_requests {
            if let Some(i) = window.slot(pr.created_at) {
                buckets[i].prs += 1;
            }
        }
    }

    if snapshot.failed(&SubFetch::IssueSearch) {
        for event in snapshot.events.iter().filter(|e| e.opened_issue()) {
            if let Some(i) = window.slot(event.created_at) {
                buckets[i].issues += 1;
            }
        }
    } else {
        for issue in snapshot.issues.iter().filter(|i| !i.is_pull_request()) {
            if let Some(i) = window.slot(issue.created_at) {
                buckets[i].issues += 1;
            }
        }
    }

    buckets
}

/// Midnight UTC on the first day of the oldest year-month bucket: the first
/// of the month eleven months before `as_of`. Commits are fetched from here,
/// so every fetched commit lands in a bucket under either bucketing.
pub fn lookback_start(as_of: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(as_of.year(), as_of.month(), 1)
        .and_then(|first| first.checked_sub_months(Months::new(11)))
        .and_then(|start| start.and_hms_opt(0, 0, 0))
        .map(|start| start.and_utc())
        .unwrap_or_else(|| as_of - Duration::days(365))
}

struct Window {
    bucketing: MonthBucketing,
    as_of: DateTime<Utc>,
    /// Absolute month index (`year * 12 + month0`) of the oldest bucket.
    first_month: i32,
    trailing_year_start: DateTime<Utc>,
}

impl Window {
    fn new(as_of: DateTime<Utc>, bucketing: MonthBucketing) -> Self {
        Self {
            bucketing,
            as_of,
            first_month: month_index(lookback_start(as_of)),
            trailing_year_start: as_of
                .checked_sub_months(Months::new(12))
                .unwrap_or(as_of),
        }
    }

    fn empty_buckets(&self) -> Vec<MonthlyActivity> {
        (0..12)
            .map(|i| match self.bucketing {
                MonthBucketing::YearMonth => {
                    let index = self.first_month + i;
                    let month0 = index.rem_euclid(12) as usize;
                    MonthlyActivity {
                        label: MONTH_LABELS[month0].to_string(),
                        year: Some(index.div_euclid(12)),
                        month: month0 as u32 + 1,
                        commits: 0,
                        prs: 0,
                        issues: 0,
                    }
                }
                MonthBucketing::MonthOfYear => MonthlyActivity {
                    label: MONTH_LABELS[i as usize].to_string(),
                    year: None,
                    month: i as u32 + 1,
                    commits: 0,
                    prs: 0,
                    issues: 0,
                },
            })
            .collect()
    }

    fn slot(&self, at: DateTime<Utc>) -> Option<usize> {
        match self.bucketing {
            MonthBucketing::YearMonth => {
                let offset = month_index(at) - self.first_month;
                (0..12).contains(&offset).then_some(offset as usize)
            }
            MonthBucketing::MonthOfYear => (at > self.trailing_year_start && at <= self.as_of)
                .then_some(at.month0() as usize),
        }
    }
}

fn month_index(at: DateTime<Utc>) -> i32 {
    at.year() * 12 + at.month0() as i32
}
