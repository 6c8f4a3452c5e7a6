use std::collections::HashMap;

use crate::models::{LanguageShare, Repository};

pub const DEFAULT_LANGUAGE_COLOR: &str = "#6e7781";

const LANGUAGE_COLORS: &[(&str, &str)] = &[
    ("JavaScript", "#f7df1e"),
    ("TypeScript", "#3178c6"),
    ("Python", "#3572A5"),
    ("Java", "#b07219"),
    ("C#", "#178600"),
    ("Go", "#00ADD8"),
    ("Ruby", "#701516"),
    ("PHP", "#4F5D95"),
    ("HTML", "#e34c26"),
    ("CSS", "#563d7c"),
    ("Dart", "#00B4AB"),
    ("Swift", "#F05138"),
    ("Kotlin", "#A97BFF"),
    ("Rust", "#DEA584"),
    ("C", "#555555"),
    ("C++", "#f34b7d"),
    ("Shell", "#89e051"),
    ("Vue", "#41B883"),
    ("Jupyter Notebook", "#DA5B0B"),
];

/// Display color for a language as GitHub names it.
pub fn language_color(name: &str) -> &'static str {
    LANGUAGE_COLORS
        .iter()
        .find(|(language, _)| *language == name)
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_LANGUAGE_COLOR)
}

/// Share of non-fork repositories per primary language, largest first.
///
/// Percentages are rounded individually, so they may not add up to exactly
/// 100. Ordered by repository count; languages with equal counts keep the
/// order they were first seen in.
pub fn language_share(repositories: &[Repository]) -> Vec<LanguageShare> {
    let mut counts: Vec<(&str, u32)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for language in repositories
        .iter()
        .filter(|r| !r.fork)
        .filter_map(|r| r.language.as_deref())
    {
        match positions.get(language) {
            Some(&i) => counts[i].1 += 1,
            None => {
                positions.insert(language, counts.len());
                counts.push((language, 1));
            }
        }
    }

    let total: u32 = counts.iter().map(|(_, count)| count).sum();
    if total == 0 {
        return Vec::new();
    }

    // Rounded percentages can tie where the counts don't.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .map(|(name, count)| LanguageShare {
            name: name.to_string(),
            percent: (f64::from(count) * 100.0 / f64::from(total)).round() as u32,
            color: language_color(name).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::repo;

    #[test]
    fn test_two_to_one_split() {
        let repos = vec![
            repo(1, Some("TypeScript"), &[]),
            repo(2, Some("TypeScript"), &[]),
            repo(3, Some("Go"), &[]),
        ];

        let shares = language_share(&repos);

        assert_eq!(shares.len(), 2);
        assert_eq!((shares[0].name.as_str(), shares[0].percent), ("TypeScript", 67));
        assert_eq!((shares[1].name.as_str(), shares[1].percent), ("Go", 33));
        assert_eq!(shares[0].color, "#3178c6");
    }

    #[test]
    fn test_no_repositories() {
        assert!(language_share(&[]).is_empty());
        assert!(language_share(&[repo(1, None, &[])]).is_empty());
    }

    #[test]
    fn test_forks_and_unknown_colors() {
        let mut fork = repo(1, Some("Python"), &[]);
        fork.fork = true;
        let repos = vec![fork, repo(2, Some("Zig"), &[]), repo(3, None, &[])];

        let shares = language_share(&repos);

        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].name, "Zig");
        assert_eq!(shares[0].percent, 100);
        assert_eq!(shares[0].color, DEFAULT_LANGUAGE_COLOR);
    }

    #[test]
    fn test_order_follows_counts_when_percentages_round_equal() {
        let mut repos: Vec<_> = (1..=997).map(|i| repo(i, Some("Rust"), &[])).collect();
        repos.push(repo(998, Some("Go"), &[]));
        repos.push(repo(999, Some("Zig"), &[]));
        repos.push(repo(1000, Some("Zig"), &[]));

        let shares = language_share(&repos);

        let names: Vec<_> = shares.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Rust", "Zig", "Go"]);
        assert_eq!(shares[1].percent, 0);
        assert_eq!(shares[2].percent, 0);
    }

    #[test]
    fn test_ties_keep_first_seen_order_and_sum_close_to_100() {
        let repos = vec![
            repo(1, Some("Rust"), &[]),
            repo(2, Some("Go"), &[]),
            repo(3, Some("C"), &[]),
        ];

        let shares = language_share(&repos);

        let names: Vec<_> = shares.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Rust", "Go", "C"]);
        let sum: u32 = shares.iter().map(|s| s.percent).sum();
        assert!(sum.abs_diff(100) <= shares.len() as u32);
    }
}
