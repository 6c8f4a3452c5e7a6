use std::collections::HashMap;

use crate::metrics::top_topics;
use crate::models::Snapshot;

/// Writes a summary from the snapshot alone.
///
/// Always returns at least one complete sentence, even for an account with
/// no repositories and no activity.
pub fn local_summary(snapshot: &Snapshot) -> String {
    let profile = &snapshot.profile;
    let login = profile.login.as_str();

    let repo_count = if profile.public_repos > 0 {
        profile.public_repos as usize
    } else {
        snapshot.repositories.len()
    };
    let commits = snapshot.commits.len();
    let stars = snapshot.total_stars();
    let languages = top_languages(snapshot, 3);
    let topics = top_topics(&snapshot.repositories, 5);

    let mut sentences = Vec::new();

    sentences.push(format!(
        "{} is a {} developer with {} public {} on GitHub.",
        profile.display_name(),
        if repo_count > 10 { "prolific" } else { "dedicated" },
        repo_count,
        if repo_count == 1 { "repository" } else { "repositories" }
    ));

    if !languages.is_empty() {
        sentences.push(format!(
            "Proficient in {}, {} demonstrates versatility across multiple programming languages.",
            languages.join(", "),
            login
        ));
    }

    if commits > 0 {
        sentences.push(format!(
            "With {} contributions in recent months, {} shows consistent engagement with the development community.",
            commits, login
        ));
    }

    if stars > 0 {
        sentences.push(format!(
            "Their work has garnered {} {}, indicating community appreciation and code quality.",
            stars,
            if stars == 1 { "star" } else { "stars" }
        ));
    }

    if !topics.is_empty() {
        let named: Vec<&str> = topics.iter().take(3).map(String::as_str).collect();
        sentences.push(format!("Areas of expertise include {}.", named.join(", ")));
    }

    if let Some(bio) = profile.bio.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
        sentences.push(bio.to_string());
    }

    sentences.join(" ")
}

/// Most used primary languages across all repositories, ties in first-seen
/// order.
fn top_languages(snapshot: &Snapshot, limit: usize) -> Vec<&str> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for language in snapshot.repositories.iter().filter_map(|r| r.language.as_deref()) {
        match positions.get(language) {
            Some(&i) => counts[i].1 += 1,
            None => {
                positions.insert(language, counts.len());
                counts.push((language, 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(limit).map(|(name, _)| name).collect()
}
