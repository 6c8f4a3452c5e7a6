use crate::models::Snapshot;

const MAX_LANGUAGES: usize = 5;
const MAX_TOPICS: usize = 10;

pub const SUMMARY_INSTRUCTIONS: &str = "Create a concise, professional summary highlighting their expertise and contributions. \
Focus on their technical skills and development activity. \
Return only the summary text without any additional formatting or explanations.";

/// The facts about a developer handed to a text generator.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    pub display_name: String,
    pub repository_count: usize,
    pub total_stars: u64,
    pub recent_commits: usize,
    pub languages: Vec<String>,
    pub topics: Vec<String>,
    pub bio: Option<String>,
}

impl SummaryRequest {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let languages = distinct(
            snapshot
                .repositories
                .iter()
                .filter_map(|r| r.language.as_deref()),
            MAX_LANGUAGES,
        );
        let topics = distinct(
            snapshot
                .repositories
                .iter()
                .flat_map(|r| r.topics.iter().map(String::as_str)),
            MAX_TOPICS,
        );

        Self {
            display_name: snapshot.profile.display_name().to_string(),
            repository_count: snapshot.repositories.len(),
            total_stars: snapshot.total_stars(),
            recent_commits: snapshot.commits.len(),
            languages,
            topics,
            bio: snapshot
                .profile
                .bio
                .as_deref()
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(str::to_string),
        }
    }

    pub fn to_prompt(&self) -> String {
        let mut prompt = format!(
            "Generate a professional 3-4 sentence developer summary for {}.\n\n",
            self.display_name
        );

        prompt.push_str("GitHub Stats:\n");
        prompt.push_str(&format!("- Public Repositories: {}\n", self.repository_count));
        prompt.push_str(&format!("- Total Stars: {}\n", self.total_stars));
        prompt.push_str(&format!("- Recent Commits: {}\n", self.recent_commits));
        prompt.push_str(&format!("- Primary Languages: {}\n", self.languages.join(", ")));
        prompt.push_str(&format!("- Topics/Skills: {}\n", self.topics.join(", ")));
        prompt.push_str(&format!(
            "- Bio: {}\n\n",
            self.bio.as_deref().unwrap_or("N/A")
        ));

        prompt.push_str(SUMMARY_INSTRUCTIONS);
        prompt
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>, limit: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if out.len() == limit {
            break;
        }
        if !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fixtures::{commit, repo, snapshot};

    #[test]
    fn test_prompt_contents() {
        let mut snapshot = snapshot();
        snapshot.profile.bio = Some("Systems hacker".to_string());
        snapshot.repositories = vec![
            repo(1, Some("Rust"), &["cli", "parser"]),
            repo(2, Some("Rust"), &["cli"]),
            repo(3, Some("Go"), &[]),
        ];
        snapshot.repositories[0].stargazers_count = 7;
        snapshot.commits = vec![commit("a", snapshot.fetched_at)];

        let request = SummaryRequest::from_snapshot(&snapshot);
        assert_eq!(request.languages, vec!["Rust", "Go"]);
        assert_eq!(request.topics, vec!["cli", "parser"]);

        let prompt = request.to_prompt();
        assert!(prompt.starts_with("Generate a professional 3-4 sentence developer summary for The Octocat."));
        assert!(prompt.contains("- Public Repositories: 3\n"));
        assert!(prompt.contains("- Total Stars: 7\n"));
        assert!(prompt.contains("- Recent Commits: 1\n"));
        assert!(prompt.contains("- Primary Languages: Rust, Go\n"));
        assert!(prompt.contains("- Bio: Systems hacker\n"));
        assert!(prompt.ends_with(SUMMARY_INSTRUCTIONS));
    }

    #[test]
    fn test_missing_bio_and_limits() {
        let mut snapshot = snapshot();
        snapshot.repositories = (0..8)
            .map(|i| {
                let language = format!("Lang{}", i);
                let mut r = repo(i, None, &[]);
                r.language = Some(language);
                r
            })
            .collect();

        let request = SummaryRequest::from_snapshot(&snapshot);
        assert_eq!(request.languages.len(), MAX_LANGUAGES);
        assert!(request.to_prompt().contains("- Bio: N/A\n"));
    }
}
