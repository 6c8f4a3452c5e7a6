use std::collections::HashMap;

use crate::models::{Repository, TopicCount};

/// Topic occurrences across repositories, most frequent first, at most
/// `limit` entries. Equal counts keep first-seen order.
pub fn topic_frequency(repositories: &[Repository], limit: usize) -> Vec<TopicCount> {
    let mut counts: Vec<TopicCount> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for topic in repositories.iter().flat_map(|r| r.topics.iter()) {
        match positions.get(topic.as_str()) {
            Some(&i) => counts[i].count += 1,
            None => {
                positions.insert(topic, counts.len());
                counts.push(TopicCount {
                    topic: topic.clone(),
                    count: 1,
                });
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

pub fn top_topics(repositories: &[Repository], limit: usize) -> Vec<String> {
    topic_frequency(repositories, limit)
        .into_iter()
        .map(|t| t.topic)
        .collect()
}
