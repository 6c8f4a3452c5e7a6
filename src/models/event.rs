use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of `GET /users/{login}/events`, with its payload decoded into a
/// typed variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawEvent", into = "RawEvent")]
pub struct Event {
    pub id: String,
    pub actor: Option<EventActor>,
    pub repo: EventRepo,
    pub public: bool,
    pub created_at: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventActor {
    pub id: u64,
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRepo {
    pub id: u64,
    pub name: String,
}

impl EventRepo {
    /// `owner/name` shortened to `name`.
    pub fn short_name(&self) -> &str {
        self.name.split_once('/').map(|(_, n)| n).unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Push,
    PullRequest,
    PullRequestReview,
    Issues,
    IssueComment,
    Watch,
    Fork,
    Create,
    Delete,
    Release,
    Other,
}

impl EventKind {
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "PushEvent" => EventKind::Push,
            "PullRequestEvent" => EventKind::PullRequest,
            "PullRequestReviewEvent" => EventKind::PullRequestReview,
            "IssuesEvent" => EventKind::Issues,
            "IssueCommentEvent" => EventKind::IssueComment,
            "WatchEvent" => EventKind::Watch,
            "ForkEvent" => EventKind::Fork,
            "CreateEvent" => EventKind::Create,
            "DeleteEvent" => EventKind::Delete,
            "ReleaseEvent" => EventKind::Release,
            _ => EventKind::Other,
        }
    }

    pub fn as_type(&self) -> &'static str {
        match self {
            EventKind::Push => "PushEvent",
            EventKind::PullRequest => "PullRequestEvent",
            EventKind::PullRequestReview => "PullRequestReviewEvent",
            EventKind::Issues => "IssuesEvent",
            EventKind::IssueComment => "IssueCommentEvent",
            EventKind::Watch => "WatchEvent",
            EventKind::Fork => "ForkEvent",
            EventKind::Create => "CreateEvent",
            EventKind::Delete => "DeleteEvent",
            EventKind::Release => "ReleaseEvent",
            EventKind::Other => "OtherEvent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    Push(PushPayload),
    PullRequest(PullRequestPayload),
    PullRequestReview(PullRequestPayload),
    Issues(IssuesPayload),
    IssueComment(IssuesPayload),
    Watch(ActionPayload),
    Fork(ForkPayload),
    Create(RefPayload),
    Delete(RefPayload),
    Release(ReleasePayload),
    /// Unmodelled event types, and modelled ones whose payload did not have
    /// the expected shape.
    Unknown { event_type: String, payload: Value },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub size: Option<u32>,
    #[serde(default)]
    pub commits: Vec<PushCommit>,
}

impl PushPayload {
    pub fn commit_count(&self) -> u32 {
        self.size.unwrap_or(self.commits.len() as u32)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushCommit {
    pub sha: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestPayload {
    pub action: String,
    pub number: Option<u64>,
    pub pull_request: Option<EventPullRequest>,
}

impl PullRequestPayload {
    pub fn number(&self) -> Option<u64> {
        self.number
            .or_else(|| self.pull_request.as_ref().and_then(|pr| pr.number))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPullRequest {
    pub number: Option<u64>,
    pub title: Option<String>,
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuesPayload {
    pub action: String,
    pub issue: Option<EventIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventIssue {
    pub number: u64,
    pub title: Option<String>,
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPayload {
    pub action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForkPayload {
    pub forkee: Option<Forkee>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forkee {
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefPayload {
    pub ref_type: String,
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleasePayload {
    pub action: String,
    pub release: Option<EventRelease>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRelease {
    pub tag_name: String,
    pub name: Option<String>,
}

impl EventPayload {
    pub fn decode(event_type: &str, payload: Value) -> Self {
        fn typed<T: serde::de::DeserializeOwned>(
            event_type: &str,
            payload: Value,
            wrap: fn(T) -> EventPayload,
        ) -> EventPayload {
            match serde_json::from_value::<T>(payload.clone()) {
                Ok(p) => wrap(p),
                Err(e) => {
                    tracing::debug!("Undecodable {} payload: {}", event_type, e);
                    EventPayload::Unknown {
                        event_type: event_type.to_string(),
                        payload,
                    }
                }
            }
        }

        match EventKind::from_type(event_type) {
            EventKind::Push => typed(event_type, payload, EventPayload::Push),
            EventKind::PullRequest => typed(event_type, payload, EventPayload::PullRequest),
            EventKind::PullRequestReview => {
                typed(event_type, payload, EventPayload::PullRequestReview)
            }
            EventKind::Issues => typed(event_type, payload, EventPayload::Issues),
            EventKind::IssueComment => typed(event_type, payload, EventPayload::IssueComment),
            EventKind::Watch => typed(event_type, payload, EventPayload::Watch),
            EventKind::Fork => typed(event_type, payload, EventPayload::Fork),
            EventKind::Create => typed(event_type, payload, EventPayload::Create),
            EventKind::Delete => typed(event_type, payload, EventPayload::Delete),
            EventKind::Release => typed(event_type, payload, EventPayload::Release),
            EventKind::Other => EventPayload::Unknown {
                event_type: event_type.to_string(),
                payload,
            },
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Push(_) => EventKind::Push,
            EventPayload::PullRequest(_) => EventKind::PullRequest,
            EventPayload::PullRequestReview(_) => EventKind::PullRequestReview,
            EventPayload::Issues(_) => EventKind::Issues,
            EventPayload::IssueComment(_) => EventKind::IssueComment,
            EventPayload::Watch(_) => EventKind::Watch,
            EventPayload::Fork(_) => EventKind::Fork,
            EventPayload::Create(_) => EventKind::Create,
            EventPayload::Delete(_) => EventKind::Delete,
            EventPayload::Release(_) => EventKind::Release,
            EventPayload::Unknown { event_type, .. } => EventKind::from_type(event_type),
        }
    }

    /// The GitHub `type` string this payload was decoded from.
    pub fn event_type(&self) -> &str {
        match self {
            EventPayload::Unknown { event_type, .. } => event_type,
            other => other.kind().as_type(),
        }
    }

    pub fn to_value(&self) -> Value {
        let value = match self {
            EventPayload::Push(p) => serde_json::to_value(p),
            EventPayload::PullRequest(p) | EventPayload::PullRequestReview(p) => {
                serde_json::to_value(p)
            }
            EventPayload::Issues(p) | EventPayload::IssueComment(p) => serde_json::to_value(p),
            EventPayload::Watch(p) => serde_json::to_value(p),
            EventPayload::Fork(p) => serde_json::to_value(p),
            EventPayload::Create(p) | EventPayload::Delete(p) => serde_json::to_value(p),
            EventPayload::Release(p) => serde_json::to_value(p),
            EventPayload::Unknown { payload, .. } => return payload.clone(),
        };
        value.unwrap_or(Value::Null)
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn opened_pull_request(&self) -> bool {
        matches!(&self.payload, EventPayload::PullRequest(p) if p.action == "opened")
    }

    pub fn opened_issue(&self) -> bool {
        matches!(&self.payload, EventPayload::Issues(p) if p.action == "opened")
    }

    /// One-line description for a recent-activity feed.
    pub fn describe(&self) -> String {
        let repo = self.repo.short_name();
        match &self.payload {
            EventPayload::Push(p) => {
                let count = p.commit_count();
                let plural = if count == 1 { "" } else { "s" };
                format!("Pushed {} commit{} to {}", count, plural, repo)
            }
            EventPayload::PullRequest(p) => {
                let verb = match p.action.as_str() {
                    "opened" => "Opened",
                    "closed" => "Closed",
                    "reopened" => "Reopened",
                    _ => "Updated",
                };
                match p.number() {
                    Some(n) => format!("{} pull request #{} in {}", verb, n, repo),
                    None => format!("{} a pull request in {}", verb, repo),
                }
            }
            EventPayload::PullRequestReview(p) => match p.number() {
                Some(n) => format!("Reviewed pull request #{} in {}", n, repo),
                None => format!("Reviewed a pull request in {}", repo),
            },
            EventPayload::Issues(p) => {
                let verb = match p.action.as_str() {
                    "opened" => "Opened",
                    "reopened" => "Reopened",
                    _ => "Closed",
                };
                match &p.issue {
                    Some(issue) => format!("{} issue #{} in {}", verb, issue.number, repo),
                    None => format!("{} an issue in {}", verb, repo),
                }
            }
            EventPayload::IssueComment(p) => match &p.issue {
                Some(issue) => format!("Commented on #{} in {}", issue.number, repo),
                None => format!("Commented in {}", repo),
            },
            EventPayload::Watch(_) => format!("Starred {}", repo),
            EventPayload::Fork(_) => format!("Forked {}", repo),
            EventPayload::Create(p) => format!("Created {} in {}", p.ref_type, repo),
            EventPayload::Delete(p) => format!("Deleted {} in {}", p.ref_type, repo),
            EventPayload::Release(p) => match &p.release {
                Some(release) => format!("Released {} of {}", release.tag_name, repo),
                None => format!("Published a release of {}", repo),
            },
            EventPayload::Unknown { .. } => format!("Activity in {}", repo),
        }
    }
}

/// Wire shape, kept private so the typed `Event` is the only public form.
#[derive(Serialize, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    actor: Option<EventActor>,
    repo: EventRepo,
    #[serde(default)]
    payload: Value,
    #[serde(default = "default_public")]
    public: bool,
    created_at: DateTime<Utc>,
}

fn default_public() -> bool {
    true
}

impl From<RawEvent> for Event {
    fn from(raw: RawEvent) -> Self {
        Self {
            payload: EventPayload::decode(&raw.event_type, raw.payload),
            id: raw.id,
            actor: raw.actor,
            repo: raw.repo,
            public: raw.public,
            created_at: raw.created_at,
        }
    }
}

impl From<Event> for RawEvent {
    fn from(event: Event) -> Self {
        Self {
            event_type: event.payload.event_type().to_string(),
            payload: event.payload.to_value(),
            id: event.id,
            actor: event.actor,
            repo: event.repo,
            public: event.public,
            created_at: event.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, payload: Value) -> Event {
        serde_json::from_value(json!({
            "id": "1",
            "type": event_type,
            "actor": {"id": 7, "login": "octocat"},
            "repo": {"id": 42, "name": "octocat/hello"},
            "payload": payload,
            "public": true,
            "created_at": "2024-03-01T12:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_typed_payloads() {
        let push = event("PushEvent", json!({"ref": "refs/heads/main", "size": 2, "commits": []}));
        assert_eq!(push.kind(), EventKind::Push);
        assert_eq!(push.describe(), "Pushed 2 commits to hello");

        let pr = event(
            "PullRequestEvent",
            json!({"action": "opened", "number": 5, "pull_request": {"title": "Fix"}}),
        );
        assert!(pr.opened_pull_request());
        assert_eq!(pr.describe(), "Opened pull request #5 in hello");

        let issue = event("IssuesEvent", json!({"action": "opened", "issue": {"number": 9}}));
        assert!(issue.opened_issue());
        assert!(!issue.opened_pull_request());
    }

    #[test]
    fn test_unknown_and_malformed_payloads() {
        let gollum = event("GollumEvent", json!({"pages": []}));
        assert_eq!(gollum.kind(), EventKind::Other);
        assert!(matches!(gollum.payload, EventPayload::Unknown { .. }));

        // A PullRequestEvent without an action does not fit the typed shape.
        let broken = event("PullRequestEvent", json!({"number": 3}));
        assert_eq!(broken.kind(), EventKind::PullRequest);
        assert!(matches!(broken.payload, EventPayload::Unknown { .. }));
        assert!(!broken.opened_pull_request());
    }

    #[test]
    fn test_serializes_back_to_wire_shape() {
        let watch = event("WatchEvent", json!({"action": "started"}));
        let value = serde_json::to_value(&watch).unwrap();
        assert_eq!(value["type"], "WatchEvent");
        assert_eq!(value["payload"]["action"], "started");

        let again: Event = serde_json::from_value(value).unwrap();
        assert_eq!(again, watch);
    }
}
