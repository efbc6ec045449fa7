use serde::Deserialize;

/// A classified webhook delivery.
///
/// Replaces string-matched dispatch with a closed set of shapes the bots
/// act on. Anything else (unknown event types, recognized events with
/// actions the bots don't handle, payloads missing required fields)
/// classifies as `Unrecognized` and is accepted and ignored, never an
/// error.
#[derive(Debug)]
pub enum WebhookEvent {
    /// GitHub's webhook-configuration ping.
    Ping,
    /// A newly created comment on an issue or pull request.
    IssueComment(IssueCommentPayload),
    /// A pull request was opened.
    PullRequestOpened(PullRequestPayload),
    Unrecognized { event: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueCommentPayload {
    pub comment: Comment,
    pub issue: Issue,
    pub repository: Repository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(default)]
    pub body: String,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    pub number: u64,
    pub pull_request: PullRequest,
    pub repository: Repository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub user: User,
    pub head: BranchRef,
    pub base: BranchRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub branch: String,
    #[serde(default)]
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

impl WebhookEvent {
    /// Classify a delivery from its event-type header and parsed payload.
    pub fn classify(event: &str, payload: &serde_json::Value) -> Self {
        let action = payload["action"].as_str().unwrap_or_default();

        match (event, action) {
            ("ping", _) => WebhookEvent::Ping,
            ("issue_comment", "created") => {
                match serde_json::from_value(payload.clone()) {
                    Ok(p) => WebhookEvent::IssueComment(p),
                    Err(e) => {
                        tracing::warn!(error = %e, "malformed issue_comment payload");
                        WebhookEvent::Unrecognized {
                            event: event.to_string(),
                        }
                    }
                }
            }
            ("pull_request", "opened") => match serde_json::from_value(payload.clone()) {
                Ok(p) => WebhookEvent::PullRequestOpened(p),
                Err(e) => {
                    tracing::warn!(error = %e, "malformed pull_request payload");
                    WebhookEvent::Unrecognized {
                        event: event.to_string(),
                    }
                }
            },
            _ => WebhookEvent::Unrecognized {
                event: event.to_string(),
            },
        }
    }
}
