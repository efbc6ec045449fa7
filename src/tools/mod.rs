pub mod greet;
pub mod publish;
pub mod review;

use crate::server::events::PullRequestPayload;

/// Pull-request metadata the review pipeline needs.
///
/// Comes straight from the webhook payload (or is fetched once in CLI
/// mode); no extra API round-trip during webhook handling.
#[derive(Debug, Clone)]
pub struct PrContext {
    pub number: u64,
    pub title: String,
    pub description: String,
    pub author: String,
    pub head_sha: String,
    pub head_branch: String,
    pub base_branch: String,
}

impl PrContext {
    pub fn from_payload(payload: &PullRequestPayload) -> Self {
        Self {
            number: payload.number,
            title: payload.pull_request.title.clone(),
            description: payload.pull_request.body.clone().unwrap_or_default(),
            author: payload.pull_request.user.login.clone(),
            head_sha: payload.pull_request.head.sha.clone(),
            head_branch: payload.pull_request.head.branch.clone(),
            base_branch: payload.pull_request.base.branch.clone(),
        }
    }
}
