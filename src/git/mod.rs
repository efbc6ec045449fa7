pub mod github;
pub mod types;

use async_trait::async_trait;
use types::*;

use crate::error::BotError;

/// Trait for the git hosting platform the bots talk to.
///
/// All operations target the repository the bot is configured for. Kept as
/// a trait so the review pipeline can run against a mock in tests.
#[async_trait]
pub trait GitProvider: Send + Sync {
    /// List the files changed in a pull request, including each file's
    /// rendered patch.
    async fn list_changed_files(&self, pr_number: u64) -> Result<Vec<ChangedFile>, BotError>;

    /// Fetch the full content of a file at a specific ref.
    async fn get_file_content(&self, path: &str, git_ref: &str) -> Result<String, BotError>;

    /// Post a review comment anchored at (path, position) in the PR diff.
    async fn create_review_comment(
        &self,
        pr_number: u64,
        commit_id: &str,
        path: &str,
        position: usize,
        body: &str,
    ) -> Result<(), BotError>;

    /// Post a plain comment on the PR/issue.
    async fn create_issue_comment(&self, number: u64, body: &str) -> Result<(), BotError>;

    /// List existing review comments on the PR diff.
    async fn list_review_comments(
        &self,
        pr_number: u64,
    ) -> Result<Vec<PostedReviewComment>, BotError>;

    /// List existing plain comments on the PR/issue.
    async fn list_issue_comments(&self, number: u64) -> Result<Vec<IssueComment>, BotError>;
}
