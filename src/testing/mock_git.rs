use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::BotError;
use crate::git::GitProvider;
use crate::git::types::*;

/// Captured calls made to the mock provider, for test assertions.
#[derive(Debug, Default)]
pub struct MockCalls {
    /// (path, position, body)
    pub review_comments: Vec<(String, usize, String)>,
    /// (issue/PR number, body)
    pub issue_comments: Vec<(u64, String)>,
}

/// Mock git provider for pipeline tests.
///
/// Pre-configured with changed files, file contents, and existing comments.
/// Captures all posting calls for assertions. Failure modes are opt-in via
/// the `with_failing_*` builders.
pub struct MockGitProvider {
    pub changed_files: Vec<ChangedFile>,
    pub file_contents: HashMap<String, String>,
    pub existing_review_comments: Vec<PostedReviewComment>,
    pub existing_issue_comments: Vec<IssueComment>,
    pub fail_review_comments: bool,
    pub fail_listings: bool,
    pub calls: Mutex<MockCalls>,
}

impl MockGitProvider {
    pub fn new() -> Self {
        Self {
            changed_files: Vec::new(),
            file_contents: HashMap::new(),
            existing_review_comments: Vec::new(),
            existing_issue_comments: Vec::new(),
            fail_review_comments: false,
            fail_listings: false,
            calls: Mutex::new(MockCalls::default()),
        }
    }

    pub fn with_changed_file(mut self, file: ChangedFile) -> Self {
        self.changed_files.push(file);
        self
    }

    pub fn with_file_content(mut self, path: &str, content: &str) -> Self {
        self.file_contents.insert(path.into(), content.into());
        self
    }

    pub fn with_existing_review_comment(mut self, path: &str, position: u64, body: &str) -> Self {
        self.existing_review_comments.push(PostedReviewComment {
            path: path.into(),
            position: Some(position),
            body: body.into(),
        });
        self
    }

    pub fn with_existing_issue_comment(mut self, body: &str) -> Self {
        self.existing_issue_comments.push(IssueComment {
            id: self.existing_issue_comments.len() as u64 + 1,
            body: body.into(),
            user: "pr-review-bot".into(),
        });
        self
    }

    /// Every `create_review_comment` call fails with a publish error.
    pub fn with_failing_review_comments(mut self) -> Self {
        self.fail_review_comments = true;
        self
    }

    /// Listing existing comments fails (both review and issue listings).
    pub fn with_failing_listings(mut self) -> Self {
        self.fail_listings = true;
        self
    }

    /// Build a fresh provider whose listings include everything posted to
    /// this one, modeling the hosting platform's state at redelivery time.
    pub fn with_posted_reflected(&self) -> Self {
        let calls = self.get_calls();
        let mut next = MockGitProvider::new();
        next.changed_files = self.changed_files.clone();
        next.file_contents = self.file_contents.clone();
        next.existing_review_comments = self.existing_review_comments.clone();
        next.existing_issue_comments = self.existing_issue_comments.clone();

        for (path, position, body) in &calls.review_comments {
            next.existing_review_comments.push(PostedReviewComment {
                path: path.clone(),
                position: Some(*position as u64),
                body: body.clone(),
            });
        }
        for (i, (_, body)) in calls.issue_comments.iter().enumerate() {
            next.existing_issue_comments.push(IssueComment {
                id: 1000 + i as u64,
                body: body.clone(),
                user: "pr-review-bot".into(),
            });
        }
        next
    }

    pub fn get_calls(&self) -> std::sync::MutexGuard<'_, MockCalls> {
        self.calls.lock().unwrap()
    }
}

#[async_trait]
impl GitProvider for MockGitProvider {
    async fn list_changed_files(&self, _pr_number: u64) -> Result<Vec<ChangedFile>, BotError> {
        Ok(self.changed_files.clone())
    }

    async fn get_file_content(&self, path: &str, _git_ref: &str) -> Result<String, BotError> {
        self.file_contents
            .get(path)
            .cloned()
            .ok_or_else(|| BotError::TransientFetch(format!("no content for {path}")))
    }

    async fn create_review_comment(
        &self,
        _pr_number: u64,
        _commit_id: &str,
        path: &str,
        position: usize,
        body: &str,
    ) -> Result<(), BotError> {
        if self.fail_review_comments {
            return Err(BotError::Publish("mock review comment failure".into()));
        }
        self.calls
            .lock()
            .unwrap()
            .review_comments
            .push((path.into(), position, body.into()));
        Ok(())
    }

    async fn create_issue_comment(&self, number: u64, body: &str) -> Result<(), BotError> {
        self.calls
            .lock()
            .unwrap()
            .issue_comments
            .push((number, body.into()));
        Ok(())
    }

    async fn list_review_comments(
        &self,
        _pr_number: u64,
    ) -> Result<Vec<PostedReviewComment>, BotError> {
        if self.fail_listings {
            return Err(BotError::Publish("mock listing failure".into()));
        }
        Ok(self.existing_review_comments.clone())
    }

    async fn list_issue_comments(&self, _number: u64) -> Result<Vec<IssueComment>, BotError> {
        if self.fail_listings {
            return Err(BotError::Publish("mock listing failure".into()));
        }
        Ok(self.existing_issue_comments.clone())
    }
}
