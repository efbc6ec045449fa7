use std::sync::Arc;

use crate::config::types::Settings;
use crate::error::BotError;
use crate::git::GitProvider;
use crate::server::events::IssueCommentPayload;

/// Handle a newly created issue comment.
///
/// A single trigger token is recognized; the comment body must equal it
/// exactly after whitespace trim. Anything else is a no-op. Returns whether
/// a greeting was posted.
pub async fn handle_comment(
    provider: &dyn GitProvider,
    settings: &Arc<Settings>,
    payload: &IssueCommentPayload,
) -> Result<bool, BotError> {
    let body = payload.comment.body.trim();

    if body != settings.greet.trigger {
        tracing::debug!(issue = payload.issue.number, "comment is not the greet command");
        return Ok(false);
    }

    let commenter = &payload.comment.user.login;
    tracing::info!(
        issue = payload.issue.number,
        comment_id = payload.comment.id,
        commenter = %commenter,
        "greet command detected"
    );

    let greeting = format!("👋 Hello @{commenter}! Thanks for using the greeting command.");
    provider
        .create_issue_comment(payload.issue.number, &greeting)
        .await?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::events::{Comment, Issue, Repository, User};
    use crate::testing::mock_git::MockGitProvider;

    fn payload(body: &str) -> IssueCommentPayload {
        IssueCommentPayload {
            comment: Comment {
                id: 1,
                body: body.into(),
                user: User {
                    login: "alice".into(),
                },
            },
            issue: Issue { number: 12 },
            repository: Repository {
                full_name: "octo/repo".into(),
            },
        }
    }

    fn settings() -> Arc<Settings> {
        Arc::new(Settings::default())
    }

    #[tokio::test]
    async fn test_greet_command_posts_greeting() {
        let provider = MockGitProvider::new();
        let posted = handle_comment(&provider, &settings(), &payload("/greet"))
            .await
            .unwrap();

        assert!(posted);
        let calls = provider.get_calls();
        assert_eq!(calls.issue_comments.len(), 1);
        let (number, body) = &calls.issue_comments[0];
        assert_eq!(*number, 12);
        assert!(body.contains("@alice"));
    }

    #[tokio::test]
    async fn test_greet_command_trims_whitespace() {
        let provider = MockGitProvider::new();
        let posted = handle_comment(&provider, &settings(), &payload("  /greet \n"))
            .await
            .unwrap();
        assert!(posted);
    }

    #[tokio::test]
    async fn test_other_comment_is_noop() {
        let provider = MockGitProvider::new();
        for body in ["/greet please", "hello", "/greeting", ""] {
            let posted = handle_comment(&provider, &settings(), &payload(body))
                .await
                .unwrap();
            assert!(!posted, "body {body:?} must not trigger a greeting");
        }
        assert!(provider.get_calls().issue_comments.is_empty());
    }

    #[tokio::test]
    async fn test_custom_trigger() {
        let mut s = Settings::default();
        s.greet.trigger = "/hello".into();
        let settings = Arc::new(s);

        let provider = MockGitProvider::new();
        assert!(
            handle_comment(&provider, &settings, &payload("/hello"))
                .await
                .unwrap()
        );
        assert!(
            !handle_comment(&provider, &settings, &payload("/greet"))
                .await
                .unwrap()
        );
    }
}
