use std::collections::HashSet;

use crate::error::BotError;
use crate::git::GitProvider;
use crate::git::types::ReviewComment;
use crate::tools::PrContext;

/// Marker embedded in every line-anchored comment the bot posts.
pub const INLINE_MARKER: &str = "<!-- pr-review-bot:inline -->";
/// Marker embedded in the per-PR summary comment.
pub const SUMMARY_MARKER: &str = "<!-- pr-review-bot:summary -->";

/// What happened to a batch of review comments.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Comments posted (anchored, or as the issue-comment fallback).
    pub posted: usize,
    /// Comments skipped because an identical (file, position) already exists.
    pub skipped: usize,
    /// Comments that could not be posted at all.
    pub failed: usize,
    /// Whole event skipped: the summary marker was already present.
    pub already_processed: bool,
}

/// Posts review comments and the summary, enforcing idempotency.
///
/// GitHub may redeliver a webhook event; posting must not duplicate
/// comments. Dedup keys: the (file, position) pair among existing
/// marker-bearing review comments for anchored comments, and the summary
/// marker for the summary. If the summary marker is already present the
/// whole event was processed before and nothing is posted.
pub struct CommentPublisher<'a> {
    provider: &'a dyn GitProvider,
}

impl<'a> CommentPublisher<'a> {
    pub fn new(provider: &'a dyn GitProvider) -> Self {
        Self { provider }
    }

    /// Publish a batch: anchored comments first, summary last.
    ///
    /// Listing existing comments must succeed before anything is posted:
    /// publishing blind would defeat the dedup, so a listing failure
    /// propagates and the delivery fails (redelivery is safe).
    pub async fn publish(
        &self,
        pr: &PrContext,
        comments: &[ReviewComment],
    ) -> Result<PublishOutcome, BotError> {
        let mut outcome = PublishOutcome::default();

        let issue_comments = self.provider.list_issue_comments(pr.number).await?;
        if issue_comments.iter().any(|c| c.body.contains(SUMMARY_MARKER)) {
            tracing::info!(
                pr = pr.number,
                "summary marker already present, skipping redelivered event"
            );
            outcome.already_processed = true;
            outcome.skipped = comments.len();
            return Ok(outcome);
        }

        let existing = self.provider.list_review_comments(pr.number).await?;
        let mut taken: HashSet<(String, usize)> = existing
            .iter()
            .filter(|c| c.body.contains(INLINE_MARKER))
            .filter_map(|c| c.position.map(|p| (c.path.clone(), p as usize)))
            .collect();

        let mut summary: Option<&ReviewComment> = None;

        for comment in comments {
            let Some(anchor) = &comment.anchor else {
                summary = Some(comment);
                continue;
            };

            let key = (anchor.path.clone(), anchor.position);
            if taken.contains(&key) {
                tracing::info!(
                    path = %anchor.path,
                    position = anchor.position,
                    "comment already exists at this anchor, skipping"
                );
                outcome.skipped += 1;
                continue;
            }

            let body = format!("{INLINE_MARKER}\n{}", comment.body);
            match self
                .provider
                .create_review_comment(pr.number, &pr.head_sha, &anchor.path, anchor.position, &body)
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        path = %anchor.path,
                        position = anchor.position,
                        "posted review comment"
                    );
                    taken.insert(key);
                    outcome.posted += 1;
                }
                Err(e @ (BotError::Authentication(_) | BotError::RateLimited { .. })) => {
                    // Unrecoverable for the whole batch.
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        path = %anchor.path,
                        position = anchor.position,
                        error = %e,
                        "review comment failed, falling back to issue comment"
                    );
                    match self.provider.create_issue_comment(pr.number, &body).await {
                        Ok(()) => outcome.posted += 1,
                        Err(e) => {
                            tracing::error!(path = %anchor.path, error = %e, "fallback comment failed");
                            outcome.failed += 1;
                        }
                    }
                }
            }
        }

        if let Some(summary) = summary {
            let body = format!("{SUMMARY_MARKER}\n{}", summary.body);
            match self.provider.create_issue_comment(pr.number, &body).await {
                Ok(()) => {
                    tracing::info!(pr = pr.number, "posted summary comment");
                    outcome.posted += 1;
                }
                Err(e @ (BotError::Authentication(_) | BotError::RateLimited { .. })) => {
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!(pr = pr.number, error = %e, "summary comment failed");
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }
}
