use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use minijinja::Value;
use regex::Regex;

use crate::ai::AiHandler;
use crate::config::types::Settings;
use crate::diff::{CommentAnchor, anchor_for_line, commentable_anchors, resolve_anchor};
use crate::error::BotError;
use crate::git::GitProvider;
use crate::git::types::{ChangedFile, FileStatus, ReviewComment};
use crate::template::render::render_prompt;
use crate::tools::PrContext;
use crate::tools::publish::{CommentPublisher, PublishOutcome};

/// Matches "line 42" / "lines 42" references in the AI narrative.
static LINE_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blines?\s+(\d+)").unwrap());

/// PR review pipeline.
///
/// Fetches the changed files, obtains an AI review narrative per file,
/// anchors each narrative to a commentable diff position, and hands the
/// batch to the publisher. A single file's failure never aborts the run:
/// the file is skipped and listed in the summary instead.
pub struct PrReviewer {
    provider: Arc<dyn GitProvider>,
    ai: Arc<dyn AiHandler>,
    settings: Arc<Settings>,
}

/// What the pipeline did with one changed file.
enum FileReview {
    Reviewed(ReviewComment),
    Skipped { reason: String },
    /// Removed files are not reviewed and not worth a summary line.
    Ignored,
}

impl PrReviewer {
    pub fn new(
        provider: Arc<dyn GitProvider>,
        ai: Arc<dyn AiHandler>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            provider,
            ai,
            settings,
        }
    }

    /// Run the full review pipeline for one pull request.
    pub async fn run(&self, pr: &PrContext) -> Result<PublishOutcome, BotError> {
        tracing::info!(
            pr = pr.number,
            author = %pr.author,
            head = %pr.head_branch,
            base = %pr.base_branch,
            "reviewing pull request"
        );

        let files = self.provider.list_changed_files(pr.number).await?;
        tracing::info!(pr = pr.number, num_files = files.len(), "analyzing changed files");

        let mut comments: Vec<ReviewComment> = Vec::new();
        let mut reviewed: Vec<String> = Vec::new();
        let mut skipped: Vec<(String, String)> = Vec::new();

        for file in &files {
            match self.review_file(pr, file).await? {
                FileReview::Reviewed(comment) => {
                    reviewed.push(file.filename.clone());
                    comments.push(comment);
                }
                FileReview::Skipped { reason } => {
                    tracing::warn!(file = %file.filename, reason = %reason, "skipping file");
                    skipped.push((file.filename.clone(), reason));
                }
                FileReview::Ignored => {
                    tracing::debug!(file = %file.filename, "ignoring removed file");
                }
            }
        }

        comments.push(ReviewComment::summary(build_summary(
            files.len(),
            &reviewed,
            &skipped,
        )));

        if !self.settings.config.publish_output {
            tracing::info!(pr = pr.number, "publish_output disabled, printing instead");
            for comment in &comments {
                println!("{}\n", comment.body);
            }
            return Ok(PublishOutcome::default());
        }

        tracing::info!(
            pr = pr.number,
            reviewed = reviewed.len(),
            skipped = skipped.len(),
            "publishing review"
        );
        CommentPublisher::new(self.provider.as_ref())
            .publish(pr, &comments)
            .await
    }

    /// Review one changed file.
    ///
    /// Per-file fetch and AI failures become `Skipped`; only unrecoverable
    /// errors (auth, rate-limit exhaustion) propagate.
    async fn review_file(&self, pr: &PrContext, file: &ChangedFile) -> Result<FileReview, BotError> {
        if file.status == FileStatus::Removed {
            return Ok(FileReview::Ignored);
        }

        if file.patch.is_empty() {
            return Ok(FileReview::Skipped {
                reason: "empty patch (binary file or rename)".into(),
            });
        }

        let anchors = commentable_anchors(&file.filename, &file.patch);
        if anchors.is_empty() {
            return Ok(FileReview::Skipped {
                reason: "no commentable lines in diff".into(),
            });
        }

        let content = match self
            .provider
            .get_file_content(&file.filename, &pr.head_sha)
            .await
        {
            Ok(content) => content,
            Err(e) if e.is_per_file() => {
                return Ok(FileReview::Skipped {
                    reason: format!("could not fetch content: {e}"),
                });
            }
            Err(e) => return Err(e),
        };

        let rendered = render_prompt(
            &self.settings.pr_review_prompt,
            self.build_vars(pr, file, &content),
        )?;

        let narrative = match self.ai.complete(&rendered.system, &rendered.user).await {
            Ok(narrative) => narrative,
            Err(e) if e.is_per_file() => {
                return Ok(FileReview::Skipped {
                    reason: format!("AI review failed: {e}"),
                });
            }
            Err(e) => return Err(e),
        };

        // anchors is non-empty here, so an anchor always resolves
        let anchor = select_anchor(&anchors, &narrative)
            .cloned()
            .ok_or_else(|| BotError::Other("anchor resolution on empty anchor set".into()))?;

        let body = format!("# AI Code Review for `{}`\n\n{}", file.filename, narrative);
        Ok(FileReview::Reviewed(ReviewComment::anchored(anchor, body)))
    }

    fn build_vars(
        &self,
        pr: &PrContext,
        file: &ChangedFile,
        content: &str,
    ) -> HashMap<String, Value> {
        let mut vars = HashMap::new();
        vars.insert("title".into(), Value::from(pr.title.as_str()));
        vars.insert("description".into(), Value::from(pr.description.as_str()));
        vars.insert("author".into(), Value::from(pr.author.as_str()));
        vars.insert("filename".into(), Value::from(file.filename.as_str()));
        vars.insert("content".into(), Value::from(content));
        vars.insert("patch".into(), Value::from(file.patch.as_str()));
        vars.insert(
            "extra_instructions".into(),
            Value::from(self.settings.pr_review.extra_instructions.as_str()),
        );
        vars
    }
}

/// Pick the anchor for a narrative: the first "line N" reference that maps
/// to a commentable line wins, otherwise the first anchor in the file.
fn select_anchor<'a>(anchors: &'a [CommentAnchor], narrative: &str) -> Option<&'a CommentAnchor> {
    let desired = LINE_REF_RE
        .captures_iter(narrative)
        .filter_map(|caps| caps[1].parse::<usize>().ok())
        .find(|line| anchor_for_line(anchors, *line).is_some());
    resolve_anchor(anchors, desired)
}

/// Build the summary comment body.
fn build_summary(
    num_files: usize,
    reviewed: &[String],
    skipped: &[(String, String)],
) -> String {
    if num_files == 0 {
        return "# 🤖 AI Code Review\n\nNo files found to review in this pull request.".into();
    }

    let mut summary = format!(
        "# 🤖 AI Code Review Complete\n\nI've reviewed {} of {} changed file(s) in this pull request.\n",
        reviewed.len(),
        num_files
    );

    if !skipped.is_empty() {
        summary.push_str("\nSkipped files:\n");
        for (filename, reason) in skipped {
            summary.push_str(&format!("- `{filename}` — {reason}\n"));
        }
    }

    summary.push_str(
        "\nPlease review the comments and make any necessary changes. \
         If you have any questions about the review, feel free to ask!",
    );
    summary
}
