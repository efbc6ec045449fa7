use serde::{Deserialize, Serialize};

use crate::diff::CommentAnchor;

/// How a file was changed in the PR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
    #[default]
    Unknown,
}

impl FileStatus {
    /// Map the GitHub `status` field of a changed-file entry.
    pub fn from_api(status: &str) -> Self {
        match status {
            "added" => FileStatus::Added,
            "removed" => FileStatus::Removed,
            "renamed" => FileStatus::Renamed,
            "modified" | "changed" => FileStatus::Modified,
            _ => FileStatus::Unknown,
        }
    }
}

/// A file changed in a pull request, as listed by the hosting API.
///
/// The patch is the file's unified diff as rendered by GitHub; it is empty
/// for binary files and for renames without content changes.
#[derive(Debug, Clone)]
pub struct ChangedFile {
    pub filename: String,
    pub status: FileStatus,
    pub patch: String,
}

/// One comment produced by the review pipeline, ready for publishing.
///
/// `anchor: None` marks the summary comment, posted as a plain issue-level
/// comment instead of a line-anchored review comment.
#[derive(Debug, Clone)]
pub struct ReviewComment {
    pub anchor: Option<CommentAnchor>,
    pub body: String,
}

impl ReviewComment {
    pub fn anchored(anchor: CommentAnchor, body: impl Into<String>) -> Self {
        Self {
            anchor: Some(anchor),
            body: body.into(),
        }
    }

    pub fn summary(body: impl Into<String>) -> Self {
        Self {
            anchor: None,
            body: body.into(),
        }
    }
}

/// An existing review comment on the PR diff (for the idempotency check).
#[derive(Debug, Clone)]
pub struct PostedReviewComment {
    pub path: String,
    pub position: Option<u64>,
    pub body: String,
}

/// An existing plain comment on the PR/issue.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct IssueComment {
    pub id: u64,
    pub body: String,
    pub user: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_status_from_api() {
        assert_eq!(FileStatus::from_api("added"), FileStatus::Added);
        assert_eq!(FileStatus::from_api("removed"), FileStatus::Removed);
        assert_eq!(FileStatus::from_api("renamed"), FileStatus::Renamed);
        assert_eq!(FileStatus::from_api("modified"), FileStatus::Modified);
        assert_eq!(FileStatus::from_api("changed"), FileStatus::Modified);
        assert_eq!(FileStatus::from_api("copied"), FileStatus::Unknown);
    }

    #[test]
    fn test_review_comment_constructors() {
        let anchor = CommentAnchor {
            path: "src/main.rs".into(),
            position: 3,
            line: 12,
        };
        let c = ReviewComment::anchored(anchor, "looks wrong");
        assert!(c.anchor.is_some());

        let s = ReviewComment::summary("all done");
        assert!(s.anchor.is_none());
    }
}
