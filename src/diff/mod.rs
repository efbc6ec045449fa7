use std::sync::LazyLock;

use regex::Regex;

/// Regex for parsing unified diff hunk headers.
/// Matches: `@@ -start1[,size1] +start2[,size2] @@ [section]`
static HUNK_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap());

/// Parsed hunk header values.
#[derive(Debug, Clone)]
pub struct HunkHeader {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
}

impl HunkHeader {
    pub fn parse(line: &str) -> Option<Self> {
        let caps = HUNK_HEADER_RE.captures(line)?;
        Some(Self {
            old_start: caps[1].parse().unwrap_or(0),
            old_len: caps.get(2).map_or(1, |m| m.as_str().parse().unwrap_or(1)),
            new_start: caps[3].parse().unwrap_or(0),
            new_len: caps.get(4).map_or(1, |m| m.as_str().parse().unwrap_or(1)),
        })
    }
}

/// Origin of a single line within a diff hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOrigin {
    Context,
    Addition,
    Deletion,
}

/// One line of a parsed patch.
///
/// `position` is the offset into the rendered patch text that the GitHub
/// review-comment endpoint expects, NOT a source line number. The counter
/// restarts at each hunk header and every patch line after the header
/// increments it by one. `new_line` is the line number in the target file,
/// meaningful only for context and addition lines.
#[derive(Debug, Clone)]
pub struct DiffLine {
    pub origin: LineOrigin,
    pub position: usize,
    pub new_line: Option<usize>,
}

/// A contiguous block of changes within one file's patch.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct DiffHunk {
    pub old_start: usize,
    pub new_start: usize,
    pub lines: Vec<DiffLine>,
}

/// A location a review comment can legally be attached to: a context or
/// addition line of the file's patch. Deletion lines and lines outside any
/// hunk have no anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentAnchor {
    /// File path in the repository.
    pub path: String,
    /// Diff position for the review-comment endpoint.
    pub position: usize,
    /// Line number in the target file.
    pub line: usize,
}

/// Parse a unified diff patch for one file into position-addressable hunks.
///
/// Scan the patch line by line: a hunk header resets the position counter
/// to 0 and records the target-file line number at hunk start; every
/// subsequent line increments the position counter by 1. Addition and
/// context lines also advance the target-line counter; deletion lines
/// advance nothing on the target side. `\ No newline at end of file`
/// markers occupy a position but are not recorded as lines.
///
/// An empty patch or a patch with no hunk headers yields no hunks.
pub fn parse_patch(patch: &str) -> Vec<DiffHunk> {
    let mut hunks: Vec<DiffHunk> = Vec::new();
    let mut position: usize = 0;
    let mut new_line: usize = 0;

    for line in patch.lines() {
        if let Some(header) = HunkHeader::parse(line) {
            position = 0;
            new_line = header.new_start;
            hunks.push(DiffHunk {
                old_start: header.old_start,
                new_start: header.new_start,
                lines: Vec::new(),
            });
            continue;
        }

        // Lines before the first hunk header (diff preamble) are not part
        // of any hunk and carry no position.
        let Some(hunk) = hunks.last_mut() else {
            continue;
        };

        position += 1;

        if line.starts_with('+') {
            hunk.lines.push(DiffLine {
                origin: LineOrigin::Addition,
                position,
                new_line: Some(new_line),
            });
            new_line += 1;
        } else if line.starts_with('-') {
            hunk.lines.push(DiffLine {
                origin: LineOrigin::Deletion,
                position,
                new_line: None,
            });
        } else if line.starts_with('\\') {
            // "\ No newline at end of file": counted, never commentable.
        } else {
            hunk.lines.push(DiffLine {
                origin: LineOrigin::Context,
                position,
                new_line: Some(new_line),
            });
            new_line += 1;
        }
    }

    hunks
}

/// All commentable anchors for one file's patch, in patch order.
///
/// Empty for binary files, renames without content changes, and new empty
/// files; callers must skip such files entirely.
pub fn commentable_anchors(path: &str, patch: &str) -> Vec<CommentAnchor> {
    let mut anchors = Vec::new();
    for hunk in parse_patch(patch) {
        for line in &hunk.lines {
            if let Some(new_line) = line.new_line {
                anchors.push(CommentAnchor {
                    path: path.to_string(),
                    position: line.position,
                    line: new_line,
                });
            }
        }
    }
    anchors
}

/// Find the anchor for a specific target-file line, if that line is part of
/// the diff.
pub fn anchor_for_line<'a>(anchors: &'a [CommentAnchor], line: usize) -> Option<&'a CommentAnchor> {
    anchors.iter().find(|a| a.line == line)
}

/// Resolve a desired target line against the file's anchors.
///
/// Falls back to the first anchor in the file when the desired line is not
/// commentable (or no line was requested) rather than failing the review.
pub fn resolve_anchor<'a>(
    anchors: &'a [CommentAnchor],
    desired_line: Option<usize>,
) -> Option<&'a CommentAnchor> {
    desired_line
        .and_then(|line| anchor_for_line(anchors, line))
        .or_else(|| anchors.first())
}
