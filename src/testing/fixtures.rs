use crate::git::types::{ChangedFile, FileStatus};
use crate::tools::PrContext;

/// Build a sample `ChangedFile` with a given patch.
pub fn sample_file(filename: &str, patch: &str) -> ChangedFile {
    ChangedFile {
        filename: filename.to_string(),
        status: FileStatus::Modified,
        patch: patch.to_string(),
    }
}

/// A simple unified diff patch for use in tests.
///
/// Diff positions: context=1, deletion=2, additions=3/4/5, context=6.
/// Commentable target lines: 1 (pos 1), 2 (pos 3), 3 (pos 4), 4 (pos 5),
/// 5 (pos 6).
pub const SAMPLE_PATCH: &str = r#"@@ -1,3 +1,5 @@
 fn main() {
-    println!("hello");
+    println!("hello world");
+    let x = 42;
+    dbg!(x);
 }
"#;

/// Pull-request metadata for pipeline tests.
pub fn sample_pr() -> PrContext {
    PrContext {
        number: 42,
        title: "Add greeting output".into(),
        description: "Expands main with debug output".into(),
        author: "octocat".into(),
        head_sha: "abc123def456".into(),
        head_branch: "feature/greeting".into(),
        base_branch: "main".into(),
    }
}
