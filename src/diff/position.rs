//! Translation from absolute file line numbers to diff-relative positions.

use super::model::ParsedFile;

/// Finds the diff-relative position for a comment aimed at `target_line` in
/// the new version of `file`.
///
/// Hunks are scanned in diff order and the first one whose map contains the
/// line wins. `None` means the line is not part of any hunk — an unchanged
/// region outside the diff, a removed-only line, or a line number beyond
/// what the diff touched — and cannot carry an inline comment. Callers must
/// degrade gracefully (drop the comment or fall back to a file-level one),
/// never fabricate a position.
pub fn resolve(file: &ParsedFile, target_line: u32) -> Option<u32> {
  file
    .hunks
    .iter()
    .find_map(|hunk| hunk.line_position_map.get(&target_line))
    .map(|entry| entry.position)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::diff::parse_diff;
  use crate::filter::PathFilter;

  fn fixture() -> ParsedFile {
    let diff = r#"diff --git a/src/app.rs b/src/app.rs
index 1234567..7654321 100644
--- a/src/app.rs
+++ b/src/app.rs
@@ -3,1 +3,2 @@
 fn setup() {
+  init_logging();
@@ -20,2 +21,1 @@
-fn unused() {}
-
+fn shutdown() {}
"#;

    parse_diff(diff, &PathFilter::permissive()).remove(0)
  }

  #[test]
  fn test_resolves_lines_from_each_hunk() {
    let file = fixture();

    assert_eq!(resolve(&file, 3), Some(1));
    assert_eq!(resolve(&file, 4), Some(2));
    assert_eq!(resolve(&file, 21), Some(3));
  }

  #[test]
  fn test_round_trips_every_recorded_entry() {
    let file = fixture();

    for hunk in &file.hunks {
      for (target_line, entry) in &hunk.line_position_map {
        assert_eq!(resolve(&file, *target_line), Some(entry.position));
      }
    }
  }

  #[test]
  fn test_removed_only_line_is_not_resolvable() {
    let file = fixture();

    // Line 20 exists only in the source version of the second hunk.
    assert_eq!(resolve(&file, 20), None);
  }

  #[test]
  fn test_line_outside_any_hunk_is_not_resolvable() {
    let file = fixture();

    assert_eq!(resolve(&file, 1), None);
    assert_eq!(resolve(&file, 999), None);
  }
}
