//! Unified-diff parsing.
//!
//! A single pass over raw diff text recognizes file and hunk boundaries,
//! classifies hunk lines, and delegates position bookkeeping to
//! [`HunkMapper`]. The parser is deliberately permissive: diff sources
//! occasionally emit partial or oddly-formatted output, so anything it
//! cannot recognize is skipped rather than treated as a fatal error.

use crate::filter::PathFilter;
use crate::profile;

use super::mapper::HunkMapper;
use super::model::{LineKind, ParsedFile};

/// Parse raw diff text into per-file structures, applying `filter` to each
/// file's display path at the boundary line.
///
/// Files and hunks appear in the result in input order. Deleted files, files
/// dropped by the filter, and files without any content hunks (e.g. pure
/// mode changes) are excluded. Handles diffs with commit hashes and various
/// path prefixes (`a/`, `b/`, `c/`, `i/`). Empty or unrecognizable input
/// yields an empty result, never an error.
pub fn parse_diff(diff_text: &str, filter: &PathFilter) -> Vec<ParsedFile> {
  profile!("Parse diff");

  let mut files: Vec<ParsedFile> = Vec::new();
  let mut current_file: Option<ParsedFile> = None;
  let mut current_hunk: Option<HunkMapper> = None;
  let mut skipping = false;

  log::debug!("Parsing diff with {} lines", diff_text.lines().count());

  for line in diff_text.lines() {
    if let Some(rest) = line.strip_prefix("diff --git ") {
      finish_hunk(&mut current_file, &mut current_hunk);
      finish_file(&mut files, &mut current_file);
      skipping = false;

      let Some((old_path, new_path)) = boundary_paths(rest) else {
        log::warn!("Skipping file with unrecognizable boundary line: {line}");
        skipping = true;
        continue;
      };

      if !filter.matches(&new_path) {
        log::debug!("Excluding file due to pattern match: {new_path}");
        skipping = true;
        continue;
      }

      log::debug!("Found file in diff: {new_path}");
      current_file = Some(ParsedFile {
        old_path: Some(old_path),
        new_path: Some(new_path),
        ..Default::default()
      });
    } else if skipping {
      continue;
    } else if line.starts_with("@@") {
      if current_file.is_none() {
        // A hunk header with no owning file; nothing to attach it to.
        continue;
      }

      finish_hunk(&mut current_file, &mut current_hunk);
      match hunk_start_numbers(line) {
        Some((source_start, target_start)) => {
          current_hunk = Some(HunkMapper::new(line.to_string(), source_start, target_start));
        }
        None => log::warn!("Skipping hunk with unparseable header: {line}")
      }
    } else if current_hunk.is_some() {
      if let Some(content) = line.strip_prefix('+') {
        push_line(&mut current_hunk, LineKind::Added, content);
      } else if let Some(content) = line.strip_prefix('-') {
        push_line(&mut current_hunk, LineKind::Removed, content);
      } else if let Some(content) = line.strip_prefix(' ') {
        push_line(&mut current_hunk, LineKind::Context, content);
      } else if line.starts_with('\\') {
        // "\ No newline at end of file" carries no line of its own.
      } else {
        // Anything else terminates the hunk.
        finish_hunk(&mut current_file, &mut current_hunk);
      }
    } else if let Some(file) = current_file.as_mut() {
      apply_file_metadata(file, line);
    }
  }

  finish_hunk(&mut current_file, &mut current_hunk);
  finish_file(&mut files, &mut current_file);

  log::debug!("Parsed {} files from diff", files.len());
  files
}

/// Extracts the two paths from the remainder of a `diff --git a/<x> b/<y>`
/// line, stripping the conventional prefixes git uses (`a/`, `b/`, and the
/// `c/`/`i/` variants that appear in hook diffs).
fn boundary_paths(rest: &str) -> Option<(String, String)> {
  let parts: Vec<&str> = rest.split_whitespace().collect();
  if parts.len() != 2 {
    return None;
  }

  let strip_prefix = |s: &str| {
    s.strip_prefix("a/")
      .or_else(|| s.strip_prefix("b/"))
      .or_else(|| s.strip_prefix("c/"))
      .or_else(|| s.strip_prefix("i/"))
      .unwrap_or(s)
      .to_string()
  };

  Some((strip_prefix(parts[0]), strip_prefix(parts[1])))
}

/// Reads the start line numbers out of a `@@ -a[,b] +c[,d] @@` header.
///
/// Only the two start numbers are used; the declared lengths are ignored in
/// favor of incremental tracking while classifying lines.
fn hunk_start_numbers(line: &str) -> Option<(u32, u32)> {
  let rest = line.strip_prefix("@@ ")?;
  let (ranges, _) = rest.split_once(" @@")?;
  let (source, target) = ranges.split_once(' ')?;

  let start = |range: &str, marker: char| {
    let range = range.strip_prefix(marker)?;
    range.split(',').next()?.parse::<u32>().ok()
  };

  Some((start(source, '-')?, start(target, '+')?))
}

fn push_line(mapper: &mut Option<HunkMapper>, kind: LineKind, content: &str) {
  if let Some(mapper) = mapper.as_mut() {
    mapper.push(kind, content);
  }
}

/// Interprets file-header metadata lines between the boundary and the first
/// hunk. `/dev/null` in the `---`/`+++` lines marks creation or deletion;
/// the explicit mode lines do the same for diffs that omit them.
fn apply_file_metadata(file: &mut ParsedFile, line: &str) {
  if line.starts_with("new file mode") {
    file.is_new_file = true;
    file.old_path = None;
  } else if line.starts_with("deleted file mode") {
    file.is_deleted_file = true;
    file.new_path = None;
  } else if let Some(path) = line.strip_prefix("--- ") {
    if path.trim_end() == "/dev/null" {
      file.is_new_file = true;
      file.old_path = None;
    }
  } else if let Some(path) = line.strip_prefix("+++ ") {
    if path.trim_end() == "/dev/null" {
      file.is_deleted_file = true;
      file.new_path = None;
    }
  }
  // index, mode, rename, similarity and "Binary files" lines need no
  // handling; renames are derived from the boundary paths.
}

fn finish_hunk(file: &mut Option<ParsedFile>, mapper: &mut Option<HunkMapper>) {
  let Some(mapper) = mapper.take() else { return };
  let Some(file) = file.as_mut() else { return };

  if !mapper.is_empty() {
    file.hunks.push(mapper.finish());
  }
}

fn finish_file(files: &mut Vec<ParsedFile>, file: &mut Option<ParsedFile>) {
  let Some(mut file) = file.take() else { return };

  if file.is_deleted_file || file.new_path.is_none() {
    log::info!("Skipping deleted file: {:?}", file.old_path);
    return;
  }

  if file.hunks.is_empty() {
    log::debug!("Skipping file with no content changes: {:?}", file.display_path());
    return;
  }

  file.is_renamed_file = match (&file.old_path, &file.new_path) {
    (Some(old), Some(new)) => old != new && !file.is_new_file,
    _ => false
  };

  files.push(file);
}
