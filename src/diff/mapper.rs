//! Per-hunk line-number and diff-position bookkeeping.

use super::model::{ClassifiedLine, Hunk, LineKind, LinePosition};

/// Accumulates classified lines for one hunk.
///
/// Tracks four counters: the absolute source and target line numbers, seeded
/// from the hunk header's start numbers, and the hunk-local line and
/// diff-position counters, which restart at 1 for every hunk. Review APIs
/// anchor inline comments to the hunk-local position, so positions never
/// accumulate across hunks.
#[derive(Debug)]
pub struct HunkMapper {
  hunk:        Hunk,
  source_line: u32,
  target_line: u32,
  hunk_line:   u32,
  position:    u32
}

impl HunkMapper {
  /// Starts a new hunk. `source_start` and `target_start` come from the
  /// `@@ -a[,b] +c[,d] @@` header line, which is carried verbatim in
  /// `header`; its length fields are never consulted.
  pub fn new(header: String, source_start: u32, target_start: u32) -> Self {
    Self {
      hunk: Hunk { header, ..Default::default() },
      source_line: source_start,
      target_line: target_start,
      hunk_line: 1,
      position: 1
    }
  }

  /// Classifies one diff line and advances the counters.
  ///
  /// Context and added lines consume a target line, a hunk line, and a diff
  /// position, and are recorded in the target-keyed map. Removed lines
  /// consume only a source line and a diff position; they have no target
  /// line and are never recorded.
  pub fn push(&mut self, kind: LineKind, content: &str) {
    let (source, target) = match kind {
      LineKind::Context => (Some(self.source_line), Some(self.target_line)),
      LineKind::Added => (None, Some(self.target_line)),
      LineKind::Removed => (Some(self.source_line), None)
    };

    if let Some(target) = target {
      self
        .hunk
        .line_position_map
        .insert(target, LinePosition { hunk_line: self.hunk_line, position: self.position });
    }

    self.hunk.lines.push(ClassifiedLine {
      kind,
      content: content.to_string(),
      target_line_number: target,
      source_line_number: source
    });

    match kind {
      LineKind::Context => {
        self.source_line += 1;
        self.target_line += 1;
        self.hunk_line += 1;
      }
      LineKind::Added => {
        self.target_line += 1;
        self.hunk_line += 1;
      }
      LineKind::Removed => {
        self.source_line += 1;
      }
    }

    self.position += 1;
  }

  pub fn is_empty(&self) -> bool {
    self.hunk.lines.is_empty()
  }

  pub fn finish(self) -> Hunk {
    self.hunk
  }
}
