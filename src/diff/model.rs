//! Structured representation of a parsed diff.

use std::collections::BTreeMap;

/// Classification of a single diff line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
  Context,
  Added,
  Removed
}

impl LineKind {
  /// The marker character this kind carries in unified-diff output.
  pub fn marker(&self) -> char {
    match self {
      LineKind::Context => ' ',
      LineKind::Added => '+',
      LineKind::Removed => '-'
    }
  }
}

/// One line of a hunk with the marker stripped and its absolute line numbers
/// in both file versions, where those exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
  pub kind:               LineKind,
  pub content:            String,
  /// Line number in the new file; present for context and added lines.
  pub target_line_number: Option<u32>,
  /// Line number in the old file; present for context and removed lines.
  pub source_line_number: Option<u32>
}

/// Where a target line sits inside its hunk: the hunk-relative line number
/// and the diff-relative position review APIs anchor inline comments to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePosition {
  pub hunk_line: u32,
  pub position:  u32
}

/// A contiguous block of changes delimited by a `@@ ... @@` header.
///
/// `line_position_map` is keyed by absolute target line number and only holds
/// entries for lines that exist in the new file (context and added lines).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hunk {
  pub header:            String,
  pub lines:             Vec<ClassifiedLine>,
  pub line_position_map: BTreeMap<u32, LinePosition>
}

impl Hunk {
  /// Renders the hunk for a downstream text consumer: the header line
  /// followed by each diff line prefixed with its effective line number
  /// (target if present, source otherwise) and its raw marker and content.
  pub fn annotated_text(&self) -> String {
    let mut out = String::with_capacity(self.header.len() + self.lines.len() * 48);
    out.push_str(self.header.trim_end());

    for line in &self.lines {
      let number = line
        .target_line_number
        .or(line.source_line_number)
        .unwrap_or_default();
      out.push('\n');
      out.push_str(&number.to_string());
      out.push(' ');
      out.push(line.kind.marker());
      out.push_str(&line.content);
    }

    out
  }
}

/// A single file in a diff, owning its hunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFile {
  /// Path before the change; absent for newly created files.
  pub old_path:        Option<String>,
  /// Path after the change; absent for deleted files.
  pub new_path:        Option<String>,
  pub is_new_file:     bool,
  pub is_deleted_file: bool,
  pub is_renamed_file: bool,
  pub hunks:           Vec<Hunk>
}

impl ParsedFile {
  /// The path used to identify this file to external systems: the new path,
  /// or the old path when the file no longer exists.
  pub fn display_path(&self) -> Option<&str> {
    self.new_path.as_deref().or(self.old_path.as_deref())
  }
}
