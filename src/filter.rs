//! Path-pattern filtering for reviewable files.

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Decides which files participate in a review, based on optional include
/// and exclude pattern sets supplied by the caller.
///
/// Patterns use git-style wildcard semantics: `*` matches within a path
/// segment, `**` matches across segments, and a pattern without a `/` is
/// matched at any depth. Paths pass the include stage when no include
/// patterns are configured or at least one matches, then any exclude match
/// removes them — exclude wins when both sides match.
#[derive(Debug, Default)]
pub struct PathFilter {
  include: Option<GlobSet>,
  exclude: Option<GlobSet>
}

impl PathFilter {
  /// Compiles the pattern sets. An empty list behaves like an absent one.
  pub fn new(include: Option<&[String]>, exclude: Option<&[String]>) -> Result<Self> {
    Ok(Self { include: build_globset(include)?, exclude: build_globset(exclude)? })
  }

  /// A filter that lets every path through.
  pub fn permissive() -> Self {
    Self::default()
  }

  pub fn matches(&self, path: &str) -> bool {
    if let Some(include) = &self.include {
      if !include.is_match(path) {
        return false;
      }
    }

    match &self.exclude {
      Some(exclude) => !exclude.is_match(path),
      None => true
    }
  }

  /// Applies the filter to a sequence of paths, preserving order and
  /// duplicates.
  pub fn filter<'a>(&self, paths: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    paths.into_iter().filter(|path| self.matches(path)).collect()
  }
}

fn build_globset(patterns: Option<&[String]>) -> Result<Option<GlobSet>> {
  let Some(patterns) = patterns else { return Ok(None) };
  if patterns.is_empty() {
    return Ok(None);
  }

  let mut builder = GlobSetBuilder::new();
  for pattern in patterns {
    // A bare pattern like `*.lock` matches at any depth, as git does.
    let anchored = if pattern.contains('/') {
      pattern.clone()
    } else {
      format!("**/{pattern}")
    };

    let glob = GlobBuilder::new(&anchored)
      .literal_separator(true)
      .build()
      .with_context(|| format!("Invalid file pattern: {pattern}"))?;
    builder.add(glob);
  }

  builder.build().map(Some).map_err(Into::into)
}
