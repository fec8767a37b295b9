//! Local diff generation through libgit2.
//!
//! Lets the reviewer run against a revision range in a local checkout,
//! without any SCM in the loop.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use git2::{DiffFormat, DiffOptions, Repository, Tree};

use crate::review::DiffSource;

/// Renders the diff between two revisions as unified-diff text with zero
/// context lines, the shape the parser is tuned for.
pub fn diff_between(repo_path: &Path, base: &str, head: &str) -> Result<String> {
  let repo = Repository::open(repo_path).with_context(|| format!("Failed to open repository at {}", repo_path.display()))?;

  let base_tree = tree_for(&repo, base)?;
  let head_tree = tree_for(&repo, head)?;

  let mut opts = DiffOptions::new();
  opts.context_lines(0);

  let diff = repo
    .diff_tree_to_tree(Some(&base_tree), Some(&head_tree), Some(&mut opts))
    .context("Failed to diff revisions")?;

  let mut text = String::new();
  diff
    .print(DiffFormat::Patch, |_delta, _hunk, line| {
      match line.origin() {
        '+' | '-' | ' ' => text.push(line.origin()),
        _ => {}
      }
      text.push_str(&String::from_utf8_lossy(line.content()));
      true
    })
    .context("Failed to render diff")?;

  Ok(text)
}

fn tree_for<'a>(repo: &'a Repository, revision: &str) -> Result<Tree<'a>> {
  let object = repo
    .revparse_single(revision)
    .with_context(|| format!("Unknown revision: {revision}"))?;
  object.peel_to_tree().context("Revision does not point at a tree")
}

/// A [`DiffSource`] backed by a local repository and a revision range.
pub struct LocalDiffSource {
  repo_path: PathBuf,
  base:      String,
  head:      String
}

impl LocalDiffSource {
  pub fn new(repo_path: PathBuf, base: String, head: String) -> Self {
    Self { repo_path, base, head }
  }
}

#[async_trait]
impl DiffSource for LocalDiffSource {
  async fn fetch_diff(&self) -> Result<String> {
    diff_between(&self.repo_path, &self.base, &self.head)
  }
}
