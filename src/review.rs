//! The review pipeline: diff text in, positioned inline comments out.
//!
//! The pipeline talks to its collaborators through narrow traits so each
//! seam can be exercised independently: something that produces diff text,
//! something that turns a rendered hunk into line-keyed suggestions, and
//! something that records the positioned comments.

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Deserializer, Serialize};

use crate::diff::{self, ParsedFile};
use crate::filter::PathFilter;
use crate::profile;

/// A single piece of feedback for a hunk, keyed by the absolute line number
/// in the new version of the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSuggestion {
  #[serde(deserialize_with = "line_number_from_any")]
  pub line_number:    u32,
  pub review_comment: String
}

// Models sometimes return the line number as a quoted string.
fn line_number_from_any<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
  D: Deserializer<'de>
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Number(u32),
    Text(String)
  }

  match Raw::deserialize(deserializer)? {
    Raw::Number(number) => Ok(number),
    Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom)
  }
}

/// A suggestion translated into the coordinates the posting API expects:
/// display path plus diff-relative position within the file's diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedComment {
  pub path:     String,
  pub position: u32,
  pub body:     String
}

/// Supplies raw unified-diff text for one review run.
#[async_trait]
pub trait DiffSource: Send + Sync {
  async fn fetch_diff(&self) -> Result<String>;
}

/// Produces review suggestions for one rendered hunk of one file.
#[async_trait]
pub trait FeedbackProducer: Send + Sync {
  async fn review_hunk(&self, file_path: &str, hunk_text: &str) -> Result<Vec<ReviewSuggestion>>;
}

/// Records positioned comments against the pull request.
#[async_trait]
pub trait CommentPoster: Send + Sync {
  async fn post_comments(&self, comments: &[PositionedComment]) -> Result<()>;
}

/// Requests feedback for every hunk of every file concurrently and resolves
/// each suggestion's absolute line number to its diff position.
///
/// Suggestions aimed at lines outside any hunk are dropped — a comment can
/// only be anchored to a line the diff actually touches. Failed hunk
/// requests are logged and skipped; one bad hunk never sinks the review.
pub async fn collect_comments(files: &[ParsedFile], producer: &dyn FeedbackProducer) -> Vec<PositionedComment> {
  profile!("Collect review feedback");

  let mut requests = Vec::new();
  for file in files {
    let Some(path) = file.display_path() else { continue };
    for hunk in &file.hunks {
      let hunk_text = hunk.annotated_text();
      requests.push(async move { (file, path, producer.review_hunk(path, &hunk_text).await) });
    }
  }

  let mut comments = Vec::new();
  for (file, path, result) in join_all(requests).await {
    let suggestions = match result {
      Ok(suggestions) => suggestions,
      Err(err) => {
        log::warn!("Review request for {path} failed: {err}");
        continue;
      }
    };

    for suggestion in suggestions {
      match diff::resolve(file, suggestion.line_number) {
        Some(position) => comments.push(PositionedComment {
          path: path.to_string(),
          position,
          body: suggestion.review_comment
        }),
        None => {
          log::warn!(
            "Dropping comment for {path} line {}: the line is not part of the diff",
            suggestion.line_number
          );
        }
      }
    }
  }

  comments
}

/// Drives one full review: fetch the diff, parse it, collect feedback, post
/// the comments. Returns the number of comments posted.
///
/// A diff source failure or an empty diff means there is nothing to review,
/// not that the run failed.
pub async fn run(
  source: &dyn DiffSource,
  filter: &PathFilter,
  producer: &dyn FeedbackProducer,
  poster: &dyn CommentPoster
) -> Result<usize> {
  let diff_text = match source.fetch_diff().await {
    Ok(text) => text,
    Err(err) => {
      log::warn!("Could not fetch diff, nothing to review: {err}");
      return Ok(0);
    }
  };

  let files = diff::parse_diff(&diff_text, filter);
  if files.is_empty() {
    log::info!("No reviewable files found after parsing diff");
    return Ok(0);
  }

  log::info!("Reviewing {} files", files.len());

  let comments = collect_comments(&files, producer).await;
  if comments.is_empty() {
    log::info!("No review comments produced");
    return Ok(0);
  }

  log::info!("Posting {} review comments", comments.len());
  poster.post_comments(&comments).await?;

  Ok(comments.len())
}
