//! GitHub-style SCM REST client.
//!
//! Fetches pull-request diffs and posts review comments. This is the only
//! place the reviewer talks to the code-review API; everything upstream
//! works in parsed structures and diff-relative positions.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Serialize;

use crate::review::{CommentPoster, DiffSource, PositionedComment};

const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";
const JSON_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which diff one review run covers: the whole pull request, or only the
/// commits pushed since the previous head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffStrategy {
  FullPullRequest,
  CompareCommits { base: String, head: String }
}

pub struct ScmClient {
  http:      reqwest::Client,
  base_url:  String,
  token:     String,
  owner:     String,
  repo:      String,
  pr_number: u64,
  head_sha:  String,
  strategy:  DiffStrategy
}

impl ScmClient {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    base_url: String,
    token: String,
    owner: String,
    repo: String,
    pr_number: u64,
    head_sha: String,
    strategy: DiffStrategy
  ) -> Result<Self> {
    let http = reqwest::Client::builder()
      .user_agent(concat!("review-ai/", env!("CARGO_PKG_VERSION")))
      .timeout(REQUEST_TIMEOUT)
      .build()
      .context("Failed to build HTTP client")?;

    log::info!("SCM client initialized for {base_url}");

    Ok(Self {
      http,
      base_url: base_url.trim_end_matches('/').to_string(),
      token,
      owner,
      repo,
      pr_number,
      head_sha,
      strategy
    })
  }

  async fn get_text(&self, endpoint: &str, accept: &str) -> Result<String> {
    let url = format!("{}{}", self.base_url, endpoint);
    log::debug!("SCM GET {url}");

    let response = self
      .http
      .get(&url)
      .header(AUTHORIZATION, format!("token {}", self.token))
      .header(ACCEPT, accept)
      .header(API_VERSION_HEADER, API_VERSION)
      .send()
      .await
      .with_context(|| format!("SCM request to {url} failed"))?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
      bail!("SCM request to {url} failed with status {status}: {}", snippet(&body));
    }

    Ok(body)
  }

  /// Fetches the diff for the whole pull request via the diff media type.
  pub async fn pull_request_diff(&self) -> Result<String> {
    let endpoint = format!("/repos/{}/{}/pulls/{}", self.owner, self.repo, self.pr_number);
    log::info!("Fetching full diff for PR #{}", self.pr_number);

    let diff = self.get_text(&endpoint, DIFF_MEDIA_TYPE).await?;
    log::info!("Fetched PR diff ({} bytes)", diff.len());
    Ok(diff)
  }

  /// Fetches the diff between two revisions, used when reviewing only the
  /// commits pushed since the last review.
  pub async fn compare_diff(&self, base: &str, head: &str) -> Result<String> {
    let endpoint = format!("/repos/{}/{}/compare/{base}...{head}", self.owner, self.repo);
    log::info!("Fetching comparison diff ({base}..{head})");

    let diff = self.get_text(&endpoint, DIFF_MEDIA_TYPE).await?;
    log::info!("Fetched comparison diff ({} bytes)", diff.len());
    Ok(diff)
  }

  /// Posts one review containing every positioned comment.
  pub async fn post_review(&self, comments: &[PositionedComment]) -> Result<()> {
    if comments.is_empty() {
      log::info!("No comments to post");
      return Ok(());
    }

    let endpoint = format!("/repos/{}/{}/pulls/{}/reviews", self.owner, self.repo, self.pr_number);
    let url = format!("{}{}", self.base_url, endpoint);
    let payload = ReviewPayload::new(&self.head_sha, comments);

    log::info!("Posting {} review comments to PR #{}", comments.len(), self.pr_number);
    log::debug!("Review payload: {}", serde_json::to_string(&payload).unwrap_or_default());

    let response = self
      .http
      .post(&url)
      .header(AUTHORIZATION, format!("token {}", self.token))
      .header(ACCEPT, JSON_MEDIA_TYPE)
      .header(API_VERSION_HEADER, API_VERSION)
      .json(&payload)
      .send()
      .await
      .with_context(|| format!("SCM request to {url} failed"))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      bail!("Posting review failed with status {status}: {}", snippet(&body));
    }

    Ok(())
  }
}

#[async_trait]
impl DiffSource for ScmClient {
  async fn fetch_diff(&self) -> Result<String> {
    match &self.strategy {
      DiffStrategy::FullPullRequest => self.pull_request_diff().await,
      DiffStrategy::CompareCommits { base, head } => self.compare_diff(base, head).await
    }
  }
}

#[async_trait]
impl CommentPoster for ScmClient {
  async fn post_comments(&self, comments: &[PositionedComment]) -> Result<()> {
    self.post_review(comments).await
  }
}

#[derive(Debug, Serialize)]
struct ReviewPayload<'a> {
  commit_id: &'a str,
  event:     &'a str,
  body:      &'a str,
  comments:  Vec<CommentPayload<'a>>
}

#[derive(Debug, Serialize)]
struct CommentPayload<'a> {
  path:     &'a str,
  body:     &'a str,
  position: u32
}

impl<'a> ReviewPayload<'a> {
  fn new(commit_id: &'a str, comments: &'a [PositionedComment]) -> Self {
    Self {
      commit_id,
      event: "COMMENT",
      body: "AI code review suggestions",
      comments: comments
        .iter()
        .map(|comment| CommentPayload { path: &comment.path, body: &comment.body, position: comment.position })
        .collect()
    }
  }
}

fn snippet(body: &str) -> &str {
  let end = body
    .char_indices()
    .take_while(|(i, _)| *i < 500)
    .last()
    .map(|(i, c)| i + c.len_utf8())
    .unwrap_or(0);
  &body[..end]
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_review_payload_shape() {
    let comments = vec![
      PositionedComment {
        path:     "src/app.rs".to_string(),
        position: 3,
        body:     "Handle the error instead of ignoring it.".to_string()
      },
      PositionedComment {
        path:     "src/lib.rs".to_string(),
        position: 1,
        body:     "This allocation is avoidable.".to_string()
      }
    ];

    let payload = ReviewPayload::new("abc123", &comments);
    let value = serde_json::to_value(&payload).unwrap();

    assert_eq!(
      value,
      json!({
        "commit_id": "abc123",
        "event": "COMMENT",
        "body": "AI code review suggestions",
        "comments": [
          {"path": "src/app.rs", "body": "Handle the error instead of ignoring it.", "position": 3},
          {"path": "src/lib.rs", "body": "This allocation is avoidable.", "position": 1}
        ]
      })
    );
  }

  #[test]
  fn test_snippet_truncates_on_char_boundary() {
    let body = "é".repeat(400);
    let cut = snippet(&body);

    assert!(cut.len() <= 501);
    assert!(body.starts_with(cut));
  }
}
