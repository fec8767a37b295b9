//! LLM-backed feedback producer.
//!
//! Sends each rendered hunk to an OpenAI chat model and parses the JSON
//! feedback into line-keyed suggestions.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::model::Model;
use crate::openai::{self, Request};
use crate::review::{FeedbackProducer, ReviewSuggestion};

const MAX_RESPONSE_TOKENS: u16 = 2048;

pub struct LlmReviewer {
  api_key:        String,
  model:          Model,
  pr_title:       String,
  pr_description: String
}

impl LlmReviewer {
  pub fn new(api_key: String, model: Model) -> Self {
    Self {
      api_key,
      model,
      pr_title: "N/A".to_string(),
      pr_description: "N/A".to_string()
    }
  }

  /// Adds pull-request context to the review prompt.
  pub fn with_pull_request(mut self, title: Option<String>, description: Option<String>) -> Self {
    if let Some(title) = title {
      self.pr_title = title;
    }
    if let Some(description) = description {
      self.pr_description = description;
    }
    self
  }

  fn system_prompt(&self, file_path: &str) -> String {
    format!(
      "You are an expert code reviewer. Review the diff hunk the user provides and respond with a JSON object of this exact shape: {{\"reviews\": [{{\"lineNumber\": <number>, \"reviewComment\": \"<comment>\"}}]}}

- Each diff line below is prefixed with its line number in the file; use that number as lineNumber.
- Only comment on lines that were added or changed, and only when there is something concrete to improve.
- Do not suggest adding code comments, and do not compliment the code.
- Return {{\"reviews\": []}} when nothing is worth raising.

Pull request title: {}
Pull request description:
{}

The hunk under review is from the file {}.",
      self.pr_title, self.pr_description, file_path
    )
  }
}

#[async_trait]
impl FeedbackProducer for LlmReviewer {
  async fn review_hunk(&self, file_path: &str, hunk_text: &str) -> Result<Vec<ReviewSuggestion>> {
    log::info!("Requesting review for a hunk of {file_path}");

    let request = Request {
      system:     self.system_prompt(file_path),
      prompt:     hunk_text.to_string(),
      max_tokens: MAX_RESPONSE_TOKENS,
      model:      self.model
    };

    let response = openai::call(&self.api_key, request).await?;
    let suggestions = parse_review_response(&response.response)?;

    log::info!("Received {} suggestions for {file_path}", suggestions.len());
    Ok(suggestions)
  }
}

#[derive(Debug, Deserialize)]
struct ReviewEnvelope {
  #[serde(default)]
  reviews: Vec<ReviewSuggestion>
}

/// Parses the model's JSON feedback, tolerating a Markdown code fence
/// around the object.
pub fn parse_review_response(content: &str) -> Result<Vec<ReviewSuggestion>> {
  let envelope: ReviewEnvelope =
    serde_json::from_str(strip_code_fence(content)).context("Failed to parse review response as JSON")?;
  Ok(envelope.reviews)
}

fn strip_code_fence(text: &str) -> &str {
  let trimmed = text.trim();
  let Some(inner) = trimmed.strip_prefix("```") else { return trimmed };

  let inner = inner.strip_prefix("json").unwrap_or(inner);
  inner
    .trim_start_matches('\n')
    .trim_end_matches('`')
    .trim_end()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_plain_json_response() {
    let content = r#"{"reviews": [{"lineNumber": 12, "reviewComment": "Use a named constant here."}]}"#;

    let suggestions = parse_review_response(content).unwrap();

    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].line_number, 12);
  }

  #[test]
  fn test_parse_fenced_json_response() {
    let content = "```json\n{\"reviews\": [{\"lineNumber\": 3, \"reviewComment\": \"Handle the error.\"}]}\n```";

    let suggestions = parse_review_response(content).unwrap();

    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].line_number, 3);
  }

  #[test]
  fn test_parse_empty_reviews() {
    assert!(parse_review_response(r#"{"reviews": []}"#).unwrap().is_empty());
  }

  #[test]
  fn test_missing_reviews_key_means_no_suggestions() {
    assert!(parse_review_response("{}").unwrap().is_empty());
  }

  #[test]
  fn test_non_json_response_is_an_error() {
    assert!(parse_review_response("I could not review this.").is_err());
  }

  #[test]
  fn test_system_prompt_mentions_file_and_pr() {
    let reviewer = LlmReviewer::new("key".to_string(), Model::GPT4oMini)
      .with_pull_request(Some("Add caching".to_string()), Some("Speeds up lookups".to_string()));

    let prompt = reviewer.system_prompt("src/cache.rs");

    assert!(prompt.contains("src/cache.rs"));
    assert!(prompt.contains("Add caching"));
    assert!(prompt.contains("Speeds up lookups"));
  }
}
