use async_openai::types::{
  ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat
};
use async_openai::config::OpenAIConfig;
use async_openai::Client;
use async_openai::error::OpenAIError;
use anyhow::{anyhow, Context, Result};
use colored::*;

use crate::profile;
use crate::model::Model;

const BUFFER_TOKENS: usize = 4096;
const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
  pub response: String
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
  pub prompt:     String,
  pub system:     String,
  pub max_tokens: u16,
  pub model:      Model
}

fn truncate_to_fit(text: &str, max_tokens: usize, model: &Model) -> Result<String> {
  let token_count = model.count_tokens(text)?;
  if token_count <= max_tokens {
    return Ok(text.to_string());
  }

  let lines: Vec<&str> = text.lines().collect();

  // Try increasingly aggressive truncation until we fit
  for attempt in 0..MAX_ATTEMPTS {
    let portion_size = match attempt {
      0 => lines.len() / 8,  // First try: Keep 25% (12.5% each end)
      1 => lines.len() / 12, // Second try: Keep ~16% (8% each end)
      _ => lines.len() / 20  // Final try: Keep 10% (5% each end)
    };

    let mut truncated = Vec::new();
    truncated.extend(lines.iter().take(portion_size));
    truncated.push("... (truncated for length) ...");
    truncated.extend(lines.iter().rev().take(portion_size).rev());

    let result = truncated.join("\n");
    let new_token_count = model.count_tokens(&result)?;

    if new_token_count <= max_tokens {
      return Ok(result);
    }
  }

  // If all attempts failed, return a minimal version
  let mut minimal = Vec::new();
  minimal.extend(lines.iter().take(lines.len() / 50));
  minimal.push("... (severely truncated for length) ...");
  minimal.extend(lines.iter().rev().take(lines.len() / 50).rev());
  Ok(minimal.join("\n"))
}

/// Sends one chat completion request, asking the model for a JSON object
/// response and truncating the prompt to fit the context window.
pub async fn call(api_key: &str, request: Request) -> Result<Response> {
  profile!("OpenAI API call");

  let config = OpenAIConfig::new().with_api_key(api_key);
  let client = Client::with_config(config);

  // Calculate available tokens for the prompt
  let system_tokens = request.model.count_tokens(&request.system)?;
  let available_tokens = request
    .model
    .context_size()
    .saturating_sub(system_tokens + BUFFER_TOKENS + request.max_tokens as usize);

  let truncated_prompt = truncate_to_fit(&request.prompt, available_tokens, &request.model)?;

  let request = CreateChatCompletionRequestArgs::default()
    .max_tokens(request.max_tokens)
    .model(request.model.to_string())
    .response_format(ResponseFormat::JsonObject)
    .messages([
      ChatCompletionRequestSystemMessageArgs::default()
        .content(request.system)
        .build()?
        .into(),
      ChatCompletionRequestUserMessageArgs::default()
        .content(truncated_prompt)
        .build()?
        .into()
    ])
    .build()?;

  {
    profile!("OpenAI request/response");
    let response = match client.chat().create(request).await {
      Ok(response) => response,
      Err(err) => {
        let error_msg = match err {
          OpenAIError::ApiError(e) =>
            format!(
              "{} {}\n    {}\n\nSuggested Actions:\n    1. {}\n    2. {}",
              "ERROR:".bold().bright_red(),
              "OpenAI API error:".bright_white(),
              e.message.dimmed(),
              "Ensure your OpenAI API key is valid".yellow(),
              "Check your account credits".yellow()
            ),
          OpenAIError::Reqwest(e) =>
            format!(
              "{} {}\n    {}\n\nSuggested Actions:\n    1. {}\n    2. {}",
              "ERROR:".bold().bright_red(),
              "Network error:".bright_white(),
              e.to_string().dimmed(),
              "Check your internet connection".yellow(),
              "Verify OpenAI service is not experiencing downtime".yellow()
            ),
          _ =>
            format!(
              "{} {}\n    {}",
              "ERROR:".bold().bright_red(),
              "Unexpected error:".bright_white(),
              err.to_string().dimmed()
            ),
        };
        return Err(anyhow!(error_msg));
      }
    };

    let content = response
      .choices
      .first()
      .context("No choices returned")?
      .message
      .content
      .clone()
      .context("No content returned")?;

    Ok(Response { response: content })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_keeps_short_text_intact() {
    let text = "short prompt";
    let result = truncate_to_fit(text, 1000, &Model::GPT4oMini).unwrap();
    assert_eq!(result, text);
  }

  #[test]
  fn test_truncate_shrinks_long_text() {
    let text = (0..5000)
      .map(|i| format!("line number {i} with some padding text"))
      .collect::<Vec<_>>()
      .join("\n");

    let result = truncate_to_fit(&text, 500, &Model::GPT4oMini).unwrap();

    assert!(result.len() < text.len());
    assert!(result.contains("truncated for length"));
  }
}
