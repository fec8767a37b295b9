//! Error handling utilities for the review-ai CLI tool.
//!
//! This module provides helpers for detecting specific error types,
//! particularly authentication failures from the OpenAI API or the SCM.

use anyhow::Error;

/// Checks if an error represents an authentication failure.
///
/// Detects OpenAI API-key errors as well as SCM token failures (GitHub-style
/// "Bad credentials" responses and plain 401/403 statuses), so the CLI can
/// point the user at the right credential instead of dumping a stack trace.
pub fn is_auth_error(error: &Error) -> bool {
  let msg = error.to_string().to_lowercase();

  // OpenAI-specific API key errors
  msg.contains("invalid_api_key") ||
  msg.contains("incorrect api key") ||

  // SCM token failures
  msg.contains("bad credentials") ||
  msg.contains("status 401") ||
  msg.contains("status 403") ||

  // Generic auth failures (scoped to avoid false positives)
  (msg.contains("authentication") && msg.contains("openai")) ||
  (msg.contains("unauthorized") && msg.contains("openai"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use anyhow::anyhow;

  #[test]
  fn test_detects_invalid_api_key() {
    let error = anyhow!("invalid_api_key: Incorrect API key provided");
    assert!(is_auth_error(&error));
  }

  #[test]
  fn test_detects_incorrect_api_key() {
    let error = anyhow!("Incorrect API key provided: sk-xxxxx");
    assert!(is_auth_error(&error));
  }

  #[test]
  fn test_detects_scm_bad_credentials() {
    let error = anyhow!("SCM request failed with status 401 Unauthorized: Bad credentials");
    assert!(is_auth_error(&error));
  }

  #[test]
  fn test_detects_forbidden_status() {
    let error = anyhow!("Posting review failed with status 403 Forbidden: token lacks scope");
    assert!(is_auth_error(&error));
  }

  #[test]
  fn test_ignores_generic_auth_errors() {
    // Should not match auth errors without OpenAI or SCM context
    let error = anyhow!("Database authentication timeout");
    assert!(!is_auth_error(&error));
  }

  #[test]
  fn test_ignores_unrelated_errors() {
    let error = anyhow!("File not found");
    assert!(!is_auth_error(&error));
  }
}
