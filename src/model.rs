use std::default::Default;
use std::fmt::{self, Display};
use std::str::FromStr;

use anyhow::{bail, Result};
use tiktoken_rs::get_bpe_from_model;
use tiktoken_rs::model::get_context_size;

// Model identifiers
const MODEL_GPT4O: &str = "gpt-4o";
const MODEL_GPT4O_MINI: &str = "gpt-4o-mini";
const MODEL_GPT4_TURBO: &str = "gpt-4-turbo-preview";

/// The OpenAI chat models the reviewer can run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Model {
  /// Optimized GPT-4 model
  GPT4o,
  /// Smaller, cheaper GPT-4 variant; the default for reviews
  #[default]
  GPT4oMini,
  /// GPT-4 Turbo preview model
  GPT4Turbo
}

impl Model {
  /// Counts the tokens `text` occupies in this model's encoding. Used to
  /// keep review prompts inside the context window.
  pub fn count_tokens(&self, text: &str) -> Result<usize> {
    let encoding = get_bpe_from_model(self.into())?;
    Ok(encoding.encode_with_special_tokens(text).len())
  }

  pub fn context_size(&self) -> usize {
    get_context_size(self.into())
  }
}

impl From<&Model> for &str {
  fn from(model: &Model) -> Self {
    match model {
      Model::GPT4o => MODEL_GPT4O,
      Model::GPT4oMini => MODEL_GPT4O_MINI,
      Model::GPT4Turbo => MODEL_GPT4_TURBO
    }
  }
}

impl FromStr for Model {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      MODEL_GPT4O => Ok(Model::GPT4o),
      MODEL_GPT4O_MINI => Ok(Model::GPT4oMini),
      MODEL_GPT4_TURBO => Ok(Model::GPT4Turbo),
      model => bail!("Invalid model: {}", model)
    }
  }
}

impl Display for Model {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", <&str>::from(self))
  }
}

impl From<&str> for Model {
  fn from(s: &str) -> Self {
    s.parse().unwrap_or_default()
  }
}

impl From<String> for Model {
  fn from(s: String) -> Self {
    s.as_str().into()
  }
}
