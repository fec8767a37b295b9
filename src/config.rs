use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::fs::File;

use serde::{Deserialize, Serialize};
use config::{Config, FileFormat};
use anyhow::{Context, Result};
use colored::*;
use url::Url;

// Constants
const DEFAULT_TIMEOUT: i64 = 30;
const DEFAULT_MAX_TOKENS: i64 = 2048;
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SCM_API_URL: &str = "https://api.github.com";
const DEFAULT_LOG_LEVEL: &str = "info";
const NULL_SHA: &str = "0000000000000000000000000000000000000000";

#[derive(Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct App {
  pub openai_api_key:   Option<String>,
  pub scm_token:        Option<String>,
  pub scm_api_url:      Option<String>,
  pub model:            Option<String>,
  pub max_tokens:       Option<usize>,
  pub timeout:          Option<usize>,
  pub log_level:        Option<String>,
  /// Comma-separated glob patterns; only matching files are reviewed.
  pub include_patterns: Option<String>,
  /// Comma-separated glob patterns; matching files are skipped.
  pub exclude_patterns: Option<String>
}

#[derive(Debug)]
pub struct ConfigPaths {
  pub dir:  PathBuf,
  pub file: PathBuf
}

impl ConfigPaths {
  fn new() -> Result<Self> {
    let dir = home::home_dir()
      .context("Failed to determine home directory")?
      .join(".config/review-ai");
    let file = dir.join("config.ini");
    Ok(Self { dir, file })
  }

  fn ensure_exists(&self) -> Result<()> {
    if !self.dir.exists() {
      std::fs::create_dir_all(&self.dir).with_context(|| format!("Failed to create config directory at {:?}", self.dir))?;
    }
    if !self.file.exists() {
      File::create(&self.file).with_context(|| format!("Failed to create config file at {:?}", self.file))?;
    }
    Ok(())
  }
}

impl App {
  /// Loads the layered configuration: INI file first, then `REVIEW_AI_*`
  /// environment variables on top, so CI settings win over the local file.
  pub fn load() -> Result<Self> {
    dotenv::dotenv().ok();
    let paths = ConfigPaths::new()?;
    paths.ensure_exists()?;

    let config = Config::builder()
      .add_source(config::File::new(paths.file.to_string_lossy().as_ref(), FileFormat::Ini).required(false))
      .add_source(config::Environment::with_prefix("REVIEW_AI").try_parsing(true))
      .set_default("timeout", DEFAULT_TIMEOUT)?
      .set_default("max_tokens", DEFAULT_MAX_TOKENS)?
      .set_default("model", DEFAULT_MODEL)?
      .set_default("scm_api_url", DEFAULT_SCM_API_URL)?
      .set_default("log_level", DEFAULT_LOG_LEVEL)?
      .build()?;

    config
      .try_deserialize()
      .context("Failed to deserialize existing config. Please delete ~/.config/review-ai/config.ini and try again")
  }

  pub fn save(&self) -> Result<()> {
    let paths = ConfigPaths::new()?;
    paths.ensure_exists()?;

    let contents = serde_ini::to_string(&self).context(format!("Failed to serialize config: {:?}", self))?;
    let mut file = File::create(&paths.file).with_context(|| format!("Failed to create config file at {:?}", paths.file))?;
    file
      .write_all(contents.as_bytes())
      .context("Failed to write config file")
  }

  pub fn update_model(&mut self, value: String) -> Result<()> {
    self.model = Some(value);
    self.save_with_message("model")
  }

  pub fn update_openai_api_key(&mut self, value: String) -> Result<()> {
    self.openai_api_key = Some(value);
    self.save_with_message("openai-api-key")
  }

  pub fn update_scm_token(&mut self, value: String) -> Result<()> {
    self.scm_token = Some(value);
    self.save_with_message("scm-token")
  }

  fn save_with_message(&self, option: &str) -> Result<()> {
    println!("{} Configuration option {} updated!", "✔".green(), option);
    self.save()
  }
}

/// Splits a comma-separated pattern list from the environment or config
/// file into individual patterns. Blank entries are dropped; an empty
/// result means "no patterns configured".
pub fn split_patterns(raw: Option<&str>) -> Option<Vec<String>> {
  let raw = raw?;
  let patterns: Vec<String> = raw
    .split(',')
    .map(str::trim)
    .filter(|pattern| !pattern.is_empty())
    .map(str::to_string)
    .collect();

  if patterns.is_empty() {
    None
  } else {
    Some(patterns)
  }
}

/// The kind of pull-request event that triggered this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiEvent {
  /// A freshly opened pull request; review the whole diff.
  Opened,
  /// New commits pushed to an existing pull request; review the delta.
  Synchronize
}

/// Pull-request coordinates resolved from Drone-style CI environment
/// variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiContext {
  pub owner:     String,
  pub repo:      String,
  pub pr_number: u64,
  pub head_sha:  String,
  pub base_sha:  Option<String>,
  pub event:     CiEvent
}

impl CiContext {
  /// Reads the CI environment. `Ok(None)` means the build is not a
  /// reviewable pull-request event, which is not an error.
  pub fn from_env() -> Result<Option<Self>> {
    let Some(pr_number) = env::var("DRONE_PULL_REQUEST").ok().and_then(|raw| raw.parse().ok()) else {
      log::info!("Not a PR event (DRONE_PULL_REQUEST not set or invalid)");
      return Ok(None);
    };

    let head_sha = env::var("DRONE_COMMIT_SHA")
      .or_else(|_| env::var("DRONE_COMMIT"))
      .or_else(|_| env::var("DRONE_COMMIT_AFTER"))
      .context("Could not determine head SHA from CI environment")?;

    let event = match env::var("DRONE_BUILD_EVENT").as_deref() {
      Ok("pull_request") => CiEvent::Opened,
      Ok("push") => CiEvent::Synchronize,
      other => {
        log::info!("Unhandled build event {other:?} for PR review");
        return Ok(None);
      }
    };

    let base_sha = match event {
      CiEvent::Opened => env::var("DRONE_PULL_REQUEST_BASE_SHA").ok(),
      CiEvent::Synchronize => {
        let before = env::var("DRONE_COMMIT_BEFORE").ok().filter(|sha| sha != NULL_SHA);
        let Some(before) = before else {
          log::warn!("DRONE_COMMIT_BEFORE is missing for a synchronize event");
          return Ok(None);
        };
        if before == head_sha {
          log::info!("Base SHA equals head SHA, no changes to review");
          return Ok(None);
        }
        Some(before)
      }
    };

    let (owner, repo) = repo_coordinates().context("Could not determine repository owner and name")?;

    Ok(Some(Self { owner, repo, pr_number, head_sha, base_sha, event }))
  }
}

fn repo_coordinates() -> Option<(String, String)> {
  if let Some((owner, repo)) = env::var("DRONE_REPO_LINK").ok().as_deref().and_then(parse_repo_link) {
    return Some((owner, repo));
  }

  let owner = env::var("DRONE_REPO_OWNER").ok()?;
  let repo = env::var("DRONE_REPO_NAME").ok()?;
  Some((owner, repo))
}

/// Extracts `(owner, repo)` from a repository web link such as
/// `https://github.com/acme/widgets.git`. Nested namespaces keep their
/// slashes in the owner part.
pub fn parse_repo_link(link: &str) -> Option<(String, String)> {
  let url = Url::parse(link).ok()?;
  let mut segments: Vec<&str> = url.path_segments()?.filter(|segment| !segment.is_empty()).collect();

  let last = segments.pop()?;
  let repo = last.strip_suffix(".git").unwrap_or(last);
  if repo.is_empty() || segments.is_empty() {
    return None;
  }

  Some((segments.join("/"), repo.to_string()))
}
