use std::path::PathBuf;
use std::process::exit;
use std::str::FromStr;

use anyhow::{bail, Result};
use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};
use colored::*;

use reviewer::config::{self, App, CiContext, CiEvent};
use reviewer::error::is_auth_error;
use reviewer::filter::PathFilter;
use reviewer::git::LocalDiffSource;
use reviewer::llm::LlmReviewer;
use reviewer::model::Model;
use reviewer::review::{self, CommentPoster, PositionedComment};
use reviewer::scm::{DiffStrategy, ScmClient};

fn cli() -> Command {
  Command::new("review-ai")
    .about("Reviews pull requests with OpenAI and posts inline comments")
    .subcommand_required(true)
    .arg_required_else_help(true)
    .subcommand(Command::new("review").about("Reviews the pull request described by the CI environment"))
    .subcommand(
      Command::new("local")
        .about("Reviews a local revision range and prints the comments")
        .arg(Arg::new("base").required(true).help("Base revision"))
        .arg(Arg::new("head").required(true).help("Head revision"))
        .arg(Arg::new("repo").long("repo").default_value(".").help("Path to the repository"))
    )
    .subcommand(
      Command::new("config").about("Updates configuration values").subcommand_required(true).subcommand(
        Command::new("set")
          .about("Sets a configuration value")
          .arg(Arg::new("key").required(true).value_parser(["model", "openai-api-key", "scm-token"]))
          .arg(Arg::new("value").required(true))
      )
    )
}

#[tokio::main]
async fn main() -> Result<()> {
  let app = App::load()?;
  init_logging(&app);

  let args = cli().get_matches();

  let outcome = match args.subcommand() {
    Some(("review", _)) => run_review(&app).await,
    Some(("local", matches)) => run_local(&app, matches).await,
    Some(("config", matches)) => run_config(app, matches),
    _ => unreachable!()
  };

  if let Err(err) = outcome {
    if is_auth_error(&err) {
      eprintln!(
        "{} {}\n    Run: {}",
        "ERROR:".bold().bright_red(),
        "Authentication failed. Check your OpenAI API key and SCM token.".bright_white(),
        "review-ai config set openai-api-key <key>".yellow()
      );
    }
    log::error!("{err:?}");
    exit(1);
  }

  Ok(())
}

fn init_logging(app: &App) {
  let level = app.log_level.as_deref().unwrap_or("info");
  env_logger::Builder::new().parse_filters(level).init();
}

/// Runs the CI review flow: resolve the PR from the environment, fetch its
/// diff from the SCM, and post the resulting comments back.
async fn run_review(app: &App) -> Result<usize> {
  let Some(ci) = CiContext::from_env()? else {
    log::info!("Nothing to review for this build");
    return Ok(0);
  };

  let strategy = match (ci.event, ci.base_sha.clone()) {
    (CiEvent::Synchronize, Some(base)) => DiffStrategy::CompareCommits { base, head: ci.head_sha.clone() },
    _ => DiffStrategy::FullPullRequest
  };

  let scm = ScmClient::new(
    app.scm_api_url.clone().unwrap_or_default(),
    required(app.scm_token.clone(), "scm-token")?,
    ci.owner.clone(),
    ci.repo.clone(),
    ci.pr_number,
    ci.head_sha.clone(),
    strategy
  )?;

  let producer = reviewer_from(app)?;
  let filter = filter_from(app)?;

  review::run(&scm, &filter, &producer, &scm).await
}

/// Reviews a local revision range and prints the comments instead of
/// posting them anywhere.
async fn run_local(app: &App, matches: &ArgMatches) -> Result<usize> {
  let base = matches.get_one::<String>("base").expect("required");
  let head = matches.get_one::<String>("head").expect("required");
  let repo = matches.get_one::<String>("repo").expect("defaulted");

  let source = LocalDiffSource::new(PathBuf::from(repo), base.clone(), head.clone());
  let producer = reviewer_from(app)?;
  let filter = filter_from(app)?;

  review::run(&source, &filter, &producer, &StdoutPoster).await
}

fn run_config(mut app: App, matches: &ArgMatches) -> Result<usize> {
  let Some(("set", set)) = matches.subcommand() else { unreachable!() };
  let key = set.get_one::<String>("key").expect("required");
  let value = set.get_one::<String>("value").expect("required");

  match key.as_str() {
    "model" => {
      Model::from_str(value)?;
      app.update_model(value.clone())?;
    }
    "openai-api-key" => app.update_openai_api_key(value.clone())?,
    "scm-token" => app.update_scm_token(value.clone())?,
    _ => unreachable!()
  }

  Ok(0)
}

fn reviewer_from(app: &App) -> Result<LlmReviewer> {
  let api_key = required(app.openai_api_key.clone(), "openai-api-key")?;
  let model = Model::from(app.model.clone().unwrap_or_default());
  Ok(LlmReviewer::new(api_key, model))
}

fn filter_from(app: &App) -> Result<PathFilter> {
  let include = config::split_patterns(app.include_patterns.as_deref());
  let exclude = config::split_patterns(app.exclude_patterns.as_deref());
  PathFilter::new(include.as_deref(), exclude.as_deref())
}

fn required(value: Option<String>, option: &str) -> Result<String> {
  match value.filter(|value| !value.is_empty()) {
    Some(value) => Ok(value),
    None => bail!(
      "{} not configured.\n    Run: {}",
      option,
      format!("review-ai config set {option} <value>").yellow()
    )
  }
}

/// Prints comments to stdout; the poster used for local reviews.
struct StdoutPoster;

#[async_trait]
impl CommentPoster for StdoutPoster {
  async fn post_comments(&self, comments: &[PositionedComment]) -> Result<()> {
    for comment in comments {
      println!("{} (position {})\n  {}", comment.path.bold(), comment.position, comment.body);
    }
    Ok(())
  }
}
