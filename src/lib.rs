#[macro_export]
macro_rules! profile {
  ($name:expr) => {{
    let _span = tracing::span!(tracing::Level::DEBUG, $name);
    let _enter = _span.enter();
  }};
}

pub mod config;
pub mod diff;
pub mod error;
pub mod filter;
pub mod git;
pub mod llm;
pub mod model;
pub mod openai;
pub mod review;
pub mod scm;

// Re-exports
pub use diff::{parse_diff, ParsedFile};
pub use filter::PathFilter;
