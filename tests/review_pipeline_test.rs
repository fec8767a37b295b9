use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use reviewer::filter::PathFilter;
use reviewer::review::{self, CommentPoster, DiffSource, FeedbackProducer, PositionedComment, ReviewSuggestion};

const DIFF: &str = r#"diff --git a/src/app.rs b/src/app.rs
index 1234567..7654321 100644
--- a/src/app.rs
+++ b/src/app.rs
@@ -10,1 +10,2 @@
 fn handle() {
+  todo!();
diff --git a/vendor/generated.rs b/vendor/generated.rs
index 1234567..7654321 100644
--- a/vendor/generated.rs
+++ b/vendor/generated.rs
@@ -1,0 +2,1 @@
+const BLOB: &str = "";
"#;

struct StaticSource(&'static str);

#[async_trait]
impl DiffSource for StaticSource {
  async fn fetch_diff(&self) -> Result<String> {
    Ok(self.0.to_string())
  }
}

/// Flags every added line of every hunk it is shown.
struct FlagAdditions;

#[async_trait]
impl FeedbackProducer for FlagAdditions {
  async fn review_hunk(&self, _file_path: &str, hunk_text: &str) -> Result<Vec<ReviewSuggestion>> {
    let suggestions = hunk_text
      .lines()
      .skip(1)
      .filter_map(|line| {
        let (number, rest) = line.split_once(' ')?;
        if !rest.starts_with('+') {
          return None;
        }
        Some(ReviewSuggestion { line_number: number.parse().ok()?, review_comment: "flagged".to_string() })
      })
      .collect();
    Ok(suggestions)
  }
}

#[derive(Default)]
struct CapturePoster {
  posted: Mutex<Vec<PositionedComment>>
}

#[async_trait]
impl CommentPoster for CapturePoster {
  async fn post_comments(&self, comments: &[PositionedComment]) -> Result<()> {
    self.posted.lock().unwrap().extend_from_slice(comments);
    Ok(())
  }
}

#[tokio::test]
async fn test_pipeline_posts_positioned_comments_for_added_lines() {
  let poster = CapturePoster::default();
  let posted = review::run(&StaticSource(DIFF), &PathFilter::permissive(), &FlagAdditions, &poster)
    .await
    .unwrap();

  assert_eq!(posted, 2);

  let comments = poster.posted.lock().unwrap();
  assert_eq!(comments.len(), 2);

  // The added line in src/app.rs is the second diff line of its hunk.
  assert_eq!(comments[0].path, "src/app.rs");
  assert_eq!(comments[0].position, 2);

  assert_eq!(comments[1].path, "vendor/generated.rs");
  assert_eq!(comments[1].position, 1);
}

#[tokio::test]
async fn test_pipeline_honors_exclude_patterns() {
  let poster = CapturePoster::default();
  let filter = PathFilter::new(None, Some(&["vendor/**".to_string()])).unwrap();

  let posted = review::run(&StaticSource(DIFF), &filter, &FlagAdditions, &poster)
    .await
    .unwrap();

  assert_eq!(posted, 1);
  assert_eq!(poster.posted.lock().unwrap()[0].path, "src/app.rs");
}

#[tokio::test]
async fn test_pipeline_with_failing_producer_posts_nothing() {
  struct Failing;

  #[async_trait]
  impl FeedbackProducer for Failing {
    async fn review_hunk(&self, _file_path: &str, _hunk_text: &str) -> Result<Vec<ReviewSuggestion>> {
      anyhow::bail!("model unavailable")
    }
  }

  let poster = CapturePoster::default();
  let posted = review::run(&StaticSource(DIFF), &PathFilter::permissive(), &Failing, &poster)
    .await
    .unwrap();

  assert_eq!(posted, 0);
  assert!(poster.posted.lock().unwrap().is_empty());
}
