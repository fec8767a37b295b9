use std::fs;

use anyhow::Result;
use git2::{Commit, IndexAddOption, Repository, Signature};
use tempfile::TempDir;

use reviewer::diff::{parse_diff, resolve};
use reviewer::filter::PathFilter;
use reviewer::git::diff_between;

struct TestRepo {
  dir: TempDir
}

impl TestRepo {
  fn new() -> Result<Self> {
    let dir = TempDir::new()?;
    Repository::init(dir.path())?;
    Ok(Self { dir })
  }

  fn write(&self, name: &str, content: &str) -> Result<()> {
    let path = self.dir.path().join(name);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
  }

  fn commit_all(&self, message: &str) -> Result<String> {
    let repo = Repository::open(self.dir.path())?;

    let mut index = repo.index()?;
    index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
    index.write()?;

    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;
    let signature = Signature::now("Test User", "test@example.com")?;

    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<&Commit> = parent.iter().collect();

    let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
    Ok(oid.to_string())
  }
}

#[test]
fn test_local_diff_parses_with_zero_context() -> Result<()> {
  let repo = TestRepo::new()?;

  repo.write(
    "src/file1.py",
    "def main():\n    pass\n\nif __name__ == '__main__':\n    main()\n"
  )?;
  let base = repo.commit_all("Initial commit")?;

  repo.write(
    "src/file1.py",
    "def main():\n    print(\"Hello\")\n    pass\n\nif __name__ == '__main__':\n    main()\n    print(\"Goodbye\")\n"
  )?;
  let head = repo.commit_all("Update files")?;

  let diff_text = diff_between(repo.dir.path(), &base, &head)?;
  assert!(diff_text.contains("diff --git"));

  let files = parse_diff(&diff_text, &PathFilter::permissive());
  assert_eq!(files.len(), 1);

  let file = &files[0];
  assert_eq!(file.display_path(), Some("src/file1.py"));
  assert_eq!(file.hunks.len(), 2);

  // Zero-context hunks: each holds exactly its one added line.
  assert_eq!(file.hunks[0].line_position_map.len(), 1);
  assert_eq!(resolve(file, 2), Some(1));
  assert_eq!(resolve(file, 7), Some(1));
  assert_eq!(resolve(file, 3), None);

  Ok(())
}

#[test]
fn test_local_diff_respects_exclude_patterns() -> Result<()> {
  let repo = TestRepo::new()?;

  repo.write("src/file1.py", "def main():\n    pass\n")?;
  repo.write("tests/test_file.py", "def test_main():\n    pass\n")?;
  let base = repo.commit_all("Initial commit")?;

  repo.write("src/file1.py", "def main():\n    pass\n    print(\"Hello\")\n")?;
  repo.write("tests/test_file.py", "def test_main():\n    pass\n    print(\"Hello\")\n")?;
  let head = repo.commit_all("Update files")?;

  let diff_text = diff_between(repo.dir.path(), &base, &head)?;

  let filter = PathFilter::new(None, Some(&["**/tests/**".to_string()])).unwrap();
  let files = parse_diff(&diff_text, &filter);

  assert_eq!(files.len(), 1);
  assert_eq!(files[0].display_path(), Some("src/file1.py"));

  Ok(())
}

#[test]
fn test_new_file_shows_up_as_new() -> Result<()> {
  let repo = TestRepo::new()?;

  repo.write("README.md", "# Project\n")?;
  let base = repo.commit_all("Initial commit")?;

  repo.write("src/new_module.py", "def helper():\n    return 1\n")?;
  let head = repo.commit_all("Add helper module")?;

  let diff_text = diff_between(repo.dir.path(), &base, &head)?;
  let files = parse_diff(&diff_text, &PathFilter::permissive());

  assert_eq!(files.len(), 1);
  assert!(files[0].is_new_file);
  assert_eq!(files[0].old_path, None);
  assert_eq!(files[0].display_path(), Some("src/new_module.py"));
  assert_eq!(resolve(&files[0], 1), Some(1));
  assert_eq!(resolve(&files[0], 2), Some(2));

  Ok(())
}
