use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, ensure};
use tempfile::TempDir;

/// Run a git command inside `repo_path`, ensuring it succeeds.
pub fn git(repo_path: &Path, args: &[&str]) -> Result<Output> {
    let output = Command::new("git")
        .current_dir(repo_path)
        .args(args)
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))?;

    ensure!(
        output.status.success(),
        "git command failed: git {}\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    Ok(output)
}

/// Initialise a new repository at `repo_path` with a README commit.
pub fn init_repository(repo_path: &Path) -> Result<()> {
    if !repo_path.exists() {
        fs::create_dir_all(repo_path)?;
    }

    git(repo_path, &["init"])?;
    git(repo_path, &["config", "user.email", "test@example.com"])?;
    git(repo_path, &["config", "user.name", "Test User"])?;

    fs::write(repo_path.join("README.md"), "# Test Project")?;
    git(repo_path, &["add", "README.md"])?;
    git(repo_path, &["commit", "-m", "Initial commit"])?;

    Ok(())
}

/// Create a temporary repository with an initial commit. The returned path is
/// canonicalized so it compares equal to what `git rev-parse` reports.
pub fn create_repo() -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    init_repository(temp_dir.path())?;
    let repo_path = temp_dir.path().canonicalize()?;
    Ok((temp_dir, repo_path))
}

/// Write `content` to `file` inside the repository and stage it.
pub fn stage_file(repo_path: &Path, file: &str, content: &str) -> Result<()> {
    fs::write(repo_path.join(file), content)?;
    git(repo_path, &["add", file])?;
    Ok(())
}

/// Content of `file` as recorded in the index.
pub fn staged_content(repo_path: &Path, file: &str) -> Result<String> {
    let output = git(repo_path, &["show", &format!(":{file}")])?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Content of `file` on disk.
pub fn working_content(repo_path: &Path, file: &str) -> Result<String> {
    Ok(fs::read_to_string(repo_path.join(file))?)
}
