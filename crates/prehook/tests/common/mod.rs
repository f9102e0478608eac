use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, ensure};
use tempfile::TempDir;

/// Return the path to the compiled `prehook` binary for integration tests.
pub fn prehook_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_prehook"))
}

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

/// Create a temporary repository with an initial commit.
pub fn create_repo() -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    init_repository(temp_dir.path())?;
    let repo_path = temp_dir.path().canonicalize()?;
    Ok((temp_dir, repo_path))
}

/// Run `prehook` with the provided arguments inside `repo_path`.
pub fn run_prehook(repo_path: &Path, args: &[&str]) -> Result<Output> {
    Command::new(prehook_binary())
        .current_dir(repo_path)
        .args(args)
        .output()
        .with_context(|| format!("failed to run prehook {}", args.join(" ")))
}

/// `PATH` with the directory containing the `prehook` binary prepended, so
/// the installed hook script can find it.
pub fn path_with_prehook() -> Result<String> {
    let bin_dir = prehook_binary()
        .parent()
        .context("binary has no parent directory")?
        .to_path_buf();
    let path = env::var("PATH").unwrap_or_default();
    Ok(format!("{}:{path}", bin_dir.display()))
}

/// Combined stdout and stderr of a finished process, lossily decoded.
pub fn combined_output(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}
