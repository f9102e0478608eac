//! End-to-end behavior of the unstaged-changes stash against real
//! repositories.

mod common;

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use libprehook::PrehookError;
use libprehook::git::{self, Reconciliation, stash_unstaged_changes};

use common::{create_repo, stage_file, staged_content, working_content};

const FILE: &str = "code.py";

#[test]
fn working_tree_shows_only_staged_content_during_run() -> Result<()> {
    let (_tmp, repo) = create_repo()?;
    stage_file(&repo, FILE, "staged\n")?;
    fs::write(repo.join(FILE), "staged\nunstaged\n")?;

    let stash = stash_unstaged_changes(&repo, None)?;
    assert_eq!(stash.paths(), [PathBuf::from(FILE)]);

    let mut seen = String::new();
    let outcome = stash.run(|| -> Result<(), PrehookError> {
        seen = fs::read_to_string(repo.join(FILE))?;
        Ok(())
    })?;

    assert_eq!(seen, "staged\n");
    assert_eq!(outcome.reconciliation, Reconciliation::Unchanged);
    Ok(())
}

#[test]
fn unstaged_edits_survive_an_untouched_run() -> Result<()> {
    let (_tmp, repo) = create_repo()?;
    stage_file(&repo, FILE, "staged\n")?;
    fs::write(repo.join(FILE), "staged\nunstaged\n")?;

    let stash = stash_unstaged_changes(&repo, None)?;
    stash.run(|| -> Result<(), PrehookError> { Ok(()) })?;

    assert_eq!(staged_content(&repo, FILE)?, "staged\n");
    assert_eq!(working_content(&repo, FILE)?, "staged\nunstaged\n");

    // The snapshot refs are left behind for manual recovery.
    common::git(&repo, &["rev-parse", "--verify", git::INDEX_REF])?;
    common::git(&repo, &["rev-parse", "--verify", git::WORKING_REF])?;
    Ok(())
}

#[test]
fn staged_rewrites_merge_into_working_tree() -> Result<()> {
    let (_tmp, repo) = create_repo()?;
    stage_file(&repo, FILE, "lorem ipsum\n")?;
    fs::write(repo.join(FILE), "lorem ipsum\ndolor sit\n")?;

    let stash = stash_unstaged_changes(&repo, None)?;
    let outcome = stash.run(|| -> Result<(), PrehookError> {
        // Rewrite the staged content the way a formatter would.
        fs::write(repo.join(FILE), "Lorem Ipsum\n")?;
        git::stage_files(&repo, &[PathBuf::from(FILE)])?;
        Ok(())
    })?;

    assert_eq!(outcome.reconciliation, Reconciliation::Merged);
    assert_eq!(staged_content(&repo, FILE)?, "Lorem Ipsum\n");
    assert_eq!(working_content(&repo, FILE)?, "Lorem Ipsum\ndolor sit\n");
    Ok(())
}

#[test]
fn rewrites_matching_the_unstaged_edits_apply_no_patch() -> Result<()> {
    let (_tmp, repo) = create_repo()?;
    stage_file(&repo, FILE, "staged\n")?;
    fs::write(repo.join(FILE), "staged\nunstaged\n")?;

    let stash = stash_unstaged_changes(&repo, None)?;
    let outcome = stash.run(|| -> Result<(), PrehookError> {
        // Stage exactly the content the unstaged edits already hold.
        fs::write(repo.join(FILE), "staged\nunstaged\n")?;
        git::stage_files(&repo, &[PathBuf::from(FILE)])?;
        Ok(())
    })?;

    assert_eq!(outcome.reconciliation, Reconciliation::Unchanged);
    assert_eq!(staged_content(&repo, FILE)?, "staged\nunstaged\n");
    assert_eq!(working_content(&repo, FILE)?, "staged\nunstaged\n");
    Ok(())
}

#[test]
fn failed_run_restores_index_and_working_tree() -> Result<()> {
    let (_tmp, repo) = create_repo()?;
    stage_file(&repo, FILE, "staged\n")?;
    fs::write(repo.join(FILE), "staged\nunstaged\n")?;

    let stash = stash_unstaged_changes(&repo, None)?;
    let result = stash.run(|| -> Result<(), PrehookError> {
        // Leave the index and disk dirty before failing.
        fs::write(repo.join(FILE), "garbage\n")?;
        git::stage_files(&repo, &[PathBuf::from(FILE)])?;
        Err(PrehookError::OperationError("plugin blew up".to_string()))
    });

    assert!(matches!(result, Err(PrehookError::OperationError(_))));
    assert_eq!(staged_content(&repo, FILE)?, "staged\n");
    assert_eq!(working_content(&repo, FILE)?, "staged\nunstaged\n");
    Ok(())
}

#[test]
fn conflicting_rewrites_are_discarded_without_reject_files() -> Result<()> {
    let (_tmp, repo) = create_repo()?;
    stage_file(&repo, FILE, "alpha\n")?;
    // The unstaged edit touches the same line the run will rewrite.
    fs::write(repo.join(FILE), "alpha local\n")?;

    let stash = stash_unstaged_changes(&repo, None)?;
    let outcome = stash.run(|| -> Result<(), PrehookError> {
        fs::write(repo.join(FILE), "ALPHA\n")?;
        git::stage_files(&repo, &[PathBuf::from(FILE)])?;
        Ok(())
    })?;

    assert_eq!(outcome.reconciliation, Reconciliation::ConflictsDiscarded);
    // The rewrite reaches the index, the local edit wins on disk.
    assert_eq!(staged_content(&repo, FILE)?, "ALPHA\n");
    assert_eq!(working_content(&repo, FILE)?, "alpha local\n");

    let leftovers: Vec<_> = fs::read_dir(&repo)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "rej"))
        .collect();
    assert!(leftovers.is_empty(), "reject files left behind: {leftovers:?}");
    Ok(())
}

#[test]
fn fully_staged_files_are_not_stashed() -> Result<()> {
    let (_tmp, repo) = create_repo()?;
    stage_file(&repo, FILE, "staged\n")?;

    let stash = stash_unstaged_changes(&repo, None)?;
    assert!(stash.paths().is_empty());

    let outcome = stash.run(|| -> Result<(), PrehookError> {
        fs::write(repo.join(FILE), "rewritten\n")?;
        git::stage_files(&repo, &[PathBuf::from(FILE)])?;
        Ok(())
    })?;

    assert_eq!(outcome.reconciliation, Reconciliation::Unchanged);
    assert_eq!(staged_content(&repo, FILE)?, "rewritten\n");
    Ok(())
}

#[test]
fn stash_scope_is_limited_to_the_given_files() -> Result<()> {
    let (_tmp, repo) = create_repo()?;
    stage_file(&repo, "a.py", "a\n")?;
    fs::write(repo.join("a.py"), "a\nmore a\n")?;
    stage_file(&repo, "b.py", "b\n")?;
    fs::write(repo.join("b.py"), "b\nmore b\n")?;

    let stash = stash_unstaged_changes(&repo, Some(&[PathBuf::from("a.py")]))?;
    assert_eq!(stash.paths(), [PathBuf::from("a.py")]);

    let mut other = String::new();
    stash.run(|| -> Result<(), PrehookError> {
        other = fs::read_to_string(repo.join("b.py"))?;
        Ok(())
    })?;

    // The file outside the scope keeps its unstaged edits during the run.
    assert_eq!(other, "b\nmore b\n");
    assert_eq!(working_content(&repo, "a.py")?, "a\nmore a\n");
    Ok(())
}
