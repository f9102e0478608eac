//! Git status queries, tree plumbing, and the stash/restore protocol that
//! isolates staged content while a plugin rewrites files.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    process::{Command, Output as ProcessOutput},
    result::Result as StdResult,
};

use tempfile::NamedTempFile;
use thiserror::Error;

/// Ref recording the pre-operation index tree, written for manual recovery.
pub const INDEX_REF: &str = "refs/prehook/index";

/// Ref recording the synthesized working-tree snapshot, written for manual
/// recovery.
pub const WORKING_REF: &str = "refs/prehook/working";

/// Errors raised by git invocations and status parsing.
#[derive(Debug, Error)]
pub enum GitError {
    /// The git binary could not be spawned at all.
    #[error("Failed to execute '{command}': {source}")]
    Exec {
        /// The command line that could not be started.
        command: String,
        /// The underlying spawn error.
        #[source]
        source: io::Error,
    },

    /// A git command exited with a non-zero status.
    #[error("Git command '{command}' returned non-zero exit status {exit_code}")]
    CommandFailed {
        /// The failing command line.
        command: String,
        /// Exit status reported by git.
        exit_code: i32,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },

    /// Patch application left rejected hunks behind.
    ///
    /// Raised only by [`apply_diff`]; the stash/restore protocol recovers from
    /// this variant instead of treating it as fatal.
    #[error("Failed to apply patch: {stderr}")]
    PatchConflict {
        /// The failing `git apply` command line.
        command: String,
        /// Captured standard error describing the rejected hunks.
        stderr: String,
    },

    /// The given directory is not inside a git repository.
    #[error("Not inside a git repository: {}", path.display())]
    NotARepository {
        /// Directory the repository lookup started from.
        path: PathBuf,
    },

    /// A porcelain status record could not be parsed.
    #[error("Unexpected git status record: {record:?}")]
    UnexpectedStatus {
        /// The offending record.
        record: String,
    },

    /// An underlying I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for git operations.
type Result<T> = StdResult<T, GitError>;

/// Render the full command line for error messages.
fn command_string(args: &[&str]) -> String {
    format!("git {}", args.join(" "))
}

/// Run a git command in `repo_path`, returning the raw output on success.
fn run_git(repo_path: &Path, args: &[&str]) -> Result<ProcessOutput> {
    let output = Command::new("git")
        .current_dir(repo_path)
        .args(args)
        .output()
        .map_err(|source| GitError::Exec {
            command: command_string(args),
            source,
        })?;

    if !output.status.success() {
        return Err(GitError::CommandFailed {
            command: command_string(args),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(output)
}

/// Run a git command in `repo_path` and capture stdout as text.
pub fn exec_git(repo_path: &Path, args: &[&str]) -> Result<String> {
    let output = run_git(repo_path, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a git command, swallowing failures and returning an empty string when
/// the command exits non-zero or cannot be started.
pub fn exec_git_ignore_errors(repo_path: &Path, args: &[&str]) -> String {
    run_git(repo_path, args)
        .map(|output| String::from_utf8_lossy(&output.stdout).into_owned())
        .unwrap_or_default()
}

/// Resolve the repository toplevel directory containing `start_dir`.
pub fn find_repo_root(start_dir: &Path) -> Result<PathBuf> {
    let output =
        exec_git(start_dir, &["rev-parse", "--show-toplevel"]).map_err(|err| match err {
            GitError::CommandFailed { .. } => GitError::NotARepository {
                path: start_dir.to_path_buf(),
            },
            other => other,
        })?;

    let path = PathBuf::from(output.trim());
    Ok(fs::canonicalize(&path).unwrap_or(path))
}

/// Resolve the hooks directory of the repository containing `repo_path`.
pub fn hooks_dir(repo_path: &Path) -> Result<PathBuf> {
    let output = exec_git(repo_path, &["rev-parse", "--git-dir"]).map_err(|err| match err {
        GitError::CommandFailed { .. } => GitError::NotARepository {
            path: repo_path.to_path_buf(),
        },
        other => other,
    })?;

    let git_dir = PathBuf::from(output.trim());
    let git_dir = if git_dir.is_absolute() {
        git_dir
    } else {
        repo_path.join(git_dir)
    };

    Ok(git_dir.join("hooks"))
}

/// Status of a file in the index or working tree, as reported by the
/// porcelain short format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No changes.
    Unmodified,
    /// Content changed.
    Modified,
    /// Newly added.
    Added,
    /// Deleted.
    Deleted,
    /// Renamed.
    Renamed,
    /// Copied.
    Copied,
    /// Updated but unmerged.
    Updated,
    /// Not tracked.
    Untracked,
    /// Ignored.
    Ignored,
}

impl Status {
    /// Map a porcelain status character onto a [`Status`].
    fn from_char(ch: char) -> Option<Self> {
        match ch {
            ' ' => Some(Self::Unmodified),
            'M' => Some(Self::Modified),
            'A' => Some(Self::Added),
            'D' => Some(Self::Deleted),
            'R' => Some(Self::Renamed),
            'C' => Some(Self::Copied),
            'U' => Some(Self::Updated),
            '?' => Some(Self::Untracked),
            '!' => Some(Self::Ignored),
            _ => None,
        }
    }

    /// The porcelain status character for this status.
    pub fn as_char(self) -> char {
        match self {
            Self::Unmodified => ' ',
            Self::Modified => 'M',
            Self::Added => 'A',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
            Self::Copied => 'C',
            Self::Updated => 'U',
            Self::Untracked => '?',
            Self::Ignored => '!',
        }
    }
}

/// Status of a single file in the index and working tree.
#[derive(Debug, Clone)]
pub struct StatusEntry {
    /// Status of the file in the index.
    pub index: Status,
    /// Status of the file in the working tree, relative to the index.
    pub working_tree: Status,
    /// Repository-relative path of the file.
    pub path: PathBuf,
    /// Previous path; set exactly when `index == Status::Renamed`.
    pub old_path: Option<PathBuf>,
    /// Absolute repository root used to resolve `path`.
    pub root_path: PathBuf,
}

impl StatusEntry {
    /// Absolute filesystem location of the file.
    pub fn absolute_path(&self) -> PathBuf {
        self.root_path.join(&self.path)
    }
}

impl fmt::Display for StatusEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} {}",
            self.index.as_char(),
            self.working_tree.as_char(),
            self.path.display()
        )
    }
}

/// Returns true if the entry has content staged for commit.
pub fn is_staged_status(status: &StatusEntry) -> bool {
    status.index != Status::Unmodified
        && status.index != Status::Untracked
        && status.index != Status::Ignored
        && status.index != Status::Deleted
}

/// Returns true if the entry is staged and additionally carries unstaged
/// changes in the working tree.
pub fn is_partially_staged_status(status: &StatusEntry) -> bool {
    is_staged_status(status)
        && status.working_tree != Status::Unmodified
        && status.working_tree != Status::Untracked
        && status.working_tree != Status::Ignored
}

/// Parse the NUL-delimited `git status -z` stream.
///
/// A rename record carries the new path inline and the old path in the
/// following NUL-delimited field, so the parser consumes two fields for
/// records whose index status is `R`.
fn parse_status(output: &str, root_path: &Path) -> Result<Vec<StatusEntry>> {
    let output = output.strip_suffix('\0').unwrap_or(output);
    if output.is_empty() {
        return Ok(Vec::new());
    }

    let unexpected = |record: &str| GitError::UnexpectedStatus {
        record: record.to_string(),
    };

    let mut fields = output.split('\0');
    let mut entries = Vec::new();

    while let Some(record) = fields.next() {
        let mut chars = record.chars();
        let index = chars
            .next()
            .and_then(Status::from_char)
            .ok_or_else(|| unexpected(record))?;
        let working_tree = chars
            .next()
            .and_then(Status::from_char)
            .ok_or_else(|| unexpected(record))?;
        if chars.next() != Some(' ') {
            return Err(unexpected(record));
        }

        // The status code and separator are a fixed three-byte ASCII prefix.
        let path = PathBuf::from(&record[3..]);
        if path.as_os_str().is_empty() {
            return Err(unexpected(record));
        }

        let old_path = if index == Status::Renamed {
            let old = fields.next().ok_or_else(|| unexpected(record))?;
            Some(PathBuf::from(old))
        } else {
            None
        };

        entries.push(StatusEntry {
            index,
            working_tree,
            path,
            old_path,
            root_path: root_path.to_path_buf(),
        });
    }

    Ok(entries)
}

/// Convert paths into argument strings for a git command line.
fn path_args(files: &[PathBuf]) -> Vec<String> {
    files
        .iter()
        .map(|f| f.to_string_lossy().into_owned())
        .collect()
}

/// Query the git status, optionally restricted to `files`.
///
/// Untracked files and submodules are excluded. Entries preserve the order
/// emitted by git.
pub fn get_status(repo_path: &Path, files: Option<&[PathBuf]>) -> Result<Vec<StatusEntry>> {
    let mut args = vec![
        "status".to_string(),
        "-z".to_string(),
        "--ignore-submodules".to_string(),
        "--untracked-files=no".to_string(),
    ];

    if let Some(files) = files {
        args.push("--".to_string());
        args.extend(path_args(files));
    }

    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    let output = exec_git(repo_path, &arg_refs)?;
    let root_path = find_repo_root(repo_path)?;
    parse_status(&output, &root_path)
}

/// Query the git status and keep only staged entries.
pub fn get_staged_status(repo_path: &Path, files: Option<&[PathBuf]>) -> Result<Vec<StatusEntry>> {
    let status = get_status(repo_path, files)?;
    Ok(status.into_iter().filter(is_staged_status).collect())
}

/// Add the given files to the index.
pub fn stage_files(repo_path: &Path, files: &[PathBuf]) -> Result<()> {
    let mut args = vec!["add".to_string(), "--".to_string()];
    args.extend(path_args(files));
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    exec_git(repo_path, &arg_refs)?;
    Ok(())
}

/// Snapshot the current index as a tree object, returning its hash.
fn write_tree(repo_path: &Path) -> Result<String> {
    Ok(exec_git(repo_path, &["write-tree"])?.trim().to_string())
}

/// Replace the index contents with the given tree, leaving the working tree
/// untouched.
fn read_tree(repo_path: &Path, ref_or_hash: &str) -> Result<()> {
    exec_git(repo_path, &["read-tree", ref_or_hash])?;
    Ok(())
}

/// Overwrite the working-tree copies of `files` with their index versions.
fn checkout_from_index(repo_path: &Path, files: &[PathBuf]) -> Result<()> {
    let mut args = vec![
        "checkout-index".to_string(),
        "-f".to_string(),
        "--".to_string(),
    ];
    args.extend(path_args(files));
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    exec_git(repo_path, &arg_refs)?;
    Ok(())
}

/// Point a named ref at a tree hash so it can be recovered manually.
fn set_ref(repo_path: &Path, name: &str, hash: &str) -> Result<()> {
    exec_git(repo_path, &["update-ref", name, hash])?;
    Ok(())
}

/// Compute a binary-safe, zero-context diff between two trees.
fn get_tree_diff(repo_path: &Path, tree1: &str, tree2: &str) -> Result<Vec<u8>> {
    let output = run_git(
        repo_path,
        &[
            "diff-tree",
            "--ignore-submodules",
            "--binary",
            "--no-color",
            "--no-ext-diff",
            "--unified=0",
            tree1,
            tree2,
        ],
    )?;
    Ok(output.stdout)
}

/// Apply a patch to the working tree, writing hunks that do not apply cleanly
/// to `.rej` files instead of aborting.
fn apply_diff(repo_path: &Path, patch: &[u8]) -> Result<()> {
    let mut patch_file = NamedTempFile::new()?;
    io::Write::write_all(&mut patch_file, patch)?;
    io::Write::flush(&mut patch_file)?;

    let patch_path = patch_file.path().to_string_lossy().into_owned();
    let result = exec_git(
        repo_path,
        &[
            "apply",
            "-v",
            "--whitespace=nowarn",
            "--reject",
            "--recount",
            "--unidiff-zero",
            &patch_path,
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(GitError::CommandFailed {
            command, stderr, ..
        }) => Err(GitError::PatchConflict { command, stderr }),
        Err(other) => Err(other),
    }
}

/// Tree snapshots captured when the stash scope is entered.
struct StashTrees {
    /// Hash of the pre-operation index tree.
    index: String,
    /// Hash of the synthesized tree carrying the unstaged edits.
    working_tree: String,
}

/// How the stash scope reconciled the wrapped operation's changes on exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The operation staged nothing new; no patch was applied.
    Unchanged,
    /// The operation's changes were merged into the working tree.
    Merged,
    /// The operation's changes conflicted with the unstaged edits; the
    /// conflicting hunks were discarded.
    ConflictsDiscarded,
}

/// Value returned by a stashed operation together with the reconciliation
/// result, so callers can surface a conflict warning.
#[derive(Debug)]
pub struct StashOutcome<T> {
    /// Value returned by the wrapped operation.
    pub value: T,
    /// What happened during reconciliation.
    pub reconciliation: Reconciliation,
}

/// Scoped stash of unstaged changes on partially staged files.
///
/// While the scope is active, the working-tree copies of the partially staged
/// files show only their staged content; the unstaged edits are parked in a
/// synthesized tree object. On exit the unstaged edits are restored and any
/// changes the wrapped operation staged are merged back into the working tree.
///
/// The protocol is not reentrant: the recovery refs are singletons, so two
/// overlapping instances on one repository corrupt each other's snapshots.
///
/// # Example
///
/// ```no_run
/// use libprehook::git::{GitError, stash_unstaged_changes};
/// # fn format_files() -> Result<(), GitError> { Ok(()) }
///
/// # fn main() -> Result<(), GitError> {
/// let stash = stash_unstaged_changes(std::path::Path::new("."), None)?;
/// let _outcome = stash.run(|| format_files())?;
/// # Ok(())
/// # }
/// ```
pub struct StashedChanges {
    /// Repository root all git commands run from.
    root: PathBuf,
    /// Repository-relative paths of the partially staged files.
    paths: Vec<PathBuf>,
}

/// Create a stash scope for the partially staged subset of the given files
/// (or of the whole status when `files` is `None`).
pub fn stash_unstaged_changes(
    repo_path: &Path,
    files: Option<&[PathBuf]>,
) -> Result<StashedChanges> {
    let root = find_repo_root(repo_path)?;
    let status = get_status(&root, files)?;
    let paths = status
        .iter()
        .filter(|entry| is_partially_staged_status(entry))
        .map(|entry| entry.path.clone())
        .collect();

    Ok(StashedChanges { root, paths })
}

impl StashedChanges {
    /// The partially staged paths this scope protects.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Run `op` with unstaged changes stashed away, reconciling on return.
    ///
    /// When no files are partially staged, `op` runs without any git
    /// operations. When `op` fails, index and working tree are restored to
    /// their pre-entry state before the error is propagated.
    pub fn run<T, E>(self, op: impl FnOnce() -> StdResult<T, E>) -> StdResult<StashOutcome<T>, E>
    where
        E: From<GitError>,
    {
        if self.paths.is_empty() {
            return Ok(StashOutcome {
                value: op()?,
                reconciliation: Reconciliation::Unchanged,
            });
        }

        let trees = self.stash_changes().map_err(E::from)?;

        match op() {
            Ok(value) => {
                let reconciliation = self.restore_after_success(&trees).map_err(E::from)?;
                Ok(StashOutcome {
                    value,
                    reconciliation,
                })
            }
            Err(err) => {
                self.restore_after_failure(&trees).map_err(E::from)?;
                Err(err)
            }
        }
    }

    /// Park the unstaged edits in a tree object and reduce the working-tree
    /// copies of the protected files to their staged content.
    fn stash_changes(&self) -> Result<StashTrees> {
        // Save the current index and record it for manual recovery.
        let index = write_tree(&self.root)?;
        set_ref(&self.root, INDEX_REF, &index)?;

        // Stage the working-tree content, capturing the unstaged edits.
        stage_files(&self.root, &self.paths)?;
        let working_tree = write_tree(&self.root)?;
        set_ref(&self.root, WORKING_REF, &working_tree)?;

        // Restore the index and overwrite the files on disk from it; the
        // unstaged edits now live only in the working_tree snapshot.
        read_tree(&self.root, &index)?;
        checkout_from_index(&self.root, &self.paths)?;

        Ok(StashTrees {
            index,
            working_tree,
        })
    }

    /// Put the parked unstaged edits back on disk.
    fn restore_working_tree(&self, trees: &StashTrees) -> Result<()> {
        read_tree(&self.root, &trees.working_tree)?;
        checkout_from_index(&self.root, &self.paths)
    }

    /// Success-path exit: restore the unstaged edits and merge whatever the
    /// operation staged into the working tree.
    fn restore_after_success(&self, trees: &StashTrees) -> Result<Reconciliation> {
        // Capture any changes the operation staged.
        let changed_tree = write_tree(&self.root)?;

        self.restore_working_tree(trees)?;
        read_tree(&self.root, &changed_tree)?;

        // Nothing to merge when the operation left the staged content alone,
        // or produced exactly the content of the unstaged edits; a no-op
        // patch would only risk spurious conflicts.
        if changed_tree == trees.index || changed_tree == trees.working_tree {
            return Ok(Reconciliation::Unchanged);
        }

        let patch = get_tree_diff(&self.root, &trees.index, &changed_tree)?;
        match apply_diff(&self.root, &patch) {
            Ok(()) => Ok(Reconciliation::Merged),
            Err(GitError::PatchConflict { .. }) => {
                self.remove_reject_files()?;
                Ok(Reconciliation::ConflictsDiscarded)
            }
            Err(other) => Err(other),
        }
    }

    /// Failure-path exit: restore working tree and index exactly as they were
    /// before the scope was entered, discarding anything the operation staged.
    fn restore_after_failure(&self, trees: &StashTrees) -> Result<()> {
        self.restore_working_tree(trees)?;
        read_tree(&self.root, &trees.index)
    }

    /// Delete `.rej` files a partial patch application left in the
    /// repository root.
    fn remove_reject_files(&self) -> Result<()> {
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "rej") {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}
