//! The pre-commit run loop executed by the installed hook script.
//!
//! Each configured plugin is an external command. The runner computes the
//! staged files matching the plugin's include patterns, stashes unstaged
//! changes on those files, runs the command, and re-stages the files the
//! plugin may have rewritten.

use std::{
    env,
    path::{Path, PathBuf},
    process::Command,
    result::Result as StdResult,
};

use glob::Pattern;
use prehook_term::{Output, OutputError};

use crate::{
    config::{Mode, PluginSettings, PrehookConfig},
    error::{PrehookError, Result},
    git::{self, Reconciliation, StatusEntry},
    hooks::PreCommitHook,
};

/// Warning surfaced when reconciliation discarded conflicting hunks.
const CONFLICT_WARNING: &str = "Found conflicts between plugin and local changes. \
     Plugin changes will be ignored for conflicted hunks.";

/// Emit an output result, mapping failures into domain errors.
fn emit(result: StdResult<(), OutputError>) -> Result<()> {
    result.map_err(|err| PrehookError::OperationError(format!("Output operation failed: {err}")))
}

/// Issue found while validating a plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginIssue {
    /// The plugin cannot run as configured.
    Error(String),
    /// The plugin can run but its configuration looks wrong.
    Warning(String),
}

/// Check whether `command` can be resolved to an executable file.
fn command_on_path(command: &str) -> bool {
    let path = Path::new(command);
    if path.components().count() > 1 {
        return path.is_file();
    }

    let Some(search_path) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&search_path).any(|dir| dir.join(command).is_file())
}

/// Validate the configuration of the plugin named `name`.
///
/// Command resolution is only checked for the `pythonpath` mode; under
/// `poetry`/`pipenv` the command lives inside the virtualenv and cannot be
/// probed cheaply from outside.
pub fn check_plugin(name: &str, settings: &PluginSettings, mode: Mode) -> Option<PluginIssue> {
    let command = settings.command_for(name);
    if command.is_empty() {
        return Some(PluginIssue::Error(format!(
            "Plugin \"{name}\" has an empty command."
        )));
    }

    for pattern in &settings.include {
        if let Err(err) = Pattern::new(pattern) {
            return Some(PluginIssue::Error(format!(
                "Plugin \"{name}\" has an invalid include pattern {pattern:?}: {err}"
            )));
        }
    }

    if settings.include.is_empty() {
        return Some(PluginIssue::Warning(format!(
            "Plugin \"{name}\" has an empty include list; it will never receive files."
        )));
    }

    if mode.effective_mode() == Mode::Pythonpath && !command_on_path(&command) {
        return Some(PluginIssue::Error(format!(
            "Plugin \"{name}\" command \"{command}\" was not found on PATH."
        )));
    }

    None
}

/// Warn when the installed hook is older than the current template.
fn check_hook_is_current(output: &dyn Output, hook: &PreCommitHook) -> Result<()> {
    if hook.exists() && !hook.is_current()? {
        emit(output.warn(
            "prehook pre-commit hook is outdated. Please run 'prehook activate --force' \
             to update your pre-commit hook.",
        ))?;
    }
    Ok(())
}

/// Warn when the installed hook records a different mode than the
/// configuration.
fn check_hook_mode(output: &dyn Output, config: &PrehookConfig, hook: &PreCommitHook) -> Result<()> {
    if !hook.exists() {
        return Ok(());
    }

    let hook_mode = hook.read_mode()?;
    let config_mode = config.mode().unwrap_or_default();
    if config_mode.effective_mode() != hook_mode.effective_mode() {
        emit(output.warn(&format!(
            "prehook mode \"{hook_mode}\" in pre-commit hook differs from mode \
             \"{config_mode}\" in {}.",
            config.path().display()
        )))?;
    }
    Ok(())
}

/// Select the repository-relative paths of staged entries matching any of the
/// include patterns.
fn select_files(staged: &[StatusEntry], include: &[String]) -> Result<Vec<PathBuf>> {
    let mut patterns = Vec::with_capacity(include.len());
    for pattern in include {
        patterns.push(Pattern::new(pattern).map_err(|err| {
            PrehookError::OperationError(format!("Invalid include pattern {pattern:?}: {err}"))
        })?);
    }

    Ok(staged
        .iter()
        .filter(|entry| patterns.iter().any(|p| p.matches_path(&entry.path)))
        .map(|entry| entry.path.clone())
        .collect())
}

/// Captured result of one plugin invocation.
struct PluginRun {
    /// Exit code of the plugin command.
    code: i32,
    /// Captured standard output.
    stdout: String,
    /// Captured standard error.
    stderr: String,
}

/// Run one plugin command against `files`, staging them again on success.
fn execute_plugin(
    root: &Path,
    name: &str,
    mode: Mode,
    settings: &PluginSettings,
    files: &[PathBuf],
) -> StdResult<PluginRun, PrehookError> {
    let mut command_line: Vec<String> = mode
        .command_prefix()
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    command_line.push(settings.command_for(name));
    command_line.extend(settings.args.iter().cloned());
    command_line.extend(files.iter().map(|f| f.to_string_lossy().into_owned()));

    let (program, args) = command_line
        .split_first()
        .expect("command line always has a program");

    let output = Command::new(program)
        .current_dir(root)
        .args(args)
        .output()
        .map_err(|err| PrehookError::PluginSpawn {
            name: name.to_string(),
            command: command_line.join(" "),
            message: err.to_string(),
        })?;

    let code = output.status.code().unwrap_or(-1);
    if code == 0 {
        // Pick up any rewrites the plugin made to the staged-only content.
        git::stage_files(root, files)?;
    }

    Ok(PluginRun {
        code,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Replay captured plugin output so failures are diagnosable.
fn replay_output(output: &dyn Output, run: &PluginRun) -> Result<()> {
    for line in run.stdout.lines().chain(run.stderr.lines()) {
        emit(output.message(line))?;
    }
    Ok(())
}

/// Run a single named plugin; returns whether it succeeded.
fn run_plugin(
    root: &Path,
    config: &PrehookConfig,
    name: &str,
    output: &dyn Output,
) -> Result<bool> {
    let settings = config.plugin(name);
    let section = output.section(&format!("Running {name}"));

    let staged = git::get_staged_status(root, None)?;
    let files = select_files(&staged, &settings.include)?;
    if files.is_empty() {
        emit(section.message("No staged files match, skipping."))?;
        return Ok(true);
    }

    let mode = config.effective_mode();
    let spinner = section.spinner(&settings.command_for(name));
    let stash = git::stash_unstaged_changes(root, Some(&files))?;
    let outcome = stash.run(|| execute_plugin(root, name, mode, &settings, &files));
    spinner.clear();
    let outcome = outcome?;

    if outcome.reconciliation == Reconciliation::ConflictsDiscarded {
        emit(section.warn(CONFLICT_WARNING))?;
    }

    let run = outcome.value;
    if run.code == 0 {
        emit(section.success("done"))?;
        Ok(true)
    } else {
        emit(section.fail(&format!("exited with status {}", run.code)))?;
        replay_output(section.as_ref(), &run)?;
        Ok(false)
    }
}

/// Execute all configured plugins against the staged files.
///
/// Every plugin runs even when an earlier one failed; the returned exit code
/// is 0 only when all of them succeeded.
pub fn run_precommit(repo_path: &Path, config: &PrehookConfig, output: &dyn Output) -> Result<i32> {
    let root = git::find_repo_root(repo_path)?;
    let hook = PreCommitHook::from_repo(&root)?;

    check_hook_is_current(output, &hook)?;
    if config.has_config() {
        check_hook_mode(output, config, &hook)?;
    }

    let section = output.section("prehook => pre-commit");

    let mut all_ok = true;
    for name in config.pre_commit() {
        all_ok &= run_plugin(&root, config, name, section.as_ref())?;
    }

    emit(output.finish())?;
    Ok(i32::from(!all_ok))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str) -> StatusEntry {
        StatusEntry {
            index: git::Status::Modified,
            working_tree: git::Status::Unmodified,
            path: PathBuf::from(path),
            old_path: None,
            root_path: PathBuf::from("/repo"),
        }
    }

    #[test]
    fn select_files_matches_nested_paths() {
        let staged = vec![entry("a.py"), entry("pkg/b.py"), entry("README.md")];
        let files = select_files(&staged, &["*.py".to_string()]).unwrap();
        assert_eq!(files, [PathBuf::from("a.py"), PathBuf::from("pkg/b.py")]);
    }

    #[test]
    fn select_files_rejects_invalid_pattern() {
        let err = select_files(&[entry("a.py")], &["[".to_string()]).unwrap_err();
        assert!(matches!(err, PrehookError::OperationError(_)));
    }

    #[test]
    fn select_files_multiple_patterns() {
        let staged = vec![entry("a.py"), entry("b.pyi"), entry("c.txt")];
        let files =
            select_files(&staged, &["*.py".to_string(), "*.pyi".to_string()]).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn check_plugin_flags_invalid_include() {
        let settings = PluginSettings {
            include: vec!["[".to_string()],
            ..PluginSettings::default()
        };
        let issue = check_plugin("black", &settings, Mode::Poetry).unwrap();
        assert!(matches!(issue, PluginIssue::Error(_)));
    }

    #[test]
    fn check_plugin_warns_on_empty_include() {
        let settings = PluginSettings {
            include: Vec::new(),
            ..PluginSettings::default()
        };
        let issue = check_plugin("black", &settings, Mode::Poetry).unwrap();
        assert!(matches!(issue, PluginIssue::Warning(_)));
    }

    #[test]
    fn check_plugin_accepts_resolvable_command() {
        // `sh` is available on any unix PATH.
        let settings = PluginSettings {
            command: Some("sh".to_string()),
            ..PluginSettings::default()
        };
        assert_eq!(check_plugin("shfmt", &settings, Mode::Pythonpath), None);
    }

    #[test]
    fn check_plugin_flags_missing_command() {
        let settings = PluginSettings::default();
        let issue = check_plugin("definitely-not-installed-tool", &settings, Mode::Pythonpath)
            .unwrap();
        assert!(matches!(issue, PluginIssue::Error(_)));
    }

    #[test]
    fn check_plugin_skips_path_probe_for_virtualenv_modes() {
        let settings = PluginSettings::default();
        assert_eq!(
            check_plugin("definitely-not-installed-tool", &settings, Mode::Poetry),
            None
        );
    }
}
