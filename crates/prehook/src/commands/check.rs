use std::env;
use std::path::Path;

use anyhow::Result;
use libprehook::PrehookError;
use libprehook::config::{Mode, PrehookConfig, find_project_root, pyproject_path};
use libprehook::hooks::PreCommitHook;
use libprehook::runner::{PluginIssue, check_plugin};
use prehook_term::Output;

use crate::ui::emit;

/// Validate the installed hook and the project configuration, failing when
/// either is broken.
pub fn check(output: &dyn Output) -> Result<()> {
    let root = find_project_root(&env::current_dir()?);
    let pyproject = pyproject_path(&root);
    let hook = PreCommitHook::from_repo(&root)?;
    let mut healthy = true;

    check_pre_commit_hook(output, &hook, &mut healthy)?;
    check_config(output, &pyproject, &hook, &mut healthy)?;

    if healthy {
        Ok(())
    } else {
        Err(PrehookError::OperationError("prehook is not set up correctly.".to_string()).into())
    }
}

/// Report the state of the installed pre-commit hook script.
fn check_pre_commit_hook(output: &dyn Output, hook: &PreCommitHook, healthy: &mut bool) -> Result<()> {
    if !hook.exists() {
        *healthy = false;
        emit(output.fail("prehook pre-commit hook not active. Please run 'prehook activate'."))?;
        return Ok(());
    }

    if !hook.is_prehook_hook()? {
        *healthy = false;
        emit(output.fail(&format!(
            "prehook pre-commit hook is not active. But a different pre-commit hook \
             has been found at {hook}."
        )))?;
        return Ok(());
    }

    emit(output.success("prehook pre-commit hook is active."))?;

    if hook.is_current()? {
        emit(output.success("prehook pre-commit hook is up-to-date."))?;
    } else {
        emit(output.warn(
            "prehook pre-commit hook is outdated. Please run 'prehook activate --force' \
             to update your pre-commit hook.",
        ))?;
    }

    let hook_mode = hook.read_mode()?;
    if hook_mode == Mode::Unknown {
        emit(output.warn(&format!(
            "Unknown prehook mode in {hook}. Falling back to \"{}\" mode.",
            hook_mode.effective_mode()
        )))?;
    }

    Ok(())
}

/// Report the state of the `[tool.prehook]` configuration and its plugins.
fn check_config(
    output: &dyn Output,
    pyproject: &Path,
    hook: &PreCommitHook,
    healthy: &mut bool,
) -> Result<()> {
    if !pyproject.is_file() {
        *healthy = false;
        emit(output.fail(&format!(
            "Missing {} file. Please add a pyproject.toml file and include a \
             \"[tool.prehook]\" section.",
            pyproject.display()
        )))?;
        return Ok(());
    }

    let config = PrehookConfig::load(pyproject)?;
    if !config.has_config() {
        *healthy = false;
        emit(output.fail(&format!(
            "prehook is not enabled in your {} file. Please add a \"[tool.prehook]\" section.",
            pyproject.display()
        )))?;
        return Ok(());
    }

    if !hook.exists() {
        return Ok(());
    }

    let hook_mode = hook.read_mode()?;
    match config.mode() {
        None => emit(output.warn(&format!(
            "prehook mode is not defined in {}.",
            pyproject.display()
        )))?,
        Some(Mode::Unknown) => emit(output.warn(&format!(
            "Unknown prehook mode in {}.",
            pyproject.display()
        )))?,
        Some(mode) if mode.effective_mode() != hook_mode.effective_mode() => {
            emit(output.warn(&format!(
                "prehook mode \"{hook_mode}\" in pre-commit hook {hook} differs from \
                 mode \"{mode}\" in {}.",
                pyproject.display()
            )))?;
        }
        Some(_) => {}
    }

    emit(output.message(&format!(
        "Using prehook mode \"{}\".",
        hook_mode.effective_mode()
    )))?;

    let names = config.pre_commit();
    if names.is_empty() {
        *healthy = false;
        emit(output.fail(&format!(
            "No prehook plugin is activated in {} for your pre-commit hook. \
             Please add a \"pre-commit = [plugin1, plugin2]\" setting.",
            pyproject.display()
        )))?;
        return Ok(());
    }

    for name in names {
        match check_plugin(name, &config.plugin(name), config.effective_mode()) {
            Some(PluginIssue::Error(msg)) => {
                *healthy = false;
                emit(output.fail(&msg))?;
            }
            Some(PluginIssue::Warning(msg)) => emit(output.warn(&msg))?,
            None => emit(output.success(&format!("Plugin \"{name}\" active and runnable.")))?,
        }
    }

    Ok(())
}
