use std::env;
use std::path::PathBuf;

use anyhow::Result;
use libprehook::config::{PrehookConfig, Settings, find_project_root, pyproject_path};
use libprehook::runner::{PluginIssue, check_plugin};
use prehook_term::Output;

use crate::ui::emit;

/// The pyproject.toml path for the project containing the current directory.
fn project_pyproject() -> Result<PathBuf> {
    Ok(pyproject_path(&find_project_root(&env::current_dir()?)))
}

/// Print the plugin list with the outcome of a validation probe per plugin.
fn print_plugins(output: &dyn Output, settings: &Settings) -> Result<()> {
    let section = output.section("Currently used plugins:");
    if settings.pre_commit.is_empty() {
        emit(section.message("None"))?;
        return Ok(());
    }

    let mut names: Vec<&String> = settings.pre_commit.iter().collect();
    names.sort();
    let mode = settings.mode.unwrap_or_default().effective_mode();

    for name in names {
        let plugin = settings.plugins.get(name.as_str()).cloned().unwrap_or_default();
        match check_plugin(name, &plugin, mode) {
            Some(PluginIssue::Error(msg)) => emit(section.fail(&format!("\"{name}\": {msg}")))?,
            Some(PluginIssue::Warning(msg)) => emit(section.warn(&format!("\"{name}\": {msg}")))?,
            None => emit(section.success(&format!("\"{name}\"")))?,
        }
    }
    Ok(())
}

/// Show the configured plugins and whether each one is runnable.
pub fn list(output: &dyn Output) -> Result<()> {
    let pyproject = project_pyproject()?;
    let config = PrehookConfig::load(&pyproject)?;
    let settings = config.settings.unwrap_or_default();
    print_plugins(output, &settings)
}

/// Add plugins to the pre-commit list, skipping ones already present.
pub fn add(output: &dyn Output, names: &[String]) -> Result<()> {
    let pyproject = project_pyproject()?;
    let config = PrehookConfig::load(&pyproject)?;
    let mut settings = config.settings.unwrap_or_default();

    let mut added = Vec::new();
    let mut skipped = Vec::new();
    for name in names {
        if settings.pre_commit.contains(name) {
            skipped.push(name.clone());
        } else {
            settings.pre_commit.push(name.clone());
            added.push(name.clone());
        }
    }

    settings.write(&pyproject)?;

    if !skipped.is_empty() {
        skipped.sort();
        let section = output.section("Skipped already used plugins:");
        for name in &skipped {
            emit(section.warn(&format!("\"{name}\"")))?;
        }
    }

    if !added.is_empty() {
        added.sort();
        let section = output.section("Added plugins:");
        for name in &added {
            emit(section.success(&format!("\"{name}\"")))?;
        }
    }

    print_plugins(output, &settings)
}

/// Remove plugins from the pre-commit list, skipping ones not present.
pub fn remove(output: &dyn Output, names: &[String]) -> Result<()> {
    let pyproject = project_pyproject()?;
    let config = PrehookConfig::load(&pyproject)?;
    let Some(mut settings) = config.settings else {
        emit(output.warn("No plugins to remove."))?;
        return Ok(());
    };

    let mut removed = Vec::new();
    let mut skipped = Vec::new();
    for name in names {
        if let Some(pos) = settings.pre_commit.iter().position(|p| p == name) {
            settings.pre_commit.remove(pos);
            removed.push(name.clone());
        } else if !skipped.contains(name) && !removed.contains(name) {
            skipped.push(name.clone());
        }
    }

    settings.write(&pyproject)?;

    if !skipped.is_empty() {
        skipped.sort();
        let section = output.section("Skipped not used plugins:");
        for name in &skipped {
            emit(section.warn(&format!("\"{name}\"")))?;
        }
    }

    if !removed.is_empty() {
        removed.sort();
        let section = output.section("Removed plugins:");
        for name in &removed {
            emit(section.success(&format!("\"{name}\"")))?;
        }
    }

    print_plugins(output, &settings)
}
