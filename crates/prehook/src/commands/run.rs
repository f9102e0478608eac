use std::env;

use anyhow::Result;
use libprehook::PrehookError;
use libprehook::config::{PrehookConfig, find_project_root, pyproject_path};
use libprehook::runner::run_precommit;
use prehook_term::Output;

use crate::ui::emit;

/// Run the configured plugins against the staged files; this is what the
/// installed hook script executes.
pub fn run(output: &dyn Output) -> Result<()> {
    let root = find_project_root(&env::current_dir()?);
    let pyproject = pyproject_path(&root);
    let config = PrehookConfig::load(&pyproject)?;

    if !config.has_config() {
        emit(output.warn(&format!(
            "prehook is not enabled in your {} file. Please add a \"[tool.prehook]\" \
             section. Skipping pre-commit run.",
            pyproject.display()
        )))?;
        return Ok(());
    }

    if config.pre_commit().is_empty() {
        emit(output.warn(&format!(
            "No prehook plugin is activated in {}. Skipping pre-commit run.",
            pyproject.display()
        )))?;
        return Ok(());
    }

    let code = run_precommit(&root, &config, output)?;
    if code != 0 {
        return Err(PrehookError::OperationError("pre-commit checks failed.".to_string()).into());
    }
    Ok(())
}
