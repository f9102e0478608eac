use std::env;

use anyhow::Result;
use libprehook::PrehookError;
use libprehook::config::{Mode, PrehookConfig, Settings, find_project_root, pyproject_path};
use libprehook::hooks::PreCommitHook;
use prehook_term::Output;

use crate::ui::{emit, prompt_confirm};

/// Install the pre-commit hook and seed the configuration.
pub fn activate(
    output: &dyn Output,
    no_prompt: bool,
    force: bool,
    mode_arg: Option<&str>,
) -> Result<()> {
    let root = find_project_root(&env::current_dir()?);
    let pyproject = pyproject_path(&root);
    let mut config = PrehookConfig::load(&pyproject)?;
    let hook = PreCommitHook::from_repo(&root)?;

    if hook.exists() && !force {
        emit(output.warn(&format!(
            "prehook pre-commit hook is already installed at {hook}."
        )))?;
        emit(output.message(
            "Run 'prehook activate --force' to override the current installed pre-commit hook.",
        ))?;
        emit(output.message(
            "Run 'prehook check' to validate the current status of the installed pre-commit hook.",
        ))?;
        return Ok(());
    }

    let mode = match mode_arg {
        Some(raw) => {
            let parsed = Mode::from_string(raw);
            if parsed == Mode::Unknown {
                return Err(PrehookError::OperationError(format!(
                    "Unknown mode \"{raw}\". Expected pythonpath, poetry or pipenv."
                ))
                .into());
            }
            parsed
        }
        None => config.effective_mode(),
    };

    // A hook that exists here survived the force check above.
    if hook.exists() && !hook.is_prehook_hook()? {
        if no_prompt {
            return Err(PrehookError::Hook(format!(
                "a different pre-commit hook exists at {hook}; remove it or rerun \
                 without --no-prompt to confirm the overwrite"
            ))
            .into());
        }
        let prompt = format!("The pre-commit hook at {hook} was not installed by prehook. Overwrite it?");
        if !prompt_confirm(output, &prompt)? {
            return Err(PrehookError::UserAborted.into());
        }
    }

    if !config.has_config() {
        let settings = Settings {
            mode: Some(mode),
            ..Settings::default()
        };
        settings.write(&pyproject)?;
        config.settings = Some(settings);
        emit(output.success(&format!(
            "prehook settings written to {}.",
            pyproject.display()
        )))?;
    } else if force
        && let Some(settings) = config.settings.as_mut()
    {
        settings.mode = Some(mode);
        settings.write(&pyproject)?;
        emit(output.success(&format!(
            "prehook settings written to {}.",
            pyproject.display()
        )))?;
    }

    hook.write(mode)?;
    emit(output.success(&format!(
        "prehook pre-commit hook installed at {hook} using \"{mode}\" mode."
    )))?;
    Ok(())
}
