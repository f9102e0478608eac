//! Installation and inspection of the git pre-commit hook script.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{config::Mode, error::Result, git};

/// Version of the rendered hook script; bumped when the template changes.
pub const TEMPLATE_VERSION: u32 = 1;

/// Marker distinguishing our hook script from foreign pre-commit hooks.
const HOOK_MARKER: &str = "prehook run";

/// Render the pre-commit hook script for the given mode.
///
/// The second line records template version and mode as a TOML inline table
/// inside a comment, so installed hooks can be checked for staleness.
fn render_template(mode: Mode) -> String {
    format!(
        "#!/bin/sh\n# meta = {{ version = {TEMPLATE_VERSION}, mode = \"{mode}\" }}\n\nexec prehook run \"$@\"\n"
    )
}

/// Metadata parsed back out of an installed hook script.
#[derive(Debug, Deserialize)]
struct HookMeta {
    /// Template version the script was rendered from.
    version: u32,
    /// Mode recorded at install time.
    mode: Option<Mode>,
}

/// Carrier for the `meta` key of the comment line.
#[derive(Debug, Deserialize)]
struct MetaLine {
    /// The inline metadata table.
    meta: HookMeta,
}

/// The pre-commit hook script of a repository.
#[derive(Debug, Clone)]
pub struct PreCommitHook {
    /// Path of the hook script.
    path: PathBuf,
}

impl PreCommitHook {
    /// Locate the pre-commit hook of the repository containing `repo_path`.
    pub fn from_repo(repo_path: &Path) -> Result<Self> {
        let hooks = git::hooks_dir(repo_path)?;
        Ok(Self {
            path: hooks.join("pre-commit"),
        })
    }

    /// Use an explicit hook script path.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the hook script.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a hook script exists at the path.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the hook script contents.
    fn read(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.path)?)
    }

    /// Whether the installed hook was written by prehook.
    pub fn is_prehook_hook(&self) -> Result<bool> {
        Ok(self.read()?.contains(HOOK_MARKER))
    }

    /// Parse the metadata comment of the installed hook, if it has one.
    fn read_meta(&self) -> Result<Option<HookMeta>> {
        let contents = self.read()?;
        let Some(line) = contents.lines().nth(1) else {
            return Ok(None);
        };
        let Some(toml_source) = line.strip_prefix('#') else {
            return Ok(None);
        };

        match toml::from_str::<MetaLine>(toml_source) {
            Ok(parsed) => Ok(Some(parsed.meta)),
            Err(_) => Ok(None),
        }
    }

    /// Template version of the installed hook, when parseable.
    pub fn read_version(&self) -> Result<Option<u32>> {
        Ok(self.read_meta()?.map(|meta| meta.version))
    }

    /// Mode recorded in the installed hook. `Mode::Unknown` covers scripts
    /// with an unrecognized or missing mode entry.
    pub fn read_mode(&self) -> Result<Mode> {
        Ok(self
            .read_meta()?
            .and_then(|meta| meta.mode)
            .unwrap_or(Mode::Unknown))
    }

    /// Whether the installed hook matches the current template version.
    pub fn is_current(&self) -> Result<bool> {
        Ok(self.read_version()? == Some(TEMPLATE_VERSION))
    }

    /// Render and install the hook script for `mode`, marking it executable.
    pub fn write(&self, mode: Mode) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, render_template(mode))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o775);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }
}

impl fmt::Display for PreCommitHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
