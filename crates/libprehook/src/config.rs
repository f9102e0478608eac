//! Loading and writing the `[tool.prehook]` section of a project's
//! pyproject.toml.

use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use toml::{Table, Value};

use crate::error::{PrehookError, Result};

/// File name of the configuration file at the project root.
pub const PYPROJECT_FILENAME: &str = "pyproject.toml";

/// Key of the prehook table below `[tool]`.
pub const TOOL_SECTION: &str = "prehook";

/// How plugin commands are executed during the hook run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Run plugin commands directly from `PATH`.
    #[default]
    Pythonpath,
    /// Wrap plugin commands in `poetry run`.
    Poetry,
    /// Wrap plugin commands in `pipenv run`.
    Pipenv,
    /// A mode string that is not recognized.
    #[serde(other)]
    Unknown,
}

impl Mode {
    /// Parse a mode string, mapping unrecognized values to [`Mode::Unknown`].
    pub fn from_string(mode: &str) -> Self {
        match mode.to_lowercase().as_str() {
            "pythonpath" => Self::Pythonpath,
            "poetry" => Self::Poetry,
            "pipenv" => Self::Pipenv,
            _ => Self::Unknown,
        }
    }

    /// Collapse sentinel values to a runnable mode.
    pub fn effective_mode(self) -> Self {
        match self {
            Self::Poetry => Self::Poetry,
            Self::Pipenv => Self::Pipenv,
            _ => Self::Pythonpath,
        }
    }

    /// The command-line prefix used to launch plugin commands in this mode.
    pub fn command_prefix(self) -> &'static [&'static str] {
        match self.effective_mode() {
            Self::Poetry => &["poetry", "run"],
            Self::Pipenv => &["pipenv", "run"],
            _ => &[],
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pythonpath => "pythonpath",
            Self::Poetry => "poetry",
            Self::Pipenv => "pipenv",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Default include patterns for plugins without explicit settings.
fn default_include() -> Vec<String> {
    vec!["*.py".to_string()]
}

/// Per-plugin settings below `[tool.prehook.plugins.<name>]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSettings {
    /// Executable to run; defaults to the plugin name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Glob patterns selecting the staged files handed to the plugin.
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    /// Extra arguments placed before the file list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            command: None,
            include: default_include(),
            args: Vec::new(),
        }
    }
}

impl PluginSettings {
    /// The executable for a plugin named `name`.
    pub fn command_for(&self, name: &str) -> String {
        self.command.clone().unwrap_or_else(|| name.to_string())
    }
}

/// The `[tool.prehook]` table of a pyproject.toml.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Plugin names executed by the pre-commit hook, in order.
    #[serde(rename = "pre-commit", default)]
    pub pre_commit: Vec<String>,
    /// How plugin commands are executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    /// Per-plugin settings, keyed by plugin name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub plugins: BTreeMap<String, PluginSettings>,
}

impl Settings {
    /// Write these settings into the `[tool.prehook]` table of `pyproject`,
    /// leaving the other tables of the document in place.
    ///
    /// The document is re-serialized, so formatting of untouched sections is
    /// normalized and comments are not preserved.
    pub fn write(&self, pyproject: &Path) -> Result<()> {
        let config_err = |message: String| PrehookError::Config {
            path: pyproject.to_path_buf(),
            message,
        };

        let mut doc: Table = if pyproject.is_file() {
            let contents = fs::read_to_string(pyproject)?;
            toml::from_str(&contents).map_err(|e| config_err(e.to_string()))?
        } else {
            Table::new()
        };

        let tool = doc
            .entry("tool".to_string())
            .or_insert_with(|| Value::Table(Table::new()));
        let tool_table = tool
            .as_table_mut()
            .ok_or_else(|| config_err("'tool' is not a table".to_string()))?;

        let value = Value::try_from(self).map_err(|e| config_err(e.to_string()))?;
        tool_table.insert(TOOL_SECTION.to_string(), value);

        let rendered = toml::to_string_pretty(&doc).map_err(|e| config_err(e.to_string()))?;
        fs::write(pyproject, rendered)?;
        Ok(())
    }
}

/// Configuration loaded from a pyproject.toml file.
#[derive(Debug, Clone)]
pub struct PrehookConfig {
    /// Path the configuration was loaded from.
    path: PathBuf,
    /// Parsed `[tool.prehook]` settings, when the section exists.
    pub settings: Option<Settings>,
}

impl PrehookConfig {
    /// Load configuration from `pyproject`. A missing file or a missing
    /// `[tool.prehook]` table yields a config without settings.
    pub fn load(pyproject: &Path) -> Result<Self> {
        if !pyproject.is_file() {
            return Ok(Self {
                path: pyproject.to_path_buf(),
                settings: None,
            });
        }

        let config_err = |message: String| PrehookError::Config {
            path: pyproject.to_path_buf(),
            message,
        };

        let contents = fs::read_to_string(pyproject)?;
        let doc: Table = toml::from_str(&contents).map_err(|e| config_err(e.to_string()))?;

        let settings = doc
            .get("tool")
            .and_then(Value::as_table)
            .and_then(|tool| tool.get(TOOL_SECTION))
            .map(|value| value.clone().try_into::<Settings>())
            .transpose()
            .map_err(|e| config_err(e.to_string()))?;

        Ok(Self {
            path: pyproject.to_path_buf(),
            settings,
        })
    }

    /// Path of the configuration file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a `[tool.prehook]` section was present.
    pub fn has_config(&self) -> bool {
        self.settings.is_some()
    }

    /// The configured mode, when set.
    pub fn mode(&self) -> Option<Mode> {
        self.settings.as_ref().and_then(|s| s.mode)
    }

    /// The mode plugin commands actually run under.
    pub fn effective_mode(&self) -> Mode {
        self.mode().unwrap_or_default().effective_mode()
    }

    /// The configured plugin names, in execution order.
    pub fn pre_commit(&self) -> &[String] {
        self.settings
            .as_ref()
            .map(|s| s.pre_commit.as_slice())
            .unwrap_or(&[])
    }

    /// Settings for the plugin named `name`, with defaults filled in when the
    /// plugin has no explicit `[tool.prehook.plugins.<name>]` table.
    pub fn plugin(&self, name: &str) -> PluginSettings {
        self.settings
            .as_ref()
            .and_then(|s| s.plugins.get(name))
            .cloned()
            .unwrap_or_default()
    }
}

/// Walk up from `start_dir` to the nearest directory containing a
/// pyproject.toml file or a `.git` entry; falls back to `start_dir`.
pub fn find_project_root(start_dir: &Path) -> PathBuf {
    let mut current = start_dir;
    loop {
        if current.join(PYPROJECT_FILENAME).is_file() || current.join(".git").exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return start_dir.to_path_buf(),
        }
    }
}

/// The pyproject.toml path for a project root.
pub fn pyproject_path(root: &Path) -> PathBuf {
    root.join(PYPROJECT_FILENAME)
}
