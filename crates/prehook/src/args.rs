use clap::{ArgGroup, Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("color_mode")
        .args(["color", "no_color"])
))]
/// Top-level CLI options for prehook.
pub struct Cli {
    /// Enable colored output
    #[arg(long, global = true)]
    pub color: bool,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Suppress all output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, global = true)]
    pub no_prompt: bool,

    #[command(subcommand)]
    /// The primary command to execute.
    pub command: Commands,
}

#[derive(Subcommand)]
/// CLI subcommands supported by prehook.
pub enum Commands {
    /// Install the pre-commit hook into the current repository
    Activate {
        /// Overwrite an existing pre-commit hook
        #[arg(long)]
        force: bool,

        /// Mode used to run plugin commands (pythonpath, poetry, pipenv)
        #[arg(long, value_name = "MODE")]
        mode: Option<String>,
    },

    /// Check that the hook and configuration are healthy
    Check,

    /// Manage the plugins run by the pre-commit hook
    Plugins {
        #[command(subcommand)]
        /// The plugin operation to perform.
        command: PluginsCommand,
    },

    /// Run the configured plugins against the staged files
    Run,
}

#[derive(Subcommand)]
/// Operations on the configured plugin list.
pub enum PluginsCommand {
    /// Show the configured plugins and their status
    #[command(alias = "ls")]
    List,

    /// Add plugins to the pre-commit list
    Add {
        /// Names of the plugins to add
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Remove plugins from the pre-commit list
    #[command(alias = "rm")]
    Remove {
        /// Names of the plugins to remove
        #[arg(required = true)]
        names: Vec<String>,
    },
}
