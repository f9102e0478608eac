#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Command-line interface for managing git pre-commit hooks via the
//! libprehook crate.

/// Command-line argument definitions.
mod args;
/// Implementations of the CLI subcommands.
mod commands;
/// Helpers bridging the output layer and domain errors.
mod ui;

use std::{
    io::{self, IsTerminal, Write},
    process,
    sync::Arc,
};

use anyhow::Result;
use clap::Parser;
use libprehook::PrehookError;
use prehook_term::{Output, Quiet, Terminal};

use crate::args::{Cli, Commands, PluginsCommand};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine color output preference early for error handling
    let color = if cli.color {
        true
    } else if cli.no_color {
        false
    } else {
        // Auto-detect based on terminal
        io::stdout().is_terminal()
    };

    // Create output handler for potential error messages
    let output: Arc<dyn Output> = if cli.quiet {
        Arc::new(Quiet)
    } else {
        Arc::new(Terminal::new(color))
    };

    // Handle errors with custom formatting
    if let Err(e) = run(cli, &output) {
        // Reset any existing colors only if color was enabled and stdout is a TTY
        if color && io::stdout().is_terminal() {
            print!("\x1b[0m");
            if let Err(flush_err) = io::stdout().flush() {
                eprintln!("Failed to flush stdout while resetting colors: {flush_err}");
            }
        }

        let exit_code = match e.downcast_ref::<PrehookError>() {
            Some(err @ PrehookError::UserAborted) => {
                if let Err(finish_err) = output.finish() {
                    eprintln!("Failed to flush output handler: {finish_err:#}");
                }
                err.exit_code()
            }
            Some(err) => {
                // Use the output handler to display the error
                if let Err(display_err) = output.fail(&format!("{e:#}")) {
                    eprintln!("Failed to report error via output handler: {display_err:#}");
                }
                if let Err(finish_err) = output.finish() {
                    eprintln!("Failed to flush output handler: {finish_err:#}");
                }
                err.exit_code()
            }
            None => {
                if let Err(display_err) = output.fail(&format!("{e:#}")) {
                    eprintln!("Failed to report error via output handler: {display_err:#}");
                }
                if let Err(finish_err) = output.finish() {
                    eprintln!("Failed to flush output handler: {finish_err:#}");
                }
                1
            }
        };

        process::exit(exit_code);
    }
    Ok(())
}

/// Execute the selected CLI command using the provided output implementation.
fn run(cli: Cli, output: &Arc<dyn Output>) -> Result<()> {
    match cli.command {
        Commands::Activate { force, mode } => {
            commands::activate::activate(output.as_ref(), cli.no_prompt, force, mode.as_deref())?;
        }
        Commands::Check => {
            commands::check::check(output.as_ref())?;
        }
        Commands::Plugins { command } => match command {
            PluginsCommand::List => commands::plugins::list(output.as_ref())?,
            PluginsCommand::Add { names } => commands::plugins::add(output.as_ref(), &names)?,
            PluginsCommand::Remove { names } => {
                commands::plugins::remove(output.as_ref(), &names)?;
            }
        },
        Commands::Run => {
            commands::run::run(output.as_ref())?;
        }
    }

    output.finish()?;
    Ok(())
}
