//! Implementations of the CLI subcommands.

pub mod activate;
pub mod check;
pub mod plugins;
pub mod run;
