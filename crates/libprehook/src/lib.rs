#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Core library for managing Git pre-commit hooks in Python projects.
//!
//! This crate provides the building blocks the `prehook` CLI is made of:
//! a thin wrapper around the `git` binary with a stash protocol that keeps
//! partially staged files intact while hook plugins rewrite them, the
//! `pyproject.toml` configuration model, installation and inspection of the
//! hook script itself, and the loop that runs the configured plugins.

/// `pyproject.toml` configuration model (`[tool.prehook]`).
pub mod config;
/// Error types shared across the crate.
mod error;
/// Git subprocess wrapper, status model, and the unstaged-changes stash.
pub mod git;
/// Installation and inspection of the pre-commit hook script.
pub mod hooks;
/// Execution of configured plugins against staged files.
pub mod runner;

/// Re-export of the crate-wide error and result types.
pub use error::{PrehookError, Result};
