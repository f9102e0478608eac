#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Terminal output primitives for prehook frontends.
//!
//! This crate isolates terminal rendering, prompts, and spinners so libprehook
//! can remain UI-agnostic. Use these helpers in the CLI or in the hook entry
//! point.

/// Terminal output abstractions and implementations.
mod output;

pub use output::{Output, OutputError, Quiet, Spinner, Terminal};
