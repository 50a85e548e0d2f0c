//! CLI layer for scholar-lens.
//!
//! Provides the command-line interface using clap, with commands for
//! inspecting, indexing, searching, and conversing with a document.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands, LevelArg};
