//! Command-line interface for phonodex.
//!
//! This module provides CLI commands for enriching, exporting, and
//! inspecting music files.

mod commands;

pub use commands::{Cli, Commands, run_command};
