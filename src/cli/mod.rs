//! Command-line interface for sft-evolve.
//!
//! Provides the `run` command that drives a dataset through the editing
//! pipeline.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli, Commands, RunArgs};
