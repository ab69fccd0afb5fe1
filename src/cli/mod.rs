//! Command-line interface for sora-fetch.
//!
//! This module provides CLI commands for fetching videos, extracting
//! asset codes and checking the local setup.

mod commands;

pub use commands::{Cli, Commands, run_command};
