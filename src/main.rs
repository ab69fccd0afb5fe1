//! Sora Fetch - download shared videos without the overlay.
//!
//! Resolves a share link to its asset code, pulls the media from the first
//! upstream that has it, removes the watermark when needed and writes the
//! result to disk.

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod delivery;
pub mod error;
pub mod guard;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if args.verbose {
        "sora_fetch=debug"
    } else {
        "sora_fetch=info"
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    cli::run_command(&args)
}
