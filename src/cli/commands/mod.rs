//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `fetch`: Batch acquisition and delivery to a directory
//! - `tools`: Identifier extraction, tool checks and config inspection

mod fetch;
mod tools;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::config::{self, Config};

pub use fetch::{FetchArgs, cmd_fetch};
pub use tools::{cmd_check_tools, cmd_config, cmd_extract};

/// Sora Fetch CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: OS config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Download one or more videos by share URL or code
    Fetch {
        /// Share URLs or bare codes
        #[arg(required = true)]
        inputs: Vec<String>,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        /// Bearer token for the authenticated API (or set SORA_BEARER_TOKEN)
        #[arg(long, env = "SORA_BEARER_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Cookie header sent with the token (or set SORA_COOKIES)
        #[arg(long, env = "SORA_COOKIES", hide_env_values = true)]
        cookies: Option<String>,
        /// Number of videos fetched concurrently
        #[arg(short, long, default_value = "2")]
        jobs: usize,
        /// Print one JSON object per input instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the asset code found in a URL
    Extract {
        /// Share URL or bare code
        input: String,
    },
    /// Check if ffmpeg is installed and credentials are configured
    CheckTools,
    /// Show the config file location and effective settings
    Config {
        /// Write the default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Fetch {
            inputs,
            output,
            token,
            cookies,
            jobs,
            json,
        } => {
            let rt = Runtime::new()?;
            let config = load_config(cli)?;
            let args = FetchArgs {
                inputs: inputs.clone(),
                output: output.clone(),
                token: token.clone(),
                cookies: cookies.clone(),
                jobs: *jobs,
                json: *json,
            };
            cmd_fetch(&rt, &config, &args)
        }
        Commands::Extract { input } => cmd_extract(input),
        Commands::CheckTools => cmd_check_tools(&load_config(cli)?),
        Commands::Config { init } => cmd_config(cli.config.as_deref(), *init),
    }
}

/// Explicit `--config` must load; the default location falls back to defaults.
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    match &cli.config {
        Some(path) => Ok(config::load_from(path)?),
        None => Ok(config::load()),
    }
}
