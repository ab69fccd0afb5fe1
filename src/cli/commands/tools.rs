//! Identifier extraction, tool checks and config inspection.

use std::path::Path;

use crate::acquisition::{AcquireError, identifier, watermark};
use crate::config::{self, Config};
use crate::error::{Error, ResultExt};

/// Print the canonical asset code found in `input`
pub fn cmd_extract(input: &str) -> anyhow::Result<()> {
    let id = identifier::extract(input).ok_or(AcquireError::InvalidInput)?;
    println!("{}", id);
    Ok(())
}

/// Check if ffmpeg is installed and whether API credentials are available
pub fn cmd_check_tools(config: &Config) -> anyhow::Result<()> {
    println!("Checking acquisition tools...\n");

    match &config.watermark.ffmpeg_path {
        Some(path) if path.exists() => println!("✓ ffmpeg: {} (configured)", path.display()),
        Some(path) => println!("✗ ffmpeg: configured path {} does not exist", path.display()),
        None => match watermark::get_ffmpeg_version() {
            Some(version) => println!("✓ ffmpeg: {}", version),
            None => {
                println!("✗ ffmpeg: not found");
                print_ffmpeg_install_instructions();
            }
        },
    }

    let env_token = std::env::var("SORA_BEARER_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());
    let config_token = config
        .credentials
        .bearer_token
        .as_deref()
        .filter(|t| !t.trim().is_empty());

    match (env_token, config_token) {
        (Some(_), _) => println!("✓ Bearer token: set via SORA_BEARER_TOKEN"),
        (None, Some(_)) => println!("✓ Bearer token: set in config file"),
        (None, None) => {
            println!("- Bearer token: not configured (authenticated API source is skipped)")
        }
    }

    println!();
    println!("Sources in order:");
    println!("  1. {}", config.endpoints.proxy_base);
    println!("  2. {}", config.endpoints.api_base);
    println!("  3. {}", config.endpoints.cdn_base);
    Ok(())
}

/// Show the config file location and the effective settings
pub fn cmd_config(explicit: Option<&Path>, init: bool) -> anyhow::Result<()> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => config::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?,
    };

    if init {
        if path.exists() {
            println!("Config already exists at {}", path.display());
        } else {
            config::save_to(&Config::default(), &path)
                .map_err(Error::from)
                .with_context("Failed to write default config")?;
            println!("Wrote default config to {}", path.display());
        }
    }

    let effective = if path.exists() {
        config::load_from(&path)?
    } else {
        println!("# No config file at {}, showing defaults", path.display());
        Config::default()
    };

    println!("# {}", path.display());
    println!("{}", toml::to_string_pretty(&redacted(effective))?);
    Ok(())
}

/// Hide secrets before printing
fn redacted(mut config: Config) -> Config {
    let mask = |value: &mut Option<String>| {
        if value.as_deref().is_some_and(|v| !v.is_empty()) {
            *value = Some("<redacted>".to_string());
        }
    };
    mask(&mut config.credentials.bearer_token);
    mask(&mut config.credentials.cookie_header);
    config
}

/// Print installation instructions for ffmpeg
fn print_ffmpeg_install_instructions() {
    eprintln!("Install ffmpeg:");
    eprintln!("  Windows: winget install Gyan.FFmpeg");
    eprintln!("  macOS:   brew install ffmpeg");
    eprintln!("  Linux:   apt install ffmpeg");
}
