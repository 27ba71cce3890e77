//! VidTrim Video Trimmer
//!
//! Plays the chosen range of a local video and records it into a clip.
//!
//! # Usage
//!
//! ```bash
//! vidtrim trim --input video.mp4 --start 2 --end 8
//! vidtrim trim --input video.mp4 --start 1:02.5 --end 1:10 --format mkv
//! vidtrim inspect --input video.mp4 --json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use vidtrim::adapters::init_logging;
use vidtrim::app::DefaultAppContainer;
use vidtrim::cli::{commands, Cli, Commands};
use vidtrim::config::AppConfig;

/// Main entry point for the VidTrim CLI application
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    if let Commands::Trim(args) = &cli.command {
        args.apply_to(&mut config)?;
    }
    config.validate()?;

    init_logging(&config.logging);
    info!("Starting VidTrim");

    vidtrim::init()?;
    let container = DefaultAppContainer::new(config)?;

    match cli.command {
        Commands::Trim(args) => {
            info!("Executing trim command");
            commands::trim(&container, args).await?;
        }
        Commands::Inspect(args) => {
            info!("Executing inspect command");
            commands::inspect(&container, args).await?;
        }
    }

    info!("VidTrim completed successfully");
    Ok(())
}
