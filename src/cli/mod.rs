//! CLI module for VidTrim
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// VidTrim video trimmer
///
/// Plays the selected range of a local video and records it into a
/// WebM or Matroska clip.
#[derive(Parser, Debug)]
#[command(name = "vidtrim")]
#[command(about = "VidTrim - Record a trimmed clip out of a local video")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Config file (defaults to ./vidtrim.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Trim a segment out of a video file
    Trim(args::TrimArgs),
    /// Inspect video file information
    Inspect(args::InspectArgs),
}
