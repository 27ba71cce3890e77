//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::config::AppConfig;
use crate::domain::errors::DomainError;
use crate::domain::model::OutputFormat;

/// Arguments for the trim command
#[derive(Args, Debug)]
pub struct TrimArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Start time (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub start: Option<String>,

    /// End time (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub end: Option<String>,

    /// Directory the trimmed clip is saved to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Output container (webm or mkv)
    #[arg(long)]
    pub format: Option<String>,

    /// Playback speed multiplier
    #[arg(long)]
    pub rate: Option<f64>,

    /// Delay between playback start and recorder start
    #[arg(long)]
    pub record_delay_ms: Option<u64>,
}

impl TrimArgs {
    /// Layer the flags given on the command line over `config`
    pub fn apply_to(&self, config: &mut AppConfig) -> Result<(), DomainError> {
        if let Some(format) = &self.format {
            config.output.format = OutputFormat::parse(format)?;
        }
        if let Some(rate) = self.rate {
            config.playback.rate = rate;
        }
        if let Some(delay) = self.record_delay_ms {
            config.trim.record_start_delay_ms = delay;
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        Ok(())
    }
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
