//! VidTrim Video Trimmer Library
//!
//! Loads a local video, lets the caller pick a start and end point, then
//! plays that range and records it into a WebM or Matroska clip.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use config::AppConfig;
pub use domain::errors::{CaptureFailure, DomainError, ValidationError};
pub use domain::model::{OutputFormat, StatusMessage, TimeSpec, TrimRange, TrimResult};
pub use domain::workspace::Workspace;
pub use error::{VidTrimError, VidTrimResult};

/// Initialize VidTrim library
pub fn init() -> VidTrimResult<()> {
    ffmpeg_next::init().map_err(|e| VidTrimError::FFmpegInitError {
        message: e.to_string(),
    })?;

    Ok(())
}
