//! Error handling module for VidTrim

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for VidTrim operations
#[derive(Error, Debug)]
pub enum VidTrimError {
    /// FFmpeg initialization error
    #[error("Failed to initialize FFmpeg: {message}")]
    FFmpegInitError { message: String },

    /// Configuration file or value error
    #[error("Invalid configuration: {message}")]
    ConfigError { message: String },

    /// Domain-level failure
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for VidTrim operations
pub type VidTrimResult<T> = std::result::Result<T, VidTrimError>;
