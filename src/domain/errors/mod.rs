// Domain errors - Error types for the domain layer

use std::fmt;

/// Reasons a trim attempt is refused before anything is played or recorded.
///
/// Checked in declaration order; the first failing condition wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// No source has been selected
    NoSource,
    /// The element cannot seek or render frames yet
    NotLoaded,
    /// `end <= start`
    EndNotAfterStart,
    /// `start < 0` or `end > duration`
    OutOfRange,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NoSource => write!(f, "no video selected"),
            ValidationError::NotLoaded => write!(f, "video is not loaded"),
            ValidationError::EndNotAfterStart => write!(f, "end time is not after start time"),
            ValidationError::OutOfRange => write!(f, "trim range is outside the video's duration"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Failure reported by the capture/recording pipeline or by the media element
/// while an attempt is in flight.
///
/// `name` is the short machine-readable error class shown to the user
/// (e.g. `NotSupportedError`), `message` carries the underlying detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFailure {
    pub name: String,
    pub message: String,
}

impl CaptureFailure {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Recorder was asked to stop before it ever started
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new("InvalidStateError", message)
    }

    /// Container/codec combination the recorder cannot produce
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new("NotSupportedError", message)
    }

    /// Muxing or I/O failure while recording
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::new("EncodingError", message)
    }
}

impl fmt::Display for CaptureFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for CaptureFailure {}

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    BadArgs(String),
    /// File not found
    FileNotFound(String),
    /// Media could not be opened or probed
    ProbeFail(String),
    /// Trim preconditions not met
    Validation(ValidationError),
    /// Recording failed mid-attempt
    Capture(CaptureFailure),
    /// A trim attempt is already running
    Busy,
    /// Download requested before any clip was produced
    NothingToDownload,
    /// File system failure
    FsFail(String),
    /// Internal error
    InternalError(String),
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::FileNotFound(msg) => write!(f, "File not found: {}", msg),
            DomainError::ProbeFail(msg) => write!(f, "Probe failed: {}", msg),
            DomainError::Validation(err) => write!(f, "Cannot trim: {}", err),
            DomainError::Capture(failure) => write!(f, "Recording failed: {}", failure),
            DomainError::Busy => write!(f, "A trim is already in progress"),
            DomainError::NothingToDownload => write!(f, "No trimmed video to download"),
            DomainError::FsFail(msg) => write!(f, "File system error: {}", msg),
            DomainError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        DomainError::Validation(err)
    }
}

impl From<CaptureFailure> for DomainError {
    fn from(failure: CaptureFailure) -> Self {
        DomainError::Capture(failure)
    }
}
