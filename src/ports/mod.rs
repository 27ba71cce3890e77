// Ports - Interface definitions (contracts)

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::domain::errors::{CaptureFailure, DomainError};
use crate::domain::model::{OutputFormat, ReadyState};

/// Notifications a media element emits while it loads and plays
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Header decoded; total duration in seconds is known
    LoadedMetadata { duration: f64 },
    /// Frame at the current position can be rendered
    LoadedData,
    /// A requested seek has taken effect
    Seeked { position: f64 },
    /// Playback started or resumed
    Playing,
    /// Playback progress tick
    TimeUpdate { position: f64 },
    /// Playback paused on request
    Paused,
    /// Playback reached the end of the media
    Ended,
    /// Loading or playback failed
    Error { name: String, message: String },
}

/// Notifications a recorder sink emits
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    Started,
    /// Encoded bytes, delivered in order
    DataAvailable(Vec<u8>),
    /// All data has been delivered
    Stopped,
    Error(CaptureFailure),
}

pub type MediaEvents = UnboundedSender<MediaEvent>;
pub type RecorderEvents = UnboundedSender<RecorderEvent>;

/// A playable view of the selected source.
///
/// Every request completes asynchronously: its outcome is reported on the
/// event channel the element was loaded with.
pub trait MediaElementPort: Send {
    /// Current readiness of the element
    fn ready_state(&self) -> ReadyState;

    /// Move the play position; completion is reported as `MediaEvent::Seeked`
    fn seek(&mut self, position: f64) -> Result<(), DomainError>;

    /// Start playback; progress is reported as `MediaEvent::TimeUpdate`
    fn play(&mut self) -> Result<(), DomainError>;

    /// Stop playback at the current position
    fn pause(&mut self) -> Result<(), DomainError>;

    /// Tap the element's live output and create a recorder sink over it
    fn capture_stream(
        &mut self,
        format: OutputFormat,
        events: RecorderEvents,
    ) -> Result<Box<dyn RecorderPort>, DomainError>;
}

/// Consumes a capture stream and emits encoded data chunks until stopped
pub trait RecorderPort: Send {
    fn start(&mut self) -> Result<(), DomainError>;

    fn stop(&mut self) -> Result<(), DomainError>;
}

/// Opens media elements and probes files
#[async_trait]
pub trait MediaLoaderPort: Send + Sync {
    /// Open `path` as a media element reporting on `events`.
    ///
    /// Returns as soon as the element exists; metadata follows as
    /// `MediaEvent::LoadedMetadata`, failures as `MediaEvent::Error`.
    async fn load(
        &self,
        path: &Path,
        events: MediaEvents,
    ) -> Result<Box<dyn MediaElementPort>, DomainError>;

    /// Read container and stream information without playing
    async fn probe(&self, path: &Path) -> Result<MediaProbe, DomainError>;
}

/// Summary of a media file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaProbe {
    pub container: String,
    pub duration: f64,
    pub file_size: u64,
    pub streams: Vec<StreamSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamSummary {
    pub index: usize,
    pub kind: String,
    pub codec: String,
}
