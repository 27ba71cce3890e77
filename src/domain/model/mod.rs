// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Upper bound of the trim window applied once duration becomes known
pub const DEFAULT_WINDOW_SECONDS: f64 = 10.0;

/// Stem of the downloaded clip's file name
pub const TRIMMED_FILE_STEM: &str = "trimmed-video";

/// Time specification - represents time in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    /// Parse time string in various formats
    ///
    /// Accepts plain seconds (`12.5`), `MM:SS.ms` and `HH:MM:SS.ms`.
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();

        if let Ok(seconds) = trimmed.parse::<f64>() {
            if !seconds.is_finite() {
                return Err(DomainError::BadArgs(format!("Time must be a finite number: {}", trimmed)));
            }
            if seconds < 0.0 {
                return Err(DomainError::BadArgs("Time cannot be negative".to_string()));
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        let (hours, minutes, seconds_part) = match parts.as_slice() {
            [m, s] => (0, parse_component(m, "minutes")?, parse_seconds(s)?),
            [h, m, s] => {
                let minutes = parse_component(m, "minutes")?;
                if minutes >= 60 {
                    return Err(DomainError::BadArgs("Minutes must be less than 60".to_string()));
                }
                (parse_component(h, "hours")?, minutes, parse_seconds(s)?)
            }
            _ => {
                return Err(DomainError::BadArgs(
                    "Invalid time format. Supported formats: seconds (e.g., 12.5), MM:SS.ms (e.g., 2:30.5), HH:MM:SS.ms (e.g., 1:02:30.5)".to_string(),
                ))
            }
        };

        Ok(Self::from_seconds(
            hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds_part,
        ))
    }

    /// Format as `[H:]MM:SS.mmm`
    pub fn format_hms(&self) -> String {
        let total_millis = (self.seconds * 1000.0).round() as u64;
        let hours = total_millis / 3_600_000;
        let minutes = (total_millis % 3_600_000) / 60_000;
        let seconds = (total_millis % 60_000) / 1000;
        let millis = total_millis % 1000;

        if hours > 0 {
            format!("{}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
        } else {
            format!("{:02}:{:02}.{:03}", minutes, seconds, millis)
        }
    }
}

fn parse_component(value: &str, what: &str) -> Result<u32, DomainError> {
    value
        .parse::<u32>()
        .map_err(|_| DomainError::BadArgs(format!("Invalid {} format", what)))
}

fn parse_seconds(value: &str) -> Result<f64, DomainError> {
    let seconds = value
        .parse::<f64>()
        .map_err(|_| DomainError::BadArgs("Invalid seconds format".to_string()))?;
    if !(0.0..60.0).contains(&seconds) {
        return Err(DomainError::BadArgs("Seconds must be less than 60".to_string()));
    }
    Ok(seconds)
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

/// User-selected `(start, end)` sub-interval in seconds.
///
/// Keeps `0 <= start <= end` after every mutation. The bound against the
/// media duration is only enforced when a trim is requested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimRange {
    start: f64,
    end: f64,
}

impl Default for TrimRange {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: DEFAULT_WINDOW_SECONDS,
        }
    }
}

impl TrimRange {
    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// `start = clamp(value, 0, end)`
    pub fn set_start(&mut self, value: f64) {
        self.start = sanitize(value).min(self.end).max(0.0);
    }

    /// `end = max(value, start, 0)`
    pub fn set_end(&mut self, value: f64) {
        self.end = sanitize(value).max(self.start).max(0.0);
    }

    /// Collapse to `(0, 0)`; used when a new source is selected
    pub fn reset(&mut self) {
        self.start = 0.0;
        self.end = 0.0;
    }

    /// Pull the upper bound to `min(window, duration)` once duration is known
    pub fn apply_default_window(&mut self, window: f64, duration: f64) {
        self.end = window.min(duration).max(0.0);
        self.start = self.start.min(self.end);
    }
}

// NaN compares false against everything and would poison the clamps.
fn sanitize(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

/// Readiness ladder of a media element, ordered like the HTML one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

impl ReadyState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => ReadyState::HaveNothing,
            1 => ReadyState::HaveMetadata,
            2 => ReadyState::HaveCurrentData,
            3 => ReadyState::HaveFutureData,
            _ => ReadyState::HaveEnoughData,
        }
    }

    /// Enough data to seek and render the frame at the current position
    pub fn can_render_frames(self) -> bool {
        self >= ReadyState::HaveCurrentData
    }
}

/// The user's chosen file, exposed as something playable.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMedia {
    path: PathBuf,
    duration: Option<f64>,
}

impl SourceMedia {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            duration: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Duration in seconds; `0` until metadata has loaded
    pub fn duration(&self) -> f64 {
        self.duration.unwrap_or(0.0)
    }

    pub fn duration_known(&self) -> bool {
        self.duration.map_or(false, |d| d > 0.0)
    }

    pub(crate) fn set_duration(&mut self, duration: f64) {
        self.duration = Some(duration);
    }
}

/// Container the recorder produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[serde(alias = "video/webm")]
    Webm,
    #[serde(alias = "matroska", alias = "video/x-matroska")]
    Mkv,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_lowercase().as_str() {
            "webm" | "video/webm" => Ok(OutputFormat::Webm),
            "mkv" | "matroska" | "video/x-matroska" => Ok(OutputFormat::Mkv),
            other => Err(DomainError::BadArgs(format!(
                "Unsupported output format: {}. Valid formats: webm, mkv",
                other
            ))),
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Webm => "video/webm",
            OutputFormat::Mkv => "video/x-matroska",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Webm => "webm",
            OutputFormat::Mkv => "mkv",
        }
    }

    /// libav muxer short name
    pub fn muxer_name(self) -> &'static str {
        match self {
            OutputFormat::Webm => "webm",
            OutputFormat::Mkv => "matroska",
        }
    }

    /// Fixed download name, e.g. `trimmed-video.webm`
    pub fn file_name(self) -> String {
        format!("{}.{}", TRIMMED_FILE_STEM, self.extension())
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A finished clip: every recorder chunk concatenated in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimResult {
    data: Vec<u8>,
    format: OutputFormat,
}

impl TrimResult {
    pub fn from_chunks(chunks: Vec<Vec<u8>>, format: OutputFormat) -> Self {
        Self {
            data: chunks.concat(),
            format,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn file_name(&self) -> String {
        self.format.file_name()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The single status line shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusMessage {
    #[default]
    Empty,
    Ready,
    NoSource,
    NotLoaded,
    EndNotAfterStart,
    OutOfRange,
    Trimming,
    Trimmed,
    TrimFailed(String),
    NothingToDownload,
    LoadFailed(String),
}

impl StatusMessage {
    pub fn is_empty(&self) -> bool {
        matches!(self, StatusMessage::Empty)
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            StatusMessage::NoSource
                | StatusMessage::NotLoaded
                | StatusMessage::EndNotAfterStart
                | StatusMessage::OutOfRange
                | StatusMessage::TrimFailed(_)
                | StatusMessage::NothingToDownload
                | StatusMessage::LoadFailed(_)
        )
    }
}

impl From<crate::domain::errors::ValidationError> for StatusMessage {
    fn from(err: crate::domain::errors::ValidationError) -> Self {
        use crate::domain::errors::ValidationError;
        match err {
            ValidationError::NoSource => StatusMessage::NoSource,
            ValidationError::NotLoaded => StatusMessage::NotLoaded,
            ValidationError::EndNotAfterStart => StatusMessage::EndNotAfterStart,
            ValidationError::OutOfRange => StatusMessage::OutOfRange,
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMessage::Empty => Ok(()),
            StatusMessage::Ready => write!(f, "Video loaded. Set your trim points."),
            StatusMessage::NoSource => write!(f, "Please upload a video first."),
            StatusMessage::NotLoaded => {
                write!(f, "Video is not fully loaded yet. Please wait a moment.")
            }
            StatusMessage::EndNotAfterStart => {
                write!(f, "End time must be greater than start time.")
            }
            StatusMessage::OutOfRange => {
                write!(f, "Start or end time is outside the video's duration.")
            }
            StatusMessage::Trimming => write!(f, "Trimming video, please wait..."),
            StatusMessage::Trimmed => write!(f, "Video trimmed successfully!"),
            StatusMessage::TrimFailed(name) => write!(f, "Error during trimming: {}", name),
            StatusMessage::NothingToDownload => write!(f, "No trimmed video to download."),
            StatusMessage::LoadFailed(name) => {
                write!(f, "Could not load the selected video: {}", name)
            }
        }
    }
}
