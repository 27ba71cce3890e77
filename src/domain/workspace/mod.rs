// Workspace - The one record holding all session state

use std::path::PathBuf;

use tracing::debug;

use crate::domain::errors::DomainError;
use crate::domain::machine::{TrimOutcome, TrimPhase};
use crate::domain::model::*;
use crate::domain::rules::{TrimPlan, TrimValidator};

/// State that only exists once a file has been selected
#[derive(Debug, Clone)]
struct LoadedMedia {
    source: SourceMedia,
    phase: TrimPhase,
    result: Option<TrimResult>,
}

/// Everything the user sees and edits: source, range, result, status line.
///
/// The trim phase and the result live inside the selected-source branch so
/// an attempt without a source cannot be represented.
#[derive(Debug, Clone)]
pub struct Workspace {
    range: TrimRange,
    status: StatusMessage,
    media: Option<LoadedMedia>,
    default_window: f64,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SECONDS)
    }
}

impl Workspace {
    pub fn new(default_window: f64) -> Self {
        Self {
            range: TrimRange::default(),
            status: StatusMessage::Empty,
            media: None,
            default_window,
        }
    }

    pub fn range(&self) -> &TrimRange {
        &self.range
    }

    pub fn status(&self) -> &StatusMessage {
        &self.status
    }

    pub fn source(&self) -> Option<&SourceMedia> {
        self.media.as_ref().map(|media| &media.source)
    }

    /// Total duration in seconds, `0` while unknown
    pub fn duration(&self) -> f64 {
        self.source().map_or(0.0, SourceMedia::duration)
    }

    pub fn result(&self) -> Option<&TrimResult> {
        self.media.as_ref().and_then(|media| media.result.as_ref())
    }

    pub fn phase(&self) -> TrimPhase {
        self.media.as_ref().map_or(TrimPhase::Idle, |media| media.phase)
    }

    pub fn is_busy(&self) -> bool {
        self.phase().is_busy()
    }

    /// Whether the trim trigger is enabled
    pub fn can_trim(&self) -> bool {
        TrimValidator::can_trigger(self.source(), self.is_busy())
    }

    /// Replace the source and reset everything derived from the old one
    pub fn select_source(&mut self, path: impl Into<PathBuf>) {
        let source = SourceMedia::new(path);
        debug!(path = %source.path().display(), "source selected");
        self.media = Some(LoadedMedia {
            source,
            phase: TrimPhase::Idle,
            result: None,
        });
        self.status = StatusMessage::Empty;
        self.range.reset();
    }

    /// Duration became known: open the default window and report readiness
    pub fn on_metadata_loaded(&mut self, duration: f64) {
        let Some(media) = self.media.as_mut() else {
            return;
        };
        media.source.set_duration(duration);
        self.range.apply_default_window(self.default_window, duration);
        self.status = StatusMessage::Ready;
        debug!(duration, end = self.range.end(), "metadata loaded");
    }

    pub fn on_load_failed(&mut self, name: impl Into<String>) {
        self.status = StatusMessage::LoadFailed(name.into());
    }

    pub fn set_start(&mut self, value: f64) {
        self.range.set_start(value);
        self.status = StatusMessage::Empty;
    }

    pub fn set_end(&mut self, value: f64) {
        self.range.set_end(value);
        self.status = StatusMessage::Empty;
    }

    /// Validate a trim request and, if it passes, mark the workspace busy.
    ///
    /// An accepted request stays in `Validating` until the executor has its
    /// recorder and reports its own phase. A refused request only changes
    /// the status line.
    pub fn begin_trim(&mut self, ready_state: ReadyState) -> Result<TrimPlan, DomainError> {
        if self.is_busy() {
            return Err(DomainError::Busy);
        }

        self.set_phase(TrimPhase::Validating);
        let plan = match TrimValidator::validate(self.source(), ready_state, &self.range) {
            Ok(plan) => plan,
            Err(err) => {
                self.set_phase(TrimPhase::Idle);
                self.status = err.into();
                return Err(err.into());
            }
        };

        debug!(start = plan.start, end = plan.end, "trim accepted");
        self.status = StatusMessage::Trimming;
        Ok(plan)
    }

    /// Mirror the executor's phase while an attempt runs
    pub fn set_phase(&mut self, phase: TrimPhase) {
        if let Some(media) = self.media.as_mut() {
            media.phase = phase;
        }
    }

    /// Record how the running attempt ended and go back to idle
    pub fn finish_trim(&mut self, outcome: TrimOutcome) {
        let Some(media) = self.media.as_mut() else {
            return;
        };
        media.phase = TrimPhase::Idle;
        match outcome {
            TrimOutcome::Completed(result) => {
                media.result = Some(result);
                self.status = StatusMessage::Trimmed;
            }
            TrimOutcome::Failed(failure) => {
                self.status = StatusMessage::TrimFailed(failure.name);
            }
        }
    }

    /// The clip to hand out, or a `NothingToDownload` status if none exists
    pub fn download_target(&mut self) -> Result<&TrimResult, DomainError> {
        if self.result().is_none() {
            self.status = StatusMessage::NothingToDownload;
            return Err(DomainError::NothingToDownload);
        }
        self.result().ok_or(DomainError::NothingToDownload)
    }
}

#[cfg(test)]
mod tests;
