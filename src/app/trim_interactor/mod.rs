// Trim interactor - Drives one trim attempt against a media element

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::domain::errors::{CaptureFailure, DomainError};
use crate::domain::machine::{TrimCommand, TrimInput, TrimMachine, TrimOutcome};
use crate::domain::model::OutputFormat;
use crate::domain::rules::TrimPlan;
use crate::domain::workspace::Workspace;
use crate::ports::*;

/// Runs the trim state machine, translating element and recorder
/// notifications into machine inputs and machine commands into port calls.
#[derive(Debug, Clone)]
pub struct TrimInteractor {
    format: OutputFormat,
    record_start_delay: Duration,
}

impl TrimInteractor {
    pub fn new(format: OutputFormat, record_start_delay: Duration) -> Self {
        Self {
            format,
            record_start_delay,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.output.format, config.trim.record_start_delay())
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Validate, then play and record the workspace's range.
    ///
    /// Whatever happens, the workspace's status line reflects it when this
    /// returns; the error is also handed back to the caller.
    pub async fn trim(
        &self,
        workspace: &mut Workspace,
        element: &mut dyn MediaElementPort,
        media_events: &mut UnboundedReceiver<MediaEvent>,
    ) -> Result<(), DomainError> {
        let plan = workspace.begin_trim(element.ready_state())?;
        info!(
            start = plan.start,
            end = plan.end,
            format = %self.format,
            "Trimming video"
        );

        let outcome = self.run(plan, workspace, element, media_events).await;
        let result = match &outcome {
            TrimOutcome::Completed(clip) => {
                info!(bytes = clip.len(), mime = clip.mime_type(), "Trim completed");
                Ok(())
            }
            TrimOutcome::Failed(failure) => {
                warn!(error = %failure, "Trim failed");
                // Playback would otherwise run on to the end of the media
                if let Err(e) = element.pause() {
                    debug!(error = %e, "pause after failed trim");
                }
                Err(DomainError::Capture(failure.clone()))
            }
        };
        workspace.finish_trim(outcome);
        result
    }

    async fn run(
        &self,
        plan: TrimPlan,
        workspace: &mut Workspace,
        element: &mut dyn MediaElementPort,
        media_events: &mut UnboundedReceiver<MediaEvent>,
    ) -> TrimOutcome {
        // Ticks queued by an earlier attempt must not reach this one.
        while media_events.try_recv().is_ok() {}

        let (recorder_tx, mut recorder_events) = unbounded_channel();
        let mut recorder = match element.capture_stream(self.format, recorder_tx) {
            Ok(recorder) => recorder,
            Err(e) => return TrimOutcome::Failed(to_failure(e)),
        };

        let (mut machine, commands) = TrimMachine::start(plan, self.format);
        let mut pending: VecDeque<TrimCommand> = commands.into();

        let record_delay = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(record_delay);
        let mut delay_armed = false;

        loop {
            while let Some(command) = pending.pop_front() {
                debug!(?command, phase = %machine.phase(), "trim command");
                let applied = match command {
                    TrimCommand::Seek(position) => element.seek(position),
                    TrimCommand::Play => element.play(),
                    TrimCommand::Pause => element.pause(),
                    TrimCommand::ArmRecordDelay => {
                        record_delay
                            .as_mut()
                            .reset(Instant::now() + self.record_start_delay);
                        delay_armed = true;
                        Ok(())
                    }
                    TrimCommand::StartRecorder => recorder.start(),
                    TrimCommand::StopRecorder => recorder.stop(),
                };
                if let Err(e) = applied {
                    pending.extend(machine.handle(TrimInput::Fault(to_failure(e))));
                }
            }

            workspace.set_phase(machine.phase());
            if let Some(outcome) = machine.take_outcome() {
                return outcome;
            }

            let input = tokio::select! {
                event = media_events.recv() => match event {
                    Some(event) => media_input(event),
                    None => Some(TrimInput::Fault(CaptureFailure::new(
                        "AbortError",
                        "media element closed during trim",
                    ))),
                },
                Some(event) = recorder_events.recv() => Some(recorder_input(event)),
                _ = &mut record_delay, if delay_armed => {
                    delay_armed = false;
                    Some(TrimInput::RecordDelayElapsed)
                }
            };

            let Some(input) = input else {
                continue;
            };
            let before = machine.phase();
            pending.extend(machine.handle(input));
            if machine.phase() != before {
                debug!(from = %before, to = %machine.phase(), "trim phase changed");
            }
        }
    }
}

/// Element notifications the machine cares about
fn media_input(event: MediaEvent) -> Option<TrimInput> {
    match event {
        MediaEvent::Seeked { .. } => Some(TrimInput::Seeked),
        MediaEvent::TimeUpdate { position } => Some(TrimInput::TimeUpdate(position)),
        MediaEvent::Ended => Some(TrimInput::Ended),
        MediaEvent::Error { name, message } => {
            Some(TrimInput::Fault(CaptureFailure::new(name, message)))
        }
        MediaEvent::LoadedMetadata { .. }
        | MediaEvent::LoadedData
        | MediaEvent::Playing
        | MediaEvent::Paused => None,
    }
}

fn recorder_input(event: RecorderEvent) -> TrimInput {
    match event {
        RecorderEvent::Started => TrimInput::RecorderStarted,
        RecorderEvent::DataAvailable(chunk) => TrimInput::Data(chunk),
        RecorderEvent::Stopped => TrimInput::RecorderStopped,
        RecorderEvent::Error(failure) => TrimInput::Fault(failure),
    }
}

fn to_failure(error: DomainError) -> CaptureFailure {
    match error {
        DomainError::Capture(failure) => failure,
        other => CaptureFailure::new("UnknownError", other.to_string()),
    }
}
