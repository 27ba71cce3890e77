// Trim state machine - Sequencing of one trim attempt

use std::fmt;

use crate::domain::errors::CaptureFailure;
use crate::domain::model::{OutputFormat, TrimResult};
use crate::domain::rules::TrimPlan;

/// Phase of the trim executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrimPhase {
    #[default]
    Idle,
    Validating,
    Seeking,
    Recording,
    Finalizing,
}

impl TrimPhase {
    pub fn is_busy(self) -> bool {
        self != TrimPhase::Idle
    }
}

impl fmt::Display for TrimPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrimPhase::Idle => "idle",
            TrimPhase::Validating => "validating",
            TrimPhase::Seeking => "seeking",
            TrimPhase::Recording => "recording",
            TrimPhase::Finalizing => "finalizing",
        };
        f.write_str(name)
    }
}

/// Notifications fed into the machine
#[derive(Debug, Clone, PartialEq)]
pub enum TrimInput {
    Seeked,
    TimeUpdate(f64),
    Ended,
    RecordDelayElapsed,
    RecorderStarted,
    Data(Vec<u8>),
    RecorderStopped,
    Fault(CaptureFailure),
}

/// Requests the machine makes of the element, the recorder and the timer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrimCommand {
    Seek(f64),
    Play,
    Pause,
    ArmRecordDelay,
    StartRecorder,
    StopRecorder,
}

/// How an attempt ended
#[derive(Debug, Clone, PartialEq)]
pub enum TrimOutcome {
    Completed(TrimResult),
    Failed(CaptureFailure),
}

/// Event-driven sequencer for one attempt:
/// seek, play, delayed record start, time watch, record stop, assembly.
///
/// Pure: it never touches the element or recorder itself, it only answers
/// each input with the commands the driver must carry out.
#[derive(Debug)]
pub struct TrimMachine {
    plan: TrimPlan,
    format: OutputFormat,
    phase: TrimPhase,
    time_watch: bool,
    recorder_started: bool,
    chunks: Vec<Vec<u8>>,
    outcome: Option<TrimOutcome>,
}

impl TrimMachine {
    /// Begin an attempt that already passed validation
    pub fn start(plan: TrimPlan, format: OutputFormat) -> (Self, Vec<TrimCommand>) {
        let machine = Self {
            plan,
            format,
            phase: TrimPhase::Seeking,
            time_watch: false,
            recorder_started: false,
            chunks: Vec::new(),
            outcome: None,
        };
        (machine, vec![TrimCommand::Seek(plan.start)])
    }

    pub fn phase(&self) -> TrimPhase {
        self.phase
    }

    /// Whether progress ticks are currently acted upon
    pub fn time_watch_attached(&self) -> bool {
        self.time_watch
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Hand over the outcome once the machine is back to idle
    pub fn take_outcome(&mut self) -> Option<TrimOutcome> {
        self.outcome.take()
    }

    /// Feed one notification; returns the commands to execute, in order
    pub fn handle(&mut self, input: TrimInput) -> Vec<TrimCommand> {
        if self.is_finished() {
            return Vec::new();
        }

        match (self.phase, input) {
            (_, TrimInput::Fault(failure)) => self.fail(failure),

            (TrimPhase::Seeking, TrimInput::Seeked) if !self.time_watch => {
                self.time_watch = true;
                vec![TrimCommand::Play, TrimCommand::ArmRecordDelay]
            }

            (TrimPhase::Seeking, TrimInput::RecordDelayElapsed) if self.time_watch => {
                self.phase = TrimPhase::Recording;
                self.recorder_started = true;
                vec![TrimCommand::StartRecorder]
            }

            (TrimPhase::Seeking, TrimInput::TimeUpdate(position))
                if self.time_watch && position >= self.plan.end =>
            {
                let mut commands = vec![TrimCommand::Pause];
                commands.extend(self.fail(CaptureFailure::invalid_state(
                    "end of range reached before recording started",
                )));
                commands
            }

            (TrimPhase::Seeking, TrimInput::Ended) if self.time_watch => {
                self.fail(CaptureFailure::invalid_state(
                    "media ended before recording started",
                ))
            }

            (TrimPhase::Recording, TrimInput::TimeUpdate(position))
                if position >= self.plan.end =>
            {
                self.phase = TrimPhase::Finalizing;
                vec![TrimCommand::Pause, TrimCommand::StopRecorder]
            }

            (TrimPhase::Recording, TrimInput::Ended) => {
                self.phase = TrimPhase::Finalizing;
                vec![TrimCommand::StopRecorder]
            }

            (TrimPhase::Recording | TrimPhase::Finalizing, TrimInput::Data(chunk)) => {
                if !chunk.is_empty() {
                    self.chunks.push(chunk);
                }
                Vec::new()
            }

            (TrimPhase::Recording | TrimPhase::Finalizing, TrimInput::RecorderStopped) => {
                self.finish();
                Vec::new()
            }

            // Started acknowledgements, ticks short of the end, stale seeks
            _ => Vec::new(),
        }
    }

    fn finish(&mut self) {
        let chunks = std::mem::take(&mut self.chunks);
        self.outcome = Some(TrimOutcome::Completed(TrimResult::from_chunks(
            chunks,
            self.format,
        )));
        self.detach();
    }

    fn fail(&mut self, failure: CaptureFailure) -> Vec<TrimCommand> {
        // A running recorder is stopped so it releases the capture stream;
        // its remaining chunks are discarded with the machine.
        let commands = if self.recorder_started && self.phase == TrimPhase::Recording {
            vec![TrimCommand::StopRecorder]
        } else {
            Vec::new()
        };
        self.chunks.clear();
        self.outcome = Some(TrimOutcome::Failed(failure));
        self.detach();
        commands
    }

    fn detach(&mut self) {
        self.time_watch = false;
        self.phase = TrimPhase::Idle;
    }
}
