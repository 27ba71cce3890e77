// Player LibAV adapter - Media element and recorder backed by libav

mod capture;
mod player;

use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ffmpeg_next as ffmpeg;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::config::AppConfig;
use crate::domain::errors::{CaptureFailure, DomainError};
use crate::domain::model::{OutputFormat, ReadyState};
use crate::ports::*;
use capture::CaptureRequest;
use player::PlayerCommand;

/// Opens local files as libav-backed media elements
pub struct LibavMediaLoader {
    rate: f64,
    chunk_size: usize,
}

impl LibavMediaLoader {
    pub fn new(config: &AppConfig) -> Result<Self, DomainError> {
        ffmpeg::init()
            .map_err(|e| DomainError::InternalError(format!("FFmpeg initialization failed: {}", e)))?;

        Ok(Self {
            rate: config.playback.rate,
            chunk_size: config.output.chunk_size,
        })
    }
}

#[async_trait]
impl MediaLoaderPort for LibavMediaLoader {
    async fn load(
        &self,
        path: &Path,
        events: MediaEvents,
    ) -> Result<Box<dyn MediaElementPort>, DomainError> {
        if !path.exists() {
            return Err(DomainError::FileNotFound(path.display().to_string()));
        }

        let ready = Arc::new(AtomicU8::new(ReadyState::HaveNothing as u8));
        let commands = player::spawn(path.to_path_buf(), self.rate, events, Arc::clone(&ready))?;
        debug!(path = %path.display(), rate = self.rate, "media element created");

        Ok(Box::new(LibavMediaElement {
            commands,
            ready,
            chunk_size: self.chunk_size,
        }))
    }

    async fn probe(&self, path: &Path) -> Result<MediaProbe, DomainError> {
        if !path.exists() {
            return Err(DomainError::FileNotFound(path.display().to_string()));
        }

        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || probe_file(&path))
            .await
            .map_err(|e| DomainError::InternalError(format!("probe task failed: {}", e)))?
    }
}

fn probe_file(path: &Path) -> Result<MediaProbe, DomainError> {
    let input = ffmpeg::format::input(&path)
        .map_err(|e| DomainError::ProbeFail(format!("Failed to open {}: {}", path.display(), e)))?;

    let file_size = std::fs::metadata(path)
        .map_err(|e| DomainError::FsFail(format!("Failed to get file metadata: {}", e)))?
        .len();

    let streams = input
        .streams()
        .map(|stream| {
            let parameters = stream.parameters();
            StreamSummary {
                index: stream.index(),
                kind: format!("{:?}", parameters.medium()).to_lowercase(),
                codec: parameters.id().name().to_string(),
            }
        })
        .collect();

    Ok(MediaProbe {
        container: input.format().name().to_string(),
        duration: (input.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64).max(0.0),
        file_size,
        streams,
    })
}

/// Handle to a player thread
pub struct LibavMediaElement {
    commands: UnboundedSender<PlayerCommand>,
    ready: Arc<AtomicU8>,
    chunk_size: usize,
}

impl LibavMediaElement {
    fn send(&self, command: PlayerCommand) -> Result<(), DomainError> {
        send_command(&self.commands, command)
    }
}

fn send_command(
    commands: &UnboundedSender<PlayerCommand>,
    command: PlayerCommand,
) -> Result<(), DomainError> {
    commands
        .send(command)
        .map_err(|_| DomainError::InternalError("media player has shut down".to_string()))
}

impl MediaElementPort for LibavMediaElement {
    fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.ready.load(Ordering::Acquire))
    }

    fn seek(&mut self, position: f64) -> Result<(), DomainError> {
        self.send(PlayerCommand::Seek(position))
    }

    fn play(&mut self) -> Result<(), DomainError> {
        self.send(PlayerCommand::Play)
    }

    fn pause(&mut self) -> Result<(), DomainError> {
        self.send(PlayerCommand::Pause)
    }

    fn capture_stream(
        &mut self,
        format: OutputFormat,
        events: RecorderEvents,
    ) -> Result<Box<dyn RecorderPort>, DomainError> {
        Ok(Box::new(LibavRecorder {
            commands: self.commands.clone(),
            format,
            chunk_size: self.chunk_size,
            events,
            active: false,
        }))
    }
}

/// Recorder over a player's capture stream
pub struct LibavRecorder {
    commands: UnboundedSender<PlayerCommand>,
    format: OutputFormat,
    chunk_size: usize,
    events: RecorderEvents,
    active: bool,
}

impl RecorderPort for LibavRecorder {
    fn start(&mut self) -> Result<(), DomainError> {
        if self.active {
            return Err(CaptureFailure::invalid_state("recorder is already recording").into());
        }
        send_command(
            &self.commands,
            PlayerCommand::StartCapture(CaptureRequest {
                format: self.format,
                chunk_size: self.chunk_size,
                events: self.events.clone(),
            }),
        )?;
        self.active = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DomainError> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        send_command(&self.commands, PlayerCommand::StopCapture)
    }
}
