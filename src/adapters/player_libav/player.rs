//! Playback loop running on its own thread
//!
//! Demuxes the source in presentation pace (scaled by the playback rate),
//! reports progress ticks and feeds an attached capture sink. All libav
//! objects stay on this thread; the outside world talks to it through
//! [`PlayerCommand`]s.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ffmpeg_next::{self as ffmpeg, format, media, Packet, Rational};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use super::capture::{CaptureRequest, CaptureSink};
use crate::domain::errors::{CaptureFailure, DomainError};
use crate::domain::model::ReadyState;
use crate::ports::{MediaEvent, MediaEvents, RecorderEvent};

const MAX_PACING_SLEEP: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub(crate) enum PlayerCommand {
    Seek(f64),
    Play,
    Pause,
    StartCapture(CaptureRequest),
    StopCapture,
}

/// Start the player thread for `path`.
///
/// The thread exits when every command sender has been dropped.
pub(crate) fn spawn(
    path: PathBuf,
    rate: f64,
    events: MediaEvents,
    ready: Arc<AtomicU8>,
) -> Result<UnboundedSender<PlayerCommand>, DomainError> {
    let (commands_tx, commands_rx) = unbounded_channel();

    std::thread::Builder::new()
        .name("vidtrim-player".to_string())
        .spawn(move || match Player::open(&path, rate, events.clone(), ready) {
            Ok(player) => player.run(commands_rx),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to open media");
                let _ = events.send(MediaEvent::Error {
                    name: "MEDIA_ERR_SRC_NOT_SUPPORTED".to_string(),
                    message: e.to_string(),
                });
            }
        })
        .map_err(|e| DomainError::InternalError(format!("cannot start player thread: {}", e)))?;

    Ok(commands_tx)
}

struct Player {
    input: format::context::Input,
    video_stream: usize,
    time_bases: Vec<Rational>,
    duration: f64,
    rate: f64,
    events: MediaEvents,
    playing: bool,
    position: f64,
    /// Position the last seek asked for; demuxing resumes at the keyframe before it
    seek_target: f64,
    /// Wall instant and media position playback was (re)started from
    clock: Option<(Instant, f64)>,
    /// Packets since the last video keyframe, replayed into a new capture
    gop: Vec<Packet>,
    capture: Option<CaptureSink>,
}

impl Player {
    fn open(
        path: &Path,
        rate: f64,
        events: MediaEvents,
        ready: Arc<AtomicU8>,
    ) -> Result<Self, ffmpeg::Error> {
        let input = format::input(&path)?;
        let video = input
            .streams()
            .best(media::Type::Video)
            .ok_or(ffmpeg::Error::StreamNotFound)?;
        let video_stream = video.index();

        let mut duration = input.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64;
        if duration <= 0.0 {
            duration = video.duration() as f64 * f64::from(video.time_base());
        }
        if duration <= 0.0 {
            return Err(ffmpeg::Error::InvalidData);
        }

        let time_bases = input.streams().map(|stream| stream.time_base()).collect();

        // Local files are fully available once the header is read, so the
        // state is final before anyone hears about the metadata.
        ready.store(ReadyState::HaveEnoughData as u8, Ordering::Release);
        let _ = events.send(MediaEvent::LoadedMetadata { duration });
        let _ = events.send(MediaEvent::LoadedData);

        debug!(path = %path.display(), duration, video_stream, "media opened");

        Ok(Self {
            input,
            video_stream,
            time_bases,
            duration,
            rate,
            events,
            playing: false,
            position: 0.0,
            seek_target: 0.0,
            clock: None,
            gop: Vec::new(),
            capture: None,
        })
    }

    fn run(mut self, mut commands: UnboundedReceiver<PlayerCommand>) {
        loop {
            let command = if self.playing {
                match commands.try_recv() {
                    Ok(command) => Some(command),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => break,
                }
            } else {
                match commands.blocking_recv() {
                    Some(command) => Some(command),
                    None => break,
                }
            };

            match command {
                Some(command) => self.handle(command),
                None => self.step(),
            }
        }
        debug!("player thread exiting");
    }

    fn handle(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::Seek(position) => self.seek(position),
            PlayerCommand::Play => {
                if !self.playing {
                    self.playing = true;
                    self.clock = Some((Instant::now(), self.position));
                    self.emit(MediaEvent::Playing);
                }
            }
            PlayerCommand::Pause => {
                if self.playing {
                    self.playing = false;
                    self.clock = None;
                    self.emit(MediaEvent::Paused);
                }
            }
            PlayerCommand::StartCapture(request) => self.start_capture(request),
            PlayerCommand::StopCapture => {
                if let Some(sink) = self.capture.take() {
                    sink.finish();
                }
            }
        }
    }

    fn seek(&mut self, position: f64) {
        let target = (position * ffmpeg::ffi::AV_TIME_BASE as f64) as i64;
        // Land on the keyframe at or before the target so decoding can start there.
        if let Err(e) = self.input.seek(target, ..target) {
            self.emit(MediaEvent::Error {
                name: "MEDIA_ERR_DECODE".to_string(),
                message: format!("seek to {:.3}s failed: {}", position, e),
            });
            return;
        }

        self.gop.clear();
        self.position = position;
        self.seek_target = position;
        if self.playing {
            self.clock = Some((Instant::now(), position));
        }
        self.emit(MediaEvent::Seeked { position });
    }

    fn start_capture(&mut self, request: CaptureRequest) {
        let events = request.events.clone();
        if self.capture.is_some() {
            let _ = events.send(RecorderEvent::Error(CaptureFailure::invalid_state(
                "recorder is already recording",
            )));
            return;
        }

        // Frames between the keyframe and the seek target were never shown.
        let origin = self.position.max(self.seek_target);
        let mut sink = match CaptureSink::open(&self.input, origin, request) {
            Ok(sink) => sink,
            Err(failure) => {
                warn!(error = %failure, "cannot start capture");
                let _ = events.send(RecorderEvent::Error(failure));
                return;
            }
        };

        // The frame on screen depends on everything since the last keyframe;
        // replaying it primes the decoders, the sink drops what precedes `origin`.
        for packet in self.gop.drain(..) {
            if let Err(failure) = sink.write(&packet) {
                sink.fail(failure);
                return;
            }
        }

        let _ = events.send(RecorderEvent::Started);
        self.capture = Some(sink);
    }

    fn step(&mut self) {
        let mut packet = Packet::empty();
        match packet.read(&mut self.input) {
            Ok(()) => self.on_packet(packet),
            Err(ffmpeg::Error::Eof) => self.on_end(),
            Err(e) => {
                self.playing = false;
                self.clock = None;
                self.emit(MediaEvent::Error {
                    name: "MEDIA_ERR_DECODE".to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    fn on_packet(&mut self, packet: Packet) {
        let index = packet.stream();
        let is_video = index == self.video_stream;

        let tick = if is_video {
            packet
                .dts()
                .or(packet.pts())
                .map(|ts| ts as f64 * f64::from(self.time_bases[index]))
        } else {
            None
        };

        if let Some(sink) = self.capture.as_mut() {
            if let Err(failure) = sink.write(&packet) {
                if let Some(sink) = self.capture.take() {
                    sink.fail(failure);
                }
            }
        } else if is_video && packet.is_key() {
            self.gop.clear();
            self.gop.push(packet);
        } else if !self.gop.is_empty() {
            self.gop.push(packet);
        }

        if let Some(position) = tick {
            self.position = position;
            self.pace(position);
            self.emit(MediaEvent::TimeUpdate { position });
        }
    }

    fn on_end(&mut self) {
        self.position = self.position.max(self.duration);
        self.playing = false;
        self.clock = None;
        self.emit(MediaEvent::TimeUpdate {
            position: self.position,
        });
        self.emit(MediaEvent::Ended);
    }

    /// Hold the packet back until its presentation time at the current rate
    fn pace(&self, position: f64) {
        let Some((started, origin)) = self.clock else {
            return;
        };
        let media_elapsed = (position - origin).max(0.0) / self.rate;
        let due = started + Duration::from_secs_f64(media_elapsed);
        let now = Instant::now();
        if due > now {
            std::thread::sleep((due - now).min(MAX_PACING_SLEEP));
        }
    }

    fn emit(&self, event: MediaEvent) {
        let _ = self.events.send(event);
    }
}
