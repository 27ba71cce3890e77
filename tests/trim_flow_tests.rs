//! End-to-end trim scenarios against an in-memory media element

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use vidtrim::app::{Session, TrimInteractor};
use vidtrim::domain::model::ReadyState;
use vidtrim::ports::*;
use vidtrim::*;

const TICK: Duration = Duration::from_millis(250);

/// Scripted misbehaviour of the fake timeline
#[derive(Debug, Clone, Default)]
struct Script {
    /// Playback reports `Ended` here instead of at the full duration
    playable: Option<f64>,
    /// A decode error is reported once playback reaches this position
    error_at: Option<f64>,
    /// The element drops its event channel once playback reaches this position
    close_at: Option<f64>,
    /// How long a seek takes to land
    seek_latency: Duration,
    /// Left in the channel after loading, as if from an earlier attempt
    stale: Vec<MediaEvent>,
}

/// Plays back a fake timeline: playback ticks every 250ms by a quarter
/// second
struct FakeLoader {
    duration: f64,
    chunks: Vec<Vec<u8>>,
    recorder_failure: Option<CaptureFailure>,
    script: Script,
}

impl FakeLoader {
    fn new(duration: f64) -> Self {
        Self {
            duration,
            chunks: vec![b"header".to_vec(), b"cluster".to_vec()],
            recorder_failure: None,
            script: Script::default(),
        }
    }

    fn scripted(duration: f64, script: Script) -> Self {
        Self {
            script,
            ..Self::new(duration)
        }
    }
}

#[async_trait]
impl MediaLoaderPort for FakeLoader {
    async fn load(
        &self,
        path: &Path,
        events: MediaEvents,
    ) -> Result<Box<dyn MediaElementPort>, DomainError> {
        if path.to_string_lossy().contains("missing") {
            return Err(DomainError::FileNotFound(path.display().to_string()));
        }
        let duration = if path.to_string_lossy().contains("short") {
            4.0
        } else {
            self.duration
        };
        let _ = events.send(MediaEvent::LoadedMetadata { duration });
        let _ = events.send(MediaEvent::LoadedData);
        for event in &self.script.stale {
            let _ = events.send(event.clone());
        }

        Ok(Box::new(FakeElement {
            duration,
            position: Arc::new(Mutex::new(0.0)),
            events: Arc::new(Mutex::new(Some(events))),
            ticker: None,
            chunks: self.chunks.clone(),
            recorder_failure: self.recorder_failure.clone(),
            script: self.script.clone(),
        }))
    }

    async fn probe(&self, _path: &Path) -> Result<MediaProbe, DomainError> {
        Ok(MediaProbe {
            container: "webm".to_string(),
            duration: self.duration,
            file_size: 0,
            streams: vec![],
        })
    }
}

/// Event sender shared with the ticker; `None` once the element hung up
type SharedEvents = Arc<Mutex<Option<MediaEvents>>>;

fn emit(events: &SharedEvents, event: MediaEvent) {
    if let Some(sender) = events.lock().unwrap().as_ref() {
        let _ = sender.send(event);
    }
}

struct FakeElement {
    duration: f64,
    position: Arc<Mutex<f64>>,
    events: SharedEvents,
    ticker: Option<JoinHandle<()>>,
    chunks: Vec<Vec<u8>>,
    recorder_failure: Option<CaptureFailure>,
    script: Script,
}

impl FakeElement {
    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Drop for FakeElement {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

impl MediaElementPort for FakeElement {
    fn ready_state(&self) -> ReadyState {
        ReadyState::HaveEnoughData
    }

    fn seek(&mut self, position: f64) -> Result<(), DomainError> {
        let position = position.clamp(0.0, self.duration);
        if self.script.seek_latency.is_zero() {
            *self.position.lock().unwrap() = position;
            emit(&self.events, MediaEvent::Seeked { position });
            return Ok(());
        }

        let latency = self.script.seek_latency;
        let current = Arc::clone(&self.position);
        let events = Arc::clone(&self.events);
        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            *current.lock().unwrap() = position;
            emit(&events, MediaEvent::Seeked { position });
        });
        Ok(())
    }

    fn play(&mut self) -> Result<(), DomainError> {
        self.stop_ticker();
        let position = Arc::clone(&self.position);
        let events = Arc::clone(&self.events);
        let script = self.script.clone();
        let end = script.playable.unwrap_or(self.duration).min(self.duration);
        emit(&events, MediaEvent::Playing);

        self.ticker = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(TICK).await;
                let now = {
                    let mut position = position.lock().unwrap();
                    *position = (*position + 0.25).min(end);
                    *position
                };
                emit(&events, MediaEvent::TimeUpdate { position: now });
                if script.error_at.is_some_and(|at| now >= at) {
                    emit(
                        &events,
                        MediaEvent::Error {
                            name: "MEDIA_ERR_DECODE".to_string(),
                            message: "corrupt frame".to_string(),
                        },
                    );
                    break;
                }
                if script.close_at.is_some_and(|at| now >= at) {
                    events.lock().unwrap().take();
                    break;
                }
                if now >= end {
                    emit(&events, MediaEvent::Ended);
                    break;
                }
            }
        }));
        Ok(())
    }

    fn pause(&mut self) -> Result<(), DomainError> {
        self.stop_ticker();
        emit(&self.events, MediaEvent::Paused);
        Ok(())
    }

    fn capture_stream(
        &mut self,
        _format: OutputFormat,
        events: RecorderEvents,
    ) -> Result<Box<dyn RecorderPort>, DomainError> {
        Ok(Box::new(FakeRecorder {
            events,
            chunks: self.chunks.clone(),
            failure: self.recorder_failure.clone(),
        }))
    }
}

struct FakeRecorder {
    events: RecorderEvents,
    chunks: Vec<Vec<u8>>,
    failure: Option<CaptureFailure>,
}

impl RecorderPort for FakeRecorder {
    fn start(&mut self) -> Result<(), DomainError> {
        let _ = self.events.send(RecorderEvent::Started);
        if let Some(failure) = self.failure.take() {
            let _ = self.events.send(RecorderEvent::Error(failure));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DomainError> {
        for chunk in self.chunks.drain(..) {
            let _ = self.events.send(RecorderEvent::DataAvailable(chunk));
        }
        let _ = self.events.send(RecorderEvent::Stopped);
        Ok(())
    }
}

fn session_with(loader: FakeLoader) -> Session {
    Session::new(Arc::new(loader), &AppConfig::default())
}

async fn loaded_session(loader: FakeLoader, file: &str) -> Session {
    let mut session = session_with(loader);
    session.select_file(Path::new(file)).await.unwrap();
    session.wait_for_metadata().await.unwrap();
    session
}

#[tokio::test(start_paused = true)]
async fn test_load_opens_default_window() {
    let session = loaded_session(FakeLoader::new(30.0), "clip.mp4").await;

    assert_eq!(session.workspace().duration(), 30.0);
    assert_eq!(session.workspace().range().start(), 0.0);
    assert_eq!(session.workspace().range().end(), 10.0);
    assert_eq!(session.status().to_string(), "Video loaded. Set your trim points.");
}

#[tokio::test(start_paused = true)]
async fn test_short_video_window_is_whole_video() {
    let session = loaded_session(FakeLoader::new(30.0), "short.mp4").await;
    assert_eq!(session.workspace().range().end(), 4.0);
}

#[tokio::test(start_paused = true)]
async fn test_start_past_end_pulls_end_along() {
    let mut session = loaded_session(FakeLoader::new(30.0), "clip.mp4").await;
    session.set_start(5.0);
    session.set_end(3.0);

    assert_eq!(session.workspace().range().start(), 5.0);
    assert_eq!(session.workspace().range().end(), 5.0);
}

#[tokio::test(start_paused = true)]
async fn test_trim_range_produces_clip() {
    let mut session = loaded_session(FakeLoader::new(30.0), "clip.mp4").await;
    session.set_end(8.0);
    session.set_start(2.0);

    session.trim().await.unwrap();

    assert_eq!(session.status().to_string(), "Video trimmed successfully!");
    assert!(!session.workspace().is_busy());
    let clip = session.workspace().result().unwrap();
    assert_eq!(clip.data(), b"headercluster");
    assert_eq!(clip.mime_type(), "video/webm");
}

#[tokio::test(start_paused = true)]
async fn test_download_writes_trimmed_file() {
    let mut session = loaded_session(FakeLoader::new(30.0), "clip.mp4").await;
    session.set_end(3.0);
    session.set_start(1.0);
    session.trim().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = session.download(dir.path()).await.unwrap();

    assert_eq!(path, dir.path().join("trimmed-video.webm"));
    assert_eq!(std::fs::read(path).unwrap(), b"headercluster");
}

#[tokio::test(start_paused = true)]
async fn test_trim_without_file() {
    let mut session = session_with(FakeLoader::new(30.0));

    let err = session.trim().await.unwrap_err();

    assert_eq!(err, DomainError::Validation(ValidationError::NoSource));
    assert_eq!(session.status().to_string(), "Please upload a video first.");
}

#[tokio::test(start_paused = true)]
async fn test_download_before_trim() {
    let mut session = loaded_session(FakeLoader::new(30.0), "clip.mp4").await;
    let dir = tempfile::tempdir().unwrap();

    assert_eq!(
        session.download(dir.path()).await.unwrap_err(),
        DomainError::NothingToDownload
    );
    assert_eq!(session.status().to_string(), "No trimmed video to download.");
}

#[tokio::test(start_paused = true)]
async fn test_end_not_after_start_is_refused() {
    let mut session = loaded_session(FakeLoader::new(30.0), "clip.mp4").await;
    session.set_start(10.0);

    assert!(session.trim().await.is_err());
    assert_eq!(session.status().to_string(), "End time must be greater than start time.");
    assert!(session.workspace().result().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_recorder_error_reported() {
    let mut loader = FakeLoader::new(30.0);
    loader.recorder_failure = Some(CaptureFailure::not_supported("codec not accepted"));
    let mut session = loaded_session(loader, "clip.mp4").await;

    let err = session.trim().await.unwrap_err();

    assert!(matches!(err, DomainError::Capture(ref f) if f.name == "NotSupportedError"));
    assert_eq!(
        session.status().to_string(),
        "Error during trimming: NotSupportedError"
    );
    assert!(session.workspace().result().is_none());
    assert!(!session.workspace().is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_range_shorter_than_delay_fails() {
    let loader = FakeLoader::new(30.0);
    let config = AppConfig::default();
    let mut session = Session::with_trimmer(
        Arc::new(loader),
        TrimInteractor::new(OutputFormat::Webm, Duration::from_secs(1)),
        Workspace::new(config.trim.default_window_secs),
    );
    session.select_file(Path::new("clip.mp4")).await.unwrap();
    session.wait_for_metadata().await.unwrap();
    session.set_end(2.1);
    session.set_start(2.0);

    assert!(session.trim().await.is_err());
    assert_eq!(
        session.status().to_string(),
        "Error during trimming: InvalidStateError"
    );
}

#[tokio::test(start_paused = true)]
async fn test_mkv_clip_name() {
    let mut session = Session::with_trimmer(
        Arc::new(FakeLoader::new(30.0)),
        TrimInteractor::new(OutputFormat::Mkv, Duration::from_millis(100)),
        Workspace::default(),
    );
    session.select_file(Path::new("clip.mp4")).await.unwrap();
    session.wait_for_metadata().await.unwrap();
    session.trim().await.unwrap();

    let clip = session.workspace().result().unwrap();
    assert_eq!(clip.file_name(), "trimmed-video.mkv");
    assert_eq!(clip.mime_type(), "video/x-matroska");
}

#[tokio::test(start_paused = true)]
async fn test_second_attempt_replaces_clip() {
    let mut session = loaded_session(FakeLoader::new(30.0), "clip.mp4").await;
    session.trim().await.unwrap();
    session.set_end(12.0);
    session.set_start(11.0);
    session.trim().await.unwrap();

    assert_eq!(session.status().to_string(), "Video trimmed successfully!");
    assert_eq!(session.workspace().result().unwrap().data(), b"headercluster");
}

#[tokio::test(start_paused = true)]
async fn test_new_selection_resets_state() {
    let mut session = loaded_session(FakeLoader::new(30.0), "clip.mp4").await;
    session.set_end(20.0);
    session.set_start(12.0);
    session.trim().await.unwrap();

    session.select_file(Path::new("short.mp4")).await.unwrap();
    assert!(session.workspace().result().is_none());
    assert!(session.status().is_empty());
    assert_eq!(session.workspace().range().start(), 0.0);

    session.wait_for_metadata().await.unwrap();
    assert_eq!(session.workspace().range().end(), 4.0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_file_reports_load_failure() {
    let mut session = session_with(FakeLoader::new(30.0));

    assert!(session.select_file(Path::new("missing.mp4")).await.is_err());
    assert_eq!(
        session.status().to_string(),
        "Could not load the selected video: NotFoundError"
    );
}

#[tokio::test(start_paused = true)]
async fn test_media_error_while_recording_fails_trim() {
    let script = Script {
        error_at: Some(4.0),
        ..Script::default()
    };
    let mut session = loaded_session(FakeLoader::scripted(30.0, script), "clip.mp4").await;
    session.set_end(8.0);
    session.set_start(2.0);

    let err = session.trim().await.unwrap_err();

    assert!(matches!(err, DomainError::Capture(ref f) if f.name == "MEDIA_ERR_DECODE"));
    assert_eq!(
        session.status().to_string(),
        "Error during trimming: MEDIA_ERR_DECODE"
    );
    assert!(session.workspace().result().is_none());
    assert!(!session.workspace().is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_element_hanging_up_aborts_trim() {
    let script = Script {
        close_at: Some(3.0),
        ..Script::default()
    };
    let mut session = loaded_session(FakeLoader::scripted(30.0, script), "clip.mp4").await;
    session.set_end(8.0);
    session.set_start(2.0);

    let err = session.trim().await.unwrap_err();

    assert!(matches!(err, DomainError::Capture(ref f) if f.name == "AbortError"));
    assert_eq!(session.status().to_string(), "Error during trimming: AbortError");
    assert!(session.workspace().result().is_none());
    assert!(!session.workspace().is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_leftover_events_do_not_steer_next_attempt() {
    // Left over from playback at 20s: would count as "seek done" and then
    // as "end passed before recording started" for a 2..8 range.
    let script = Script {
        seek_latency: Duration::from_millis(50),
        stale: vec![
            MediaEvent::Seeked { position: 20.0 },
            MediaEvent::TimeUpdate { position: 20.0 },
        ],
        ..Script::default()
    };
    let mut session = loaded_session(FakeLoader::scripted(30.0, script), "clip.mp4").await;
    session.set_end(8.0);
    session.set_start(2.0);

    session.trim().await.unwrap();

    assert_eq!(session.status().to_string(), "Video trimmed successfully!");
    assert_eq!(session.workspace().result().unwrap().data(), b"headercluster");
}

#[tokio::test(start_paused = true)]
async fn test_media_ending_early_finalizes_clip() {
    let script = Script {
        playable: Some(5.0),
        ..Script::default()
    };
    let mut session = loaded_session(FakeLoader::scripted(30.0, script), "clip.mp4").await;
    session.set_end(8.0);
    session.set_start(2.0);

    session.trim().await.unwrap();

    assert_eq!(session.status().to_string(), "Video trimmed successfully!");
    assert_eq!(session.workspace().result().unwrap().data(), b"headercluster");
}
