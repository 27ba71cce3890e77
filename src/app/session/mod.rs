// Session - One user's editing session: source, range, trim, download

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::{debug, info};

use crate::app::output_holder::OutputHolder;
use crate::app::trim_interactor::TrimInteractor;
use crate::config::AppConfig;
use crate::domain::errors::DomainError;
use crate::domain::model::{ReadyState, StatusMessage};
use crate::domain::workspace::Workspace;
use crate::ports::*;

struct LoadedElement {
    element: Box<dyn MediaElementPort>,
    events: UnboundedReceiver<MediaEvent>,
}

/// Owns the workspace record and the media element playing its source
pub struct Session {
    loader: Arc<dyn MediaLoaderPort>,
    trimmer: TrimInteractor,
    workspace: Workspace,
    loaded: Option<LoadedElement>,
}

impl Session {
    pub fn new(loader: Arc<dyn MediaLoaderPort>, config: &AppConfig) -> Self {
        Self::with_trimmer(
            loader,
            TrimInteractor::from_config(config),
            Workspace::new(config.trim.default_window_secs),
        )
    }

    pub fn with_trimmer(
        loader: Arc<dyn MediaLoaderPort>,
        trimmer: TrimInteractor,
        workspace: Workspace,
    ) -> Self {
        Self {
            loader,
            trimmer,
            workspace,
            loaded: None,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn status(&self) -> &StatusMessage {
        self.workspace.status()
    }

    /// Select a new file; the previous element and clip are discarded
    pub async fn select_file(&mut self, path: &Path) -> Result<(), DomainError> {
        self.loaded = None;
        self.workspace.select_source(path);

        let (events_tx, events_rx) = unbounded_channel();
        match self.loader.load(path, events_tx).await {
            Ok(element) => {
                self.loaded = Some(LoadedElement {
                    element,
                    events: events_rx,
                });
                Ok(())
            }
            Err(e) => {
                self.workspace.on_load_failed(load_failure_name(&e));
                Err(e)
            }
        }
    }

    /// Wait until the element reports its duration; returns it
    pub async fn wait_for_metadata(&mut self) -> Result<f64, DomainError> {
        let Some(loaded) = self.loaded.as_mut() else {
            self.workspace.on_load_failed("no media element");
            return Err(DomainError::BadArgs("No video selected".to_string()));
        };

        let outcome = loop {
            match loaded.events.recv().await {
                Some(MediaEvent::LoadedMetadata { duration }) => break Ok(duration),
                Some(MediaEvent::Error { name, message }) => break Err((name, message)),
                Some(other) => debug!(event = ?other, "ignoring media event while loading"),
                None => {
                    break Err((
                        "AbortError".to_string(),
                        "media element closed before metadata loaded".to_string(),
                    ))
                }
            }
        };

        match outcome {
            Ok(duration) => {
                self.workspace.on_metadata_loaded(duration);
                info!(duration, "Video loaded");
                Ok(duration)
            }
            Err((name, message)) => {
                self.loaded = None;
                self.workspace.on_load_failed(name);
                Err(DomainError::ProbeFail(message))
            }
        }
    }

    pub fn set_start(&mut self, value: f64) {
        self.workspace.set_start(value);
    }

    pub fn set_end(&mut self, value: f64) {
        self.workspace.set_end(value);
    }

    /// Trim the current range; the status line tells the outcome
    pub async fn trim(&mut self) -> Result<(), DomainError> {
        match self.loaded.as_mut() {
            Some(loaded) => {
                self.trimmer
                    .trim(&mut self.workspace, loaded.element.as_mut(), &mut loaded.events)
                    .await
            }
            // Without an element nothing can be ready; validation reports why.
            None => self
                .workspace
                .begin_trim(ReadyState::HaveNothing)
                .map(|_| ()),
        }
    }

    /// Write the clip into `dir` under its fixed name
    pub async fn download(&mut self, dir: &Path) -> Result<PathBuf, DomainError> {
        let clip = self.workspace.download_target()?;
        OutputHolder::download(clip, dir).await
    }

    /// Probe a written clip to confirm it plays
    pub async fn preview(&self, path: &Path) -> Result<MediaProbe, DomainError> {
        OutputHolder::preview(self.loader.as_ref(), path).await
    }
}

fn load_failure_name(error: &DomainError) -> String {
    match error {
        DomainError::FileNotFound(_) => "NotFoundError".to_string(),
        DomainError::ProbeFail(_) => "MEDIA_ERR_SRC_NOT_SUPPORTED".to_string(),
        _ => "UnknownError".to_string(),
    }
}
