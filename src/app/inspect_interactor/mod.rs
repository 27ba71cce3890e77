// Inspect interactor - Reports what a file would look like once loaded

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::domain::errors::DomainError;
use crate::domain::model::TrimRange;
use crate::ports::{MediaLoaderPort, MediaProbe};

/// Probe result plus the range a fresh load would start with
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    #[serde(flatten)]
    pub probe: MediaProbe,
    pub default_start: f64,
    pub default_end: f64,
}

pub struct InspectInteractor {
    loader: Arc<dyn MediaLoaderPort>,
    default_window: f64,
}

impl InspectInteractor {
    pub fn new(loader: Arc<dyn MediaLoaderPort>, default_window: f64) -> Self {
        Self {
            loader,
            default_window,
        }
    }

    pub async fn inspect(&self, path: &Path) -> Result<InspectReport, DomainError> {
        info!(path = %path.display(), "Inspecting media file");
        let probe = self.loader.probe(path).await?;

        let mut range = TrimRange::default();
        range.apply_default_window(self.default_window, probe.duration);

        Ok(InspectReport {
            default_start: range.start(),
            default_end: range.end(),
            probe,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::*;
    use async_trait::async_trait;

    struct FixedProbe(f64);

    #[async_trait]
    impl MediaLoaderPort for FixedProbe {
        async fn load(
            &self,
            path: &Path,
            _events: MediaEvents,
        ) -> Result<Box<dyn MediaElementPort>, DomainError> {
            Err(DomainError::FileNotFound(path.display().to_string()))
        }

        async fn probe(&self, _path: &Path) -> Result<MediaProbe, DomainError> {
            Ok(MediaProbe {
                container: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
                duration: self.0,
                file_size: 1024,
                streams: vec![],
            })
        }
    }

    #[tokio::test]
    async fn test_short_video_window() {
        let interactor = InspectInteractor::new(Arc::new(FixedProbe(4.0)), 10.0);
        let report = interactor.inspect(Path::new("short.mp4")).await.unwrap();
        assert_eq!(report.default_start, 0.0);
        assert_eq!(report.default_end, 4.0);
    }

    #[tokio::test]
    async fn test_json_is_flat() {
        let interactor = InspectInteractor::new(Arc::new(FixedProbe(30.0)), 10.0);
        let report = interactor.inspect(Path::new("long.mp4")).await.unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["duration"], 30.0);
        assert_eq!(json["default_end"], 10.0);
    }
}
