// Output holder - Hands a finished clip out as a download and a preview

use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::errors::DomainError;
use crate::domain::model::TrimResult;
use crate::ports::{MediaLoaderPort, MediaProbe};

pub struct OutputHolder;

impl OutputHolder {
    /// Write `clip` to `dir/trimmed-video.<ext>`, replacing an earlier download
    pub async fn download(clip: &TrimResult, dir: &Path) -> Result<PathBuf, DomainError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| DomainError::FsFail(format!("Failed to create {}: {}", dir.display(), e)))?;

        let path = dir.join(clip.file_name());
        tokio::fs::write(&path, clip.data())
            .await
            .map_err(|e| DomainError::FsFail(format!("Failed to write {}: {}", path.display(), e)))?;

        info!(path = %path.display(), bytes = clip.len(), mime = clip.mime_type(), "Clip saved");
        Ok(path)
    }

    pub async fn preview(
        loader: &dyn MediaLoaderPort,
        path: &Path,
    ) -> Result<MediaProbe, DomainError> {
        loader.probe(path).await
    }
}
