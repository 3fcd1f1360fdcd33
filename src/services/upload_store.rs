use crate::error::AppError;
use crate::models::predict_types::{RawUpload, StoredImagePath};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

const DEFAULT_EXTENSION: &str = ".jpg";

/// Persists uploads under random names inside a single directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the upload directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            AppError::Storage(format!(
                "Failed to create upload directory {}: {}",
                self.dir.display(),
                e
            ))
        })
    }

    /// Write the upload to disk and fsync it before returning its path.
    pub async fn store(&self, raw: &RawUpload) -> Result<StoredImagePath, AppError> {
        let extension = upload_extension(raw.file_name.as_deref());
        let unique_name = format!("{}{}", uuid::Uuid::new_v4(), extension);
        let path = self.dir.join(unique_name);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                AppError::Storage(format!("Failed to create file {}: {}", path.display(), e))
            })?;

        file.write_all(&raw.bytes).await?;
        file.sync_all().await?;

        debug!(path = %path.display(), bytes = raw.bytes.len(), "stored upload");

        Ok(StoredImagePath::new(path))
    }
}

/// Extension (with leading dot) to keep for an upload.
///
/// A missing hint falls back to `.jpg`; a hint without an extension keeps none.
/// Only the last path component of the hint is looked at.
pub fn upload_extension(file_name: Option<&str>) -> String {
    let Some(name) = file_name.filter(|n| !n.is_empty()) else {
        return DEFAULT_EXTENSION.to_string();
    };

    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}
