//! Filesystem media storage for uploaded post images.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use inkwell_core::forms::{ImageKind, Upload};
use inkwell_core::ports::{MediaError, MediaStore};

/// Stores uploads under a root directory, served back at `/media/`.
#[derive(Debug, Clone)]
pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keep the stem readable in URLs: ASCII alphanumerics, `-` and `_`.
    fn clean_stem(filename: &str) -> String {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let cleaned: String = stem
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .take(40)
            .collect();
        if cleaned.is_empty() {
            "image".to_string()
        } else {
            cleaned
        }
    }

    /// Resolve a stored relative path, refusing anything that escapes the root.
    fn resolve(&self, relative: &str) -> Result<PathBuf, MediaError> {
        let path = Path::new(relative);
        let safe = !relative.is_empty()
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(MediaError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn save_image(
        &self,
        folder: &str,
        upload: &Upload,
        kind: ImageKind,
    ) -> Result<String, MediaError> {
        let name = format!(
            "{}-{}.{}",
            Uuid::new_v4().simple(),
            Self::clean_stem(&upload.filename),
            kind.extension()
        );
        let relative = format!("{folder}/{name}");
        let target = self.resolve(&relative)?;

        if let Some(dir) = target.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| MediaError::Io(e.to_string()))?;
        }
        tokio::fs::write(&target, &upload.content)
            .await
            .map_err(|e| MediaError::Io(e.to_string()))?;

        tracing::info!(path = %relative, bytes = upload.content.len(), "Stored image");
        Ok(relative)
    }

    async fn remove(&self, path: &str) -> Result<(), MediaError> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediaError::Io(e.to_string())),
        }
    }
}
