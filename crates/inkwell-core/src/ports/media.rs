//! Media storage port - where uploaded post images live.

use async_trait::async_trait;

use crate::forms::{ImageKind, Upload};

/// Storage for uploaded files.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store an image under `folder` and return its path relative to the
    /// media root (e.g. `posts/3f2a...-small.gif`).
    async fn save_image(
        &self,
        folder: &str,
        upload: &Upload,
        kind: ImageKind,
    ) -> Result<String, MediaError>;

    /// Remove a stored file. Missing files are not an error.
    async fn remove(&self, path: &str) -> Result<(), MediaError>;
}

/// Media storage errors.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Storage I/O failed: {0}")]
    Io(String),

    #[error("Invalid media path: {0}")]
    InvalidPath(String),
}
