//! # Media Storage
//!
//! Blob storage for uploaded media (carousel slides, button icons and
//! avatars). The filesystem store is the only production backend; when a
//! write fails the upload degrades to an inline `data:` URL so the console
//! keeps working without the media volume.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use thiserror::Error;

/// Errors from blob storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid media path '{0}'")]
    InvalidPath(String),
    #[error("write failed: {0}")]
    WriteFailed(#[from] std::io::Error),
}

/// A stored (or inlined) piece of media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    /// URL clients should use to display the media
    pub url: String,
    /// True when storage failed and the bytes were inlined as a data URL
    pub inlined: bool,
}

/// Abstraction over media blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `path`, returning the public URL.
    async fn put(
        &self,
        path: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError>;
}

/// Filesystem-backed blob store serving files under a URL prefix.
pub struct FsBlobStore {
    root: PathBuf,
    base_url: String,
}

impl FsBlobStore {
    pub fn new(root: PathBuf, base_url: String) -> Self {
        Self {
            root,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn validate_path(path: &str) -> Result<(), StorageError> {
        if path.is_empty()
            || path.starts_with('/')
            || path.split('/').any(|segment| {
                segment.is_empty() || segment == "." || segment == ".."
            })
        {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(
        &self,
        path: &str,
        _content_type: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        Self::validate_path(path)?;

        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        Ok(format!("{}/{}", self.base_url, path))
    }
}

/// Store media, degrading to an inline `data:` URL when the backend fails.
/// The upload itself never fails; a failed backing write only loses the
/// ability to serve the media from the store.
pub async fn store_with_fallback(
    store: &dyn BlobStore,
    path: &str,
    content_type: &str,
    bytes: &[u8],
) -> StoredMedia {
    match store.put(path, content_type, bytes).await {
        Ok(url) => StoredMedia {
            url,
            inlined: false,
        },
        Err(error) => {
            tracing::warn!(path, %error, "Media store write failed; inlining as data URL");
            StoredMedia {
                url: data_url(content_type, bytes),
                inlined: true,
            }
        }
    }
}

/// Encode bytes as an RFC 2397 `data:` URL.
pub fn data_url(content_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        content_type,
        general_purpose::STANDARD.encode(bytes)
    )
}
