//! Blob storage for pin images.
//!
//! Each pin has at most one image, stored under the pin's id.

use std::future::Future;

use camino::{Utf8Path, Utf8PathBuf};
use image::ImageFormat;
use url::Url;

use crate::{
    error::BlobError,
    models::{image::PreparedImage, pin::PinId},
};

/// Key-value storage for images, keyed by pin id.
pub trait BlobStore: Send + Sync {
    /// Stores `image` under `key`, replacing anything already there.
    fn put(
        &self,
        key: PinId,
        image: &PreparedImage,
    ) -> impl Future<Output = Result<(), BlobError>> + Send;

    /// A url that the image under `key` can be loaded from.
    fn url(&self, key: PinId) -> impl Future<Output = Result<String, BlobError>> + Send;

    /// Removes the image under `key`.
    fn delete(&self, key: PinId) -> impl Future<Output = Result<(), BlobError>> + Send;
}

/// Images kept as plain files inside a folder.
///
/// Files are named `{id}.{ext}`, where the extension comes from the image's
/// media type.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: Utf8PathBuf,
}

impl FsBlobStore {
    /// Uses `root` for blobs, creating it if needed.
    #[tracing::instrument]
    pub async fn new(root: &Utf8Path) -> Result<Self, BlobError> {
        tokio::fs::create_dir_all(root)
            .await
            .inspect_err(|e| tracing::error!("Failed to create blob folder. err: {e}"))
            .map_err(|err| BlobError::Io {
                path: root.to_string(),
                err,
            })?;

        // urls handed out should keep working if the working dir changes
        let root = root
            .canonicalize_utf8()
            .inspect_err(|e| tracing::warn!("Failed to canon-ize blob folder. err: {e}"))
            .unwrap_or_else(|_| root.to_path_buf());

        Ok(Self { root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Where a new image for `key` goes.
    fn path_for(&self, key: PinId, media_type: &str) -> Utf8PathBuf {
        let ext = ImageFormat::from_mime_type(media_type)
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or("bin");

        self.root.join(format!("{key}.{ext}"))
    }

    /// Looks for the file currently holding the image for `key`.
    async fn find(&self, key: PinId) -> Result<Option<Utf8PathBuf>, BlobError> {
        let io_err = |err: std::io::Error| BlobError::Io {
            path: self.root.to_string(),
            err,
        };

        let stem = key.to_string();
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(io_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let Ok(path) = Utf8PathBuf::try_from(entry.path()) else {
                continue;
            };

            if path.file_stem() == Some(stem.as_str()) {
                return Ok(Some(path));
            }
        }

        Ok(None)
    }
}

impl BlobStore for FsBlobStore {
    #[tracing::instrument(skip(self, image), fields(len = image.bytes.len(), media_type = %image.media_type))]
    async fn put(&self, key: PinId, image: &PreparedImage) -> Result<(), BlobError> {
        // the old image might've had another extension
        if self.find(key).await?.is_some() {
            self.delete(key).await?;
        }

        let path = self.path_for(key, &image.media_type);
        tokio::fs::write(&path, &image.bytes)
            .await
            .inspect_err(|e| tracing::error!("Failed to write blob. err: {e}"))
            .map_err(|err| BlobError::Io {
                path: path.to_string(),
                err,
            })?;

        tracing::debug!("Uploaded image for pin `{key}` to `{path}`.");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn url(&self, key: PinId) -> Result<String, BlobError> {
        let path = self.find(key).await?.ok_or(BlobError::Missing(key))?;

        Url::from_file_path(path.as_std_path())
            .map(|url| url.to_string())
            .map_err(|()| BlobError::NotAUrl(path.to_string()))
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, key: PinId) -> Result<(), BlobError> {
        let path = self.find(key).await?.ok_or(BlobError::Missing(key))?;

        tokio::fs::remove_file(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                BlobError::Missing(key)
            } else {
                BlobError::Io {
                    path: path.to_string(),
                    err,
                }
            }
        })
    }
}
