//! The boundary between boards and the backend.
//!
//! A [`Gateway`] turns the four pin operations (fetch everything, create,
//! remove, update) into calls against a [`DocumentStore`] and a [`BlobStore`].
//! Every failure comes back as a [`GatewayError`] after being logged.

use std::{future::Future, time::Duration};

use crate::{
    config::Config,
    database::{DocumentStore, SqliteStore},
    error::{BlobError, GatewayError, PinboardError, UploadError},
    models::{
        image::{compress, ImageUpload},
        pin::{Pin, PinDraft, PinId, PinPatch},
    },
    storage::{BlobStore, FsBlobStore},
};

#[derive(Clone, Debug)]
pub struct Gateway<D, B> {
    documents: D,
    blobs: B,
    max_upload_bytes: usize,
    timeout: Option<Duration>,
}

impl Gateway<SqliteStore, FsBlobStore> {
    /// Opens the on-disk stores described by the current [`Config`].
    #[tracing::instrument]
    pub async fn open() -> Result<Self, PinboardError> {
        let (database_path, blobs_dir) = {
            let conf = Config::read().await;
            (conf.database_path(), conf.blobs_dir())
        };

        if let Some(parent) = database_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| BlobError::Io {
                    path: parent.to_string(),
                    err,
                })?;
        }

        let documents = SqliteStore::connect(&database_path).await?;
        let blobs = FsBlobStore::new(&blobs_dir).await?;
        Ok(Self::new(documents, blobs).await)
    }
}

impl<D: DocumentStore, B: BlobStore> Gateway<D, B> {
    /// Wraps the given stores, taking limits from the current [`Config`].
    pub async fn new(documents: D, blobs: B) -> Self {
        let conf = Config::read().await;
        Self::with_limits(
            documents,
            blobs,
            conf.max_upload_bytes,
            conf.backend_timeout(),
        )
    }

    pub fn with_limits(
        documents: D,
        blobs: B,
        max_upload_bytes: usize,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            documents,
            blobs,
            max_upload_bytes,
            timeout,
        }
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Grabs every pin in the collection, in no particular order.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_all(&self) -> Result<Vec<Pin>, GatewayError> {
        self.bounded("fetch all", self.documents.scan())
            .await?
            .inspect_err(|e| tracing::error!("Failed to fetch pins. err: {e}"))
            .map_err(GatewayError::FetchFailure)
    }

    /// Saves a new pin along with its image.
    ///
    /// This happens in steps: the pin is inserted with an empty image url,
    /// then its image is compressed, uploaded under the pin's id, and the pin
    /// is patched with the image's url. There's no rollback. If a step after
    /// the insert fails, the pin stays in the collection without an image,
    /// and the error carries its id.
    #[tracing::instrument(skip(self, image), fields(file = %image.file_name))]
    pub async fn create(&self, draft: PinDraft, image: &ImageUpload) -> Result<Pin, GatewayError> {
        let pin = self
            .bounded("insert", self.documents.insert(&draft))
            .await?
            .inspect_err(|e| tracing::error!("Error adding pin. err: {e}"))
            .map_err(GatewayError::PersistenceError)?;
        let id = pin.id;

        let upload_failure = |err: UploadError| {
            tracing::error!("Image upload for pin `{id}` failed. err: {err}");
            GatewayError::UploadFailure { id, err }
        };

        let prepared = compress(image, self.max_upload_bytes)
            .await
            .map_err(|e| upload_failure(e.into()))?;

        self.bounded("upload", self.blobs.put(id, &prepared))
            .await?
            .map_err(|e| upload_failure(e.into()))?;
        tracing::debug!("Uploaded image for pin `{id}`.");

        let url = self
            .bounded("image url", self.blobs.url(id))
            .await?
            .map_err(|e| upload_failure(e.into()))?;

        let pin = self
            .bounded("patch", self.documents.patch(id, &PinPatch::image_url(url)))
            .await?
            .inspect_err(|e| tracing::error!("Failed to attach image url to pin `{id}`. err: {e}"))
            .map_err(GatewayError::PersistenceError)?;

        tracing::info!("Saved pin `{id}`.");
        Ok(pin)
    }

    /// Deletes a pin and its image.
    ///
    /// The document decides the outcome. If the image can't be removed, it's
    /// left behind as an orphan and only a warning is logged.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, id: PinId) -> Result<(), GatewayError> {
        self.bounded("delete", self.documents.delete(id))
            .await?
            .inspect_err(|e| tracing::error!("Error deleting pin. err: {e}"))
            .map_err(|err| GatewayError::DeleteFailure { id, err })?;

        match self.bounded("delete image", self.blobs.delete(id)).await {
            Ok(Ok(())) => tracing::debug!("Image for pin `{id}` deleted."),
            Ok(Err(BlobError::Missing(_))) => {
                tracing::debug!("Pin `{id}` had no image to delete.")
            }
            Ok(Err(e)) => tracing::warn!("Pin `{id}` deleted, but its image stays. err: {e}"),
            Err(e) => tracing::warn!("Pin `{id}` deleted, but its image stays. err: {e}"),
        }

        Ok(())
    }

    /// Changes some of a pin's fields. Fields missing from `patch` are kept.
    #[tracing::instrument(skip(self))]
    pub async fn update(&self, id: PinId, patch: PinPatch) -> Result<Pin, GatewayError> {
        self.bounded("update", self.documents.patch(id, &patch))
            .await?
            .inspect_err(|e| tracing::error!("Failed to update pin. err: {e}"))
            .map_err(GatewayError::PersistenceError)
    }

    /// Runs `fut`, giving up after the configured timeout.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = T>,
    ) -> Result<T, GatewayError> {
        let Some(limit) = self.timeout else {
            return Ok(fut.await);
        };

        tokio::time::timeout(limit, fut).await.map_err(|_elapsed| {
            tracing::error!("Backend call `{operation}` timed out after {limit:?}.");
            GatewayError::TimedOut { operation }
        })
    }
}
