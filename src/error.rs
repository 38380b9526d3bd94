use core::error::Error;
use pisserror::Error;

use crate::{config::Config, models::pin::PinId};

/// Stick this at the end of bug warnings/errors.
///
/// It helps users find out where to report bugs when looking at logs.
pub async fn bug_msg() -> String {
    format!(
        "this is a bug, so please report it! you can do so here: {}",
        Config::read().await.bug_report_url
    )
}

#[derive(Debug, Error)]
pub enum PinboardError {
    #[error("The pin store has encountered an error. See: `{_0}`")]
    DatabaseError(#[from] DatabaseError),

    #[error("The image store has encountered an error. See: `{_0}`")]
    BlobError(#[from] BlobError),

    #[error("Failed to load the pinboard config. See: `{_0}`")]
    ConfigError(#[from] ConfigError),

    #[error("A backend operation failed. See: `{_0}`")]
    GatewayError(#[from] GatewayError),

    #[error("The new pin couldn't be saved. See: `{_0}`")]
    ComposerError(#[from] ComposerError),
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("General database error. See: {_0}")]
    GeneralDatabaseError(#[from] sqlx::Error),

    #[error("Failed to connect to the database. See: {_0}")]
    ConnectionError(String),

    #[error("Migrating the database failed. See: {_0}")]
    MigrationFailed(#[from] sqlx::migrate::MigrateError),

    #[error("Couldn't continue with database insertion. See: {_0}")]
    InsertionFailed(String),

    #[error("No pin with id `{_0}` exists in the database.")]
    NotFound(PinId),
}

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Failed to access the image at `{path}`. Err: `{err}`")]
    Io { path: String, err: std::io::Error },

    #[error("No image is stored for pin `{_0}`.")]
    Missing(PinId),

    #[error("The image at `{_0}` can't be described by a `file://` url.")]
    NotAUrl(String),
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("The `image` crate failed to read this upload. Err: `{_0}`")]
    DecodeFailed(image::ImageError),

    #[error("The `image` crate failed to re-encode this upload. Err: `{_0}`")]
    EncodeFailed(image::ImageError),

    #[error("Couldn't shrink the image under {max_bytes} bytes. Smallest attempt: {smallest} bytes.")]
    TooLarge { max_bytes: usize, smallest: usize },

    #[error("A `tokio` task unexpectedly panicked. See: `{_0}`")]
    TokioJoinError(#[from] tokio::task::JoinError),
}

/// Everything that can go wrong while uploading a pin's image.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("compression failed: {_0}")]
    Compression(#[from] ImageError),

    #[error("blob storage failed: {_0}")]
    Storage(#[from] BlobError),
}

/// Failures reported by the [`Gateway`](crate::gateway::Gateway).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Listing the pin collection failed.
    #[error("Failed to fetch pins. See: `{_0}`")]
    FetchFailure(DatabaseError),

    /// Inserting or patching a pin document failed.
    #[error("Failed to persist pin. See: `{_0}`")]
    PersistenceError(DatabaseError),

    /// The pin document exists, but its image never made it. Its image url
    /// stays empty.
    #[error("Pin `{id}` was saved, but its image upload failed. See: `{err}`")]
    UploadFailure { id: PinId, err: UploadError },

    #[error("Failed to delete pin `{id}`. See: `{err}`")]
    DeleteFailure { id: PinId, err: DatabaseError },

    #[error("The backend didn't answer in time during `{operation}`.")]
    TimedOut { operation: &'static str },

    /// A random pin's image couldn't be made, so nothing was saved.
    #[error("Failed to generate an image for a random pin. See: `{_0}`")]
    Generator(ImageError),
}

#[derive(Debug, Error)]
pub enum ComposerError {
    #[error("The attached file `{file_name}` (`{media_type}`) is not an image.")]
    NotAnImage {
        file_name: String,
        media_type: String,
    },

    #[error("A pin needs an image before it can be saved.")]
    NoImage,

    #[error("The new-pin form isn't open.")]
    NotOpen,

    #[error("The backend rejected the pin. See: `{_0}`")]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    /// during fs read from disk
    #[error("Failed to read config file. See: `{_0}`")]
    ReadFailed(#[from] tokio::io::Error),

    /// parsing
    #[error("Failed to parse config file. See: `{_0}`")]
    ParseFailed(#[from] toml::de::Error),

    /// when we read from disk, the paths should be equal
    #[error("The config file's data directory didn't match the one it was loaded from.")]
    PathMismatch,
}
