//! The parent of the other tests.
//!
//! Mostly to import the setup stuff below.

use std::{
    io::Cursor,
    str::FromStr as _,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use camino::Utf8PathBuf;
use pinboard::{
    database::{DocumentStore, SqliteStore},
    error::{BlobError, DatabaseError},
    gateway::Gateway,
    models::{
        image::{ImageUpload, PreparedImage},
        pin::{Pin, PinDraft, PinId, PinPatch, PinSize},
    },
    storage::{BlobStore, FsBlobStore},
};
use temp_dir::TempDir;
use tracing_subscriber::filter::EnvFilter;

pub type TestGateway = Gateway<FlakyDocuments, FlakyBlobs>;

/// A gateway over real stores that can be told to fail.
///
/// Keep the `TempDir` alive for as long as the gateway is used.
#[allow(dead_code, reason = "it's used in the other tests")]
pub struct Setup {
    pub gateway: TestGateway,
    pub blob_dir: TempDir,
}

/// call this at the top of any new test func! :)
#[allow(dead_code, reason = "it's used in the other tests")]
pub async fn setup() -> Setup {
    // start logging. other tests in this binary might've done it already
    _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_str("DEBUG,sqlx=INFO").unwrap())
        .with_test_writer()
        .try_init();

    let blob_dir = TempDir::new().expect("create blob temp dir");
    let root = Utf8PathBuf::try_from(blob_dir.path().to_path_buf()).unwrap();

    let documents = FlakyDocuments::new(SqliteStore::in_memory().await.expect("memory db"));
    let blobs = FlakyBlobs::new(FsBlobStore::new(&root).await.expect("blob store"));

    Setup {
        gateway: Gateway::with_limits(
            documents,
            blobs,
            1024 * 1024,
            Some(Duration::from_secs(10)),
        ),
        blob_dir,
    }
}

/// A small, real PNG.
#[allow(dead_code, reason = "it's used in the other tests")]
pub fn png_upload() -> ImageUpload {
    let img = image::RgbImage::from_pixel(16, 24, image::Rgb([200, 40, 90]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();

    ImageUpload::new("pin.png", "image/png", buf.into_inner())
}

/// Sample pin details for usage in tests, to decrease verbosity.
#[allow(dead_code, reason = "it's used in the other tests")]
pub fn draft(title: &str, tags: &[&str]) -> PinDraft {
    PinDraft {
        author: "tester".into(),
        board: "default".into(),
        title: title.into(),
        description: format!("all about {title}"),
        destination: "https://example.com/somewhere".into(),
        size: PinSize::Small,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

/// A [`SqliteStore`] with switches for failing on purpose.
pub struct FlakyDocuments {
    inner: SqliteStore,
    pub fail_insert: AtomicBool,
    pub fail_scan: AtomicBool,
}

impl FlakyDocuments {
    pub fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            fail_insert: AtomicBool::new(false),
            fail_scan: AtomicBool::new(false),
        }
    }
}

impl DocumentStore for FlakyDocuments {
    async fn insert(&self, draft: &PinDraft) -> Result<Pin, DatabaseError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(DatabaseError::InsertionFailed("told to fail".into()));
        }
        self.inner.insert(draft).await
    }

    async fn patch(&self, id: PinId, patch: &PinPatch) -> Result<Pin, DatabaseError> {
        self.inner.patch(id, patch).await
    }

    async fn scan(&self) -> Result<Vec<Pin>, DatabaseError> {
        if self.fail_scan.load(Ordering::SeqCst) {
            return Err(DatabaseError::ConnectionError("told to fail".into()));
        }
        self.inner.scan().await
    }

    async fn delete(&self, id: PinId) -> Result<(), DatabaseError> {
        self.inner.delete(id).await
    }
}

/// A [`FsBlobStore`] with switches for failing on purpose.
pub struct FlakyBlobs {
    inner: FsBlobStore,
    pub fail_put: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl FlakyBlobs {
    pub fn new(inner: FsBlobStore) -> Self {
        Self {
            inner,
            fail_put: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    #[allow(dead_code, reason = "it's used in the other tests")]
    pub fn inner(&self) -> &FsBlobStore {
        &self.inner
    }
}

impl BlobStore for FlakyBlobs {
    async fn put(&self, key: PinId, image: &PreparedImage) -> Result<(), BlobError> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(BlobError::Io {
                path: key.to_string(),
                err: std::io::Error::other("told to fail"),
            });
        }
        self.inner.put(key, image).await
    }

    async fn url(&self, key: PinId) -> Result<String, BlobError> {
        self.inner.url(key).await
    }

    async fn delete(&self, key: PinId) -> Result<(), BlobError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(BlobError::Io {
                path: key.to_string(),
                err: std::io::Error::other("told to fail"),
            });
        }
        self.inner.delete(key).await
    }
}
