//! The pin collection.
//!
//! The gateway only needs a handful of document operations, so they're
//! described by [`DocumentStore`]. [`SqliteStore`] is the SQLite-backed one.

use std::future::Future;

use camino::Utf8Path;
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    types::Json,
    Executor, Pool, Sqlite,
};
use uuid::Uuid;

use crate::{
    error::DatabaseError,
    models::pin::{Pin, PinDraft, PinId, PinPatch},
};

pub const PINS_TABLE: &str = "pins";

/// A collection of pin documents with backend-assigned identifiers.
///
/// No field queries are offered. Callers scan everything and filter
/// themselves.
pub trait DocumentStore: Send + Sync {
    /// Inserts a new pin with an empty image url and returns it, id included.
    fn insert(&self, draft: &PinDraft) -> impl Future<Output = Result<Pin, DatabaseError>> + Send;

    /// Merges `patch` into the stored pin, returning the result.
    fn patch(
        &self,
        id: PinId,
        patch: &PinPatch,
    ) -> impl Future<Output = Result<Pin, DatabaseError>> + Send;

    /// Reads every pin in the collection.
    fn scan(&self) -> impl Future<Output = Result<Vec<Pin>, DatabaseError>> + Send;

    /// Removes a pin. Fails with [`DatabaseError::NotFound`] if there's no such pin.
    fn delete(&self, id: PinId) -> impl Future<Output = Result<(), DatabaseError>> + Send;
}

/// Pins stored in a SQLite database.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Opens (or creates) the database file at `path` and migrates it.
    #[tracing::instrument]
    pub async fn connect(path: &Utf8Path) -> Result<Self, DatabaseError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .inspect_err(|e| tracing::error!("Failed to connect to pin database. err: {e}"))
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Self::from_pool(pool).await
    }

    /// A private, throwaway database that lives in memory.
    ///
    /// Everything shares one connection, since each SQLite memory connection
    /// would otherwise get its own database.
    pub async fn in_memory() -> Result<Self, DatabaseError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Self::from_pool(pool).await
    }

    /// Wraps an existing pool, running migrations on it first.
    pub async fn from_pool(pool: Pool<Sqlite>) -> Result<Self, DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .inspect_err(|e| {
                tracing::error!("Database connection succeeded, but migrating failed! err: {e}")
            })?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Reads one pin, using either the pool or an open transaction.
    async fn get<'c, E>(executor: E, id: PinId) -> Result<Pin, DatabaseError>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        sqlx::query_as::<_, Pin>(&format!("SELECT * FROM {PINS_TABLE} WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or(DatabaseError::NotFound(id))
    }
}

impl DocumentStore for SqliteStore {
    #[tracing::instrument(skip(self))]
    async fn insert(&self, draft: &PinDraft) -> Result<Pin, DatabaseError> {
        let pin = draft.clone().into_pin(Uuid::new_v4(), Utc::now());

        sqlx::query(&format!(
            r#"
            INSERT INTO {PINS_TABLE}
            (id, author, board, title, description, destination, image_url, size, tags, created_at)
            VALUES
            ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#
        ))
        .bind(pin.id)
        .bind(&pin.author)
        .bind(&pin.board)
        .bind(&pin.title)
        .bind(&pin.description)
        .bind(&pin.destination)
        .bind(&pin.image_url)
        .bind(pin.size)
        .bind(Json(&pin.tags))
        .bind(pin.created_at)
        .execute(&self.pool)
        .await
        .inspect_err(|e| tracing::error!("Pin insertion failed! err: {e}"))
        .map_err(|e| DatabaseError::InsertionFailed(e.to_string()))?;

        tracing::debug!("Inserted pin `{}`.", pin.id);
        Ok(pin)
    }

    #[tracing::instrument(skip(self))]
    async fn patch(&self, id: PinId, patch: &PinPatch) -> Result<Pin, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let mut pin = Self::get(&mut *tx, id).await?;

        patch.clone().apply(&mut pin);

        sqlx::query(&format!(
            r#"
            UPDATE {PINS_TABLE} SET
                title = $2,
                description = $3,
                destination = $4,
                image_url = $5,
                size = $6,
                tags = $7
            WHERE id = $1
            "#
        ))
        .bind(id)
        .bind(&pin.title)
        .bind(&pin.description)
        .bind(&pin.destination)
        .bind(&pin.image_url)
        .bind(pin.size)
        .bind(Json(&pin.tags))
        .execute(&mut *tx)
        .await
        .inspect_err(|e| tracing::error!("Pin update failed! err: {e}"))?;

        tx.commit().await?;
        Ok(pin)
    }

    #[tracing::instrument(skip(self))]
    async fn scan(&self) -> Result<Vec<Pin>, DatabaseError> {
        let pins = sqlx::query_as::<_, Pin>(&format!(
            "SELECT * FROM {PINS_TABLE} ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!("Failed to list pins! err: {e}"))?;

        tracing::debug!("Found {} pins.", pins.len());
        Ok(pins)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: PinId) -> Result<(), DatabaseError> {
        let res = sqlx::query(&format!("DELETE FROM {PINS_TABLE} WHERE id = $1"))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(id));
        }

        Ok(())
    }
}
