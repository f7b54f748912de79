//! Persistence for trips and position samples.
//!
//! One interface, two interchangeable engines (SQLite and PostgreSQL),
//! selected by the `DATABASE_URL` scheme. All SQL lives in the backend
//! modules; nothing dialect-specific leaks into ingestion or serving.
//!
//! The data model has a single writer (the ingestion task) and many
//! readers. Trips are insert-if-absent and never mutated; positions are
//! append-only and pruned by age.

mod postgres;
mod sqlite;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

/// Errors from the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("unsupported database URL (expected sqlite: or postgres:): {url}")]
    UnsupportedScheme { url: String },
}

/// A trip row. Written insert-if-absent; later sightings of the same
/// trip_id never modify the stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRecord {
    pub trip_id: String,
    pub route_id: String,
    pub start_time: Option<String>,
    pub direction_id: i64,
}

/// One position sample. Append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRecord {
    pub trip_id: String,
    /// Unix seconds.
    pub timestamp: f64,
    pub stop_id: String,
    /// Normalized distance along the trip's route.
    pub distance: f64,
}

/// A position sample joined with its trip's metadata, as returned by the
/// windowed history query.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PositionRow {
    pub trip_id: String,
    pub timestamp: f64,
    pub distance: f64,
    pub stop_id: String,
    pub direction_id: i64,
}

/// Handle to the configured storage backend.
#[derive(Debug, Clone)]
pub enum Store {
    Sqlite(SqliteStore),
    Postgres(PostgresStore),
}

impl Store {
    /// Connect to the database named by `url` and select the backend from
    /// its scheme.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        if url.starts_with("sqlite:") {
            Ok(Store::Sqlite(SqliteStore::connect(url).await?))
        } else if url.starts_with("postgres:") || url.starts_with("postgresql:") {
            Ok(Store::Postgres(PostgresStore::connect(url).await?))
        } else {
            Err(StoreError::UnsupportedScheme {
                url: url.to_string(),
            })
        }
    }

    /// Create tables and indexes if they do not exist.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        match self {
            Store::Sqlite(s) => s.init_schema().await,
            Store::Postgres(s) => s.init_schema().await,
        }
    }

    /// Insert trips that do not yet exist, in one transaction. Existing
    /// rows are left untouched.
    pub async fn upsert_trips(&self, trips: &[TripRecord]) -> Result<(), StoreError> {
        match self {
            Store::Sqlite(s) => s.upsert_trips(trips).await,
            Store::Postgres(s) => s.upsert_trips(trips).await,
        }
    }

    /// Append position samples in one transaction.
    pub async fn append_positions(&self, positions: &[PositionRecord]) -> Result<(), StoreError> {
        match self {
            Store::Sqlite(s) => s.append_positions(positions).await,
            Store::Postgres(s) => s.append_positions(positions).await,
        }
    }

    /// Delete positions older than `cutoff` (Unix seconds). Returns the
    /// number of rows removed.
    pub async fn delete_positions_before(&self, cutoff: f64) -> Result<u64, StoreError> {
        match self {
            Store::Sqlite(s) => s.delete_positions_before(cutoff).await,
            Store::Postgres(s) => s.delete_positions_before(cutoff).await,
        }
    }

    /// Positions for a route with timestamp after `cutoff`, joined with
    /// trip metadata, ordered by timestamp ascending.
    pub async fn positions_since(
        &self,
        route_id: &str,
        cutoff: f64,
    ) -> Result<Vec<PositionRow>, StoreError> {
        match self {
            Store::Sqlite(s) => s.positions_since(route_id, cutoff).await,
            Store::Postgres(s) => s.positions_since(route_id, cutoff).await,
        }
    }
}
