//! SQLite storage backend.

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use super::{PositionRecord, PositionRow, StoreError, TripRecord};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS trips (
        trip_id TEXT PRIMARY KEY,
        route_id TEXT NOT NULL,
        start_time TEXT,
        direction_id INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS positions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        trip_id TEXT NOT NULL REFERENCES trips(trip_id),
        timestamp REAL NOT NULL,
        stop_id TEXT NOT NULL,
        distance REAL NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_positions_timestamp ON positions(timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_positions_trip_id ON positions(trip_id)",
];

/// SQLite-backed store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if necessary) the database at `url`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Self { pool })
    }

    /// An in-memory database with the schema applied, for tests and local
    /// experimentation.
    ///
    /// Uses a single-connection pool: each pooled connection would
    /// otherwise see its own independent in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn init_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn upsert_trips(&self, trips: &[TripRecord]) -> Result<(), StoreError> {
        if trips.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for trip in trips {
            sqlx::query(
                "INSERT INTO trips (trip_id, route_id, start_time, direction_id)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(trip_id) DO NOTHING",
            )
            .bind(&trip.trip_id)
            .bind(&trip.route_id)
            .bind(&trip.start_time)
            .bind(trip.direction_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn append_positions(&self, positions: &[PositionRecord]) -> Result<(), StoreError> {
        if positions.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for position in positions {
            sqlx::query(
                "INSERT INTO positions (trip_id, timestamp, stop_id, distance)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&position.trip_id)
            .bind(position.timestamp)
            .bind(&position.stop_id)
            .bind(position.distance)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_positions_before(&self, cutoff: f64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM positions WHERE timestamp < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn positions_since(
        &self,
        route_id: &str,
        cutoff: f64,
    ) -> Result<Vec<PositionRow>, StoreError> {
        let rows = sqlx::query_as::<_, PositionRow>(
            "SELECT p.trip_id, p.timestamp, p.distance, p.stop_id, t.direction_id
             FROM positions p
             JOIN trips t ON p.trip_id = t.trip_id
             WHERE t.route_id = ?1 AND p.timestamp > ?2
             ORDER BY p.timestamp ASC",
        )
        .bind(route_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
