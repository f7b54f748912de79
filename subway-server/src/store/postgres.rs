//! PostgreSQL storage backend.
//!
//! Mirrors the SQLite backend exactly; only the SQL dialect differs
//! (placeholder syntax, BIGSERIAL, DOUBLE PRECISION).

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::{PositionRecord, PositionRow, StoreError, TripRecord};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS trips (
        trip_id TEXT PRIMARY KEY,
        route_id TEXT NOT NULL,
        start_time TEXT,
        direction_id BIGINT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS positions (
        id BIGSERIAL PRIMARY KEY,
        trip_id TEXT NOT NULL REFERENCES trips(trip_id),
        timestamp DOUBLE PRECISION NOT NULL,
        stop_id TEXT NOT NULL,
        distance DOUBLE PRECISION NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_positions_timestamp ON positions(timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_positions_trip_id ON positions(trip_id)",
];

/// PostgreSQL-backed store.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().connect(url).await?;
        Ok(Self { pool })
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
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (trip_id) DO NOTHING",
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
                 VALUES ($1, $2, $3, $4)",
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
        let result = sqlx::query("DELETE FROM positions WHERE timestamp < $1")
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
             WHERE t.route_id = $1 AND p.timestamp > $2
             ORDER BY p.timestamp ASC",
        )
        .bind(route_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
