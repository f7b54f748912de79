//! HTTP route handlers.

use std::path::Path;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::services::ServeDir;

use crate::history::TripTrajectory;
use crate::ingest::unix_now;
use crate::store::StoreError;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
///
/// When `static_dir` exists it is served as the fallback, so the frontend
/// bundle lives at `/`.
pub fn create_router(state: AppState, static_dir: &Path) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/api/stations", get(stations))
        .route("/api/terminals", get(terminals))
        .route("/api/history", get(history));

    let router = if static_dir.is_dir() {
        router.fallback_service(ServeDir::new(static_dir))
    } else {
        router
    };

    router.with_state(state)
}

/// Errors surfaced to API clients.
#[derive(Debug)]
enum AppError {
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": message })),
            )
                .into_response(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Ordered stations of a route.
///
/// An unknown route yields an empty list, not an error.
async fn stations(
    State(state): State<AppState>,
    Query(query): Query<StationsQuery>,
) -> Json<Vec<StationDto>> {
    let snapshot = state.topology.snapshot().await;
    let stations = snapshot
        .route(&query.line)
        .map(|topo| topo.stations().iter().map(StationDto::from_station).collect())
        .unwrap_or_default();
    Json(stations)
}

/// The terminal stations of a route, or `null` when the route has no
/// topology.
async fn terminals(
    State(state): State<AppState>,
    Query(query): Query<StationsQuery>,
) -> Json<Option<TerminalsDto>> {
    let snapshot = state.topology.snapshot().await;
    let terminals = snapshot
        .route(&query.line)
        .and_then(|topo| topo.terminals())
        .map(|(first, last)| TerminalsDto {
            first: StationDto::from_station(first),
            last: StationDto::from_station(last),
        });
    Json(terminals)
}

/// Smoothed trip trajectories for a route within the lookback window.
async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<TripTrajectory>>, AppError> {
    let snapshot = state.topology.snapshot().await;
    let trajectories = state
        .history
        .assemble(
            &state.store,
            &snapshot,
            &query.line,
            query.window_mins,
            unix_now(),
        )
        .await?;
    Ok(Json(trajectories))
}
