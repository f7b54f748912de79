//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::topology::Station;

/// Query parameters for `/api/stations`.
#[derive(Debug, Deserialize)]
pub struct StationsQuery {
    /// Route id to list stations for.
    pub line: String,
}

/// Query parameters for `/api/history`.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Route id to assemble trajectories for.
    pub line: String,

    /// Lookback window in minutes (defaults to the configured window).
    pub window_mins: Option<i64>,
}

/// A station as served to the frontend.
#[derive(Debug, Serialize)]
pub struct StationDto {
    pub id: String,
    pub name: String,
    /// Normalized distance, rounded to one decimal for display.
    pub dist: f64,
}

impl StationDto {
    pub fn from_station(station: &Station) -> Self {
        Self {
            id: station.stop_id.clone(),
            name: station.name.clone(),
            dist: (station.distance * 10.0).round() / 10.0,
        }
    }
}

/// The two terminal stations of a route.
#[derive(Debug, Serialize)]
pub struct TerminalsDto {
    pub first: StationDto,
    pub last: StationDto,
}
