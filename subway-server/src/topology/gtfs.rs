//! Loads the static GTFS tables the topology builder consumes.
//!
//! Only three files are read: `stops.txt`, `trips.txt` and
//! `stop_times.txt`. Stop-time rows are filtered down to the builder's
//! candidate trips while streaming, since the full table is by far the
//! largest static file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::builder::{StaticTables, StaticTrip, StopTimeEntry, candidate_trip_ids};

/// Errors loading the static schedule.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("GTFS directory not found: {0}")]
    MissingDir(PathBuf),

    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: csv::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        source: csv::Error,
    },
}

#[derive(Debug, Deserialize)]
struct StopRecord {
    stop_id: String,
    stop_name: String,
}

#[derive(Debug, Deserialize)]
struct TripRecord {
    trip_id: String,
    route_id: String,
    direction_id: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct StopTimeRecord {
    trip_id: String,
    stop_id: String,
    stop_sequence: u32,
}

/// Load the static tables from a GTFS directory.
pub fn load_tables(dir: &Path) -> Result<StaticTables, TopologyError> {
    if !dir.is_dir() {
        return Err(TopologyError::MissingDir(dir.to_path_buf()));
    }

    let stop_names = load_stops(&dir.join("stops.txt"))?;
    let trips = load_trips(&dir.join("trips.txt"))?;
    let candidates = candidate_trip_ids(&trips);
    let stop_times = load_stop_times(&dir.join("stop_times.txt"), &candidates)?;

    Ok(StaticTables {
        stop_names,
        trips,
        stop_times,
    })
}

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>, TopologyError> {
    csv::Reader::from_path(path).map_err(|source| TopologyError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn load_stops(path: &Path) -> Result<HashMap<String, String>, TopologyError> {
    let mut stops = HashMap::new();
    for record in reader(path)?.deserialize() {
        let record: StopRecord = record.map_err(|source| TopologyError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        stops.insert(record.stop_id, record.stop_name);
    }
    Ok(stops)
}

fn load_trips(path: &Path) -> Result<Vec<StaticTrip>, TopologyError> {
    let mut trips = Vec::new();
    for record in reader(path)?.deserialize() {
        let record: TripRecord = record.map_err(|source| TopologyError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        trips.push(StaticTrip {
            trip_id: record.trip_id,
            route_id: record.route_id,
            direction_id: record.direction_id,
        });
    }
    Ok(trips)
}

fn load_stop_times(
    path: &Path,
    candidates: &std::collections::HashSet<String>,
) -> Result<HashMap<String, Vec<StopTimeEntry>>, TopologyError> {
    let mut stop_times: HashMap<String, Vec<StopTimeEntry>> = HashMap::new();
    for record in reader(path)?.deserialize() {
        let record: StopTimeRecord = record.map_err(|source| TopologyError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        if !candidates.contains(&record.trip_id) {
            continue;
        }
        stop_times
            .entry(record.trip_id)
            .or_default()
            .push(StopTimeEntry {
                sequence: record.stop_sequence,
                stop_id: record.stop_id,
            });
    }
    Ok(stop_times)
}
