//! Builds route topologies from the static schedule tables.
//!
//! For each route we pick a representative trip (the one calling at the
//! most stops, so locals beat short-turns and expresses), lay its stations
//! out at a fixed spacing, and rescale so every route spans [0, 200].
//! Each route is normalized independently; a single shared station→distance
//! map is wrong because the same station sits at different relative
//! positions on different routes.

use std::collections::{HashMap, HashSet};

use super::{RouteTopology, Station, TopologySnapshot};
use crate::domain::base_stop_id;

/// Cap on candidate trips examined per route. Bounds the stop-times scan
/// on large static datasets.
const MAX_CANDIDATE_TRIPS: usize = 100;

/// Raw spacing between consecutive stations before normalization.
const DISTANCE_STEP: f64 = 2.0;

/// Every route's distances are rescaled to span [0, DISTANCE_SPAN].
const DISTANCE_SPAN: f64 = 200.0;

/// One row of the static trips table, in file order.
#[derive(Debug, Clone)]
pub struct StaticTrip {
    pub trip_id: String,
    pub route_id: String,
    pub direction_id: Option<u32>,
}

/// One stop-time entry for a trip.
#[derive(Debug, Clone)]
pub struct StopTimeEntry {
    pub sequence: u32,
    pub stop_id: String,
}

/// The three static schedule tables the builder consumes.
#[derive(Debug, Default)]
pub struct StaticTables {
    /// stop_id → station name.
    pub stop_names: HashMap<String, String>,
    /// Trips in file order.
    pub trips: Vec<StaticTrip>,
    /// trip_id → stop-time entries (unordered).
    pub stop_times: HashMap<String, Vec<StopTimeEntry>>,
}

/// The trip ids whose stop-times the builder will actually look at:
/// the first [`MAX_CANDIDATE_TRIPS`] per route, in trips-table order.
///
/// The static loader uses this to avoid retaining stop-time rows for the
/// vast majority of trips.
pub fn candidate_trip_ids(trips: &[StaticTrip]) -> HashSet<String> {
    let mut per_route: HashMap<&str, usize> = HashMap::new();
    let mut ids = HashSet::new();
    for trip in trips {
        let count = per_route.entry(trip.route_id.as_str()).or_insert(0);
        if *count < MAX_CANDIDATE_TRIPS {
            *count += 1;
            ids.insert(trip.trip_id.clone());
        }
    }
    ids
}

/// Build a topology snapshot covering every route in the trips table.
pub fn build_snapshot(tables: &StaticTables) -> TopologySnapshot {
    let mut route_order: Vec<&str> = Vec::new();
    let mut candidates: HashMap<&str, Vec<&StaticTrip>> = HashMap::new();
    for trip in &tables.trips {
        let entry = candidates.entry(trip.route_id.as_str()).or_insert_with(|| {
            route_order.push(trip.route_id.as_str());
            Vec::new()
        });
        if entry.len() < MAX_CANDIDATE_TRIPS {
            entry.push(trip);
        }
    }

    let mut routes = HashMap::new();
    for route_id in route_order {
        let sequence = representative_sequence(&candidates[route_id], &tables.stop_times);
        if sequence.is_empty() {
            continue;
        }
        routes.insert(
            route_id.to_string(),
            assign_distances(&sequence, &tables.stop_names),
        );
    }

    TopologySnapshot::new(routes)
}

/// Reconstruct each candidate's stop sequence, canonicalize its direction,
/// and return the longest one (first encountered wins ties).
fn representative_sequence(
    candidates: &[&StaticTrip],
    stop_times: &HashMap<String, Vec<StopTimeEntry>>,
) -> Vec<String> {
    let mut best: Vec<String> = Vec::new();
    for trip in candidates {
        let Some(entries) = stop_times.get(&trip.trip_id) else {
            continue;
        };
        let mut ordered: Vec<&StopTimeEntry> = entries.iter().collect();
        ordered.sort_by_key(|e| e.sequence);
        let mut stops: Vec<String> = ordered.iter().map(|e| e.stop_id.clone()).collect();

        // Canonical orientation is southbound (direction 1); reverse
        // northbound trips so all candidates run the same way.
        if trip.direction_id.unwrap_or(0) == 0 {
            stops.reverse();
        }

        if stops.len() > best.len() {
            best = stops;
        }
    }
    best
}

/// Assign fixed-step distances along the representative sequence and
/// normalize to [0, DISTANCE_SPAN].
fn assign_distances(sequence: &[String], stop_names: &HashMap<String, String>) -> RouteTopology {
    let mut raw: HashMap<&str, f64> = HashMap::new();
    for (i, stop_id) in sequence.iter().enumerate() {
        // Alignment works on base station ids, not platform ids.
        raw.insert(base_stop_id(stop_id), i as f64 * DISTANCE_STEP);
    }

    let min = raw.values().cloned().fold(f64::INFINITY, f64::min);
    let max = raw.values().cloned().fold(f64::NEG_INFINITY, f64::max);
    // A one-station sequence has zero range; treating it as 1 collapses the
    // sole station to distance 0 instead of dividing by zero.
    let range = if max > min { max - min } else { 1.0 };

    let mut stations: Vec<Station> = raw
        .into_iter()
        .map(|(stop_id, dist)| Station {
            stop_id: stop_id.to_string(),
            name: stop_names
                .get(stop_id)
                .cloned()
                .unwrap_or_else(|| format!("Unknown {stop_id}")),
            distance: (dist - min) / range * DISTANCE_SPAN,
        })
        .collect();
    stations.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    RouteTopology::new(stations)
}
