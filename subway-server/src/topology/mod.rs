//! Route topologies: ordered station→distance mappings.
//!
//! A topology assigns every station on a route a normalized relative
//! distance in [0, 200]. Distances are topological, not metric: they say
//! where a station sits along its route, not how far apart stations are in
//! the real world, and they are not comparable across routes.
//!
//! Topologies are built once from the static schedule and held as an
//! immutable snapshot. A reload replaces the whole snapshot; nothing is
//! ever partially mutated.

mod builder;
pub mod gtfs;

pub use builder::{StaticTables, StaticTrip, StopTimeEntry, build_snapshot, candidate_trip_ids};
pub use gtfs::TopologyError;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::base_stop_id;

/// A station on a route, with its normalized position along that route.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub stop_id: String,
    pub name: String,
    /// Normalized distance along the route, in [0, 200].
    pub distance: f64,
}

/// The ordered station→distance mapping for one route.
#[derive(Debug, Clone, Default)]
pub struct RouteTopology {
    /// Stations in ascending distance order.
    stations: Vec<Station>,
    /// Distance lookup keyed by (suffix-stripped) stop id.
    distances: HashMap<String, f64>,
}

impl RouteTopology {
    pub(crate) fn new(stations: Vec<Station>) -> Self {
        let distances = stations
            .iter()
            .map(|s| (s.stop_id.clone(), s.distance))
            .collect();
        Self {
            stations,
            distances,
        }
    }

    /// Stations in ascending distance order.
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// Look up a stop's distance along this route.
    ///
    /// Tries the exact stop id first, then falls back to the
    /// platform-suffix-stripped base id. `None` means the stop is not part
    /// of this route's topology; that is an expected outcome, not an error.
    pub fn distance_for(&self, stop_id: &str) -> Option<f64> {
        self.distances
            .get(stop_id)
            .or_else(|| self.distances.get(base_stop_id(stop_id)))
            .copied()
    }

    /// The stations at minimum and maximum distance.
    ///
    /// Returns `None` for an empty topology. For a one-station topology
    /// both terminals are that station.
    pub fn terminals(&self) -> Option<(&Station, &Station)> {
        let first = self.stations.first()?;
        let last = self.stations.last()?;
        Some((first, last))
    }
}

/// An immutable set of route topologies.
#[derive(Debug, Clone, Default)]
pub struct TopologySnapshot {
    routes: HashMap<String, RouteTopology>,
}

impl TopologySnapshot {
    /// A snapshot with no routes. Every lookup returns "not found".
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(routes: HashMap<String, RouteTopology>) -> Self {
        Self { routes }
    }

    /// The topology for a route, if one was built.
    pub fn route(&self, route_id: &str) -> Option<&RouteTopology> {
        self.routes.get(route_id)
    }

    /// Distance of a stop along a route. `None` when the route has no
    /// topology or the stop is absent from it.
    pub fn distance_for(&self, route_id: &str, stop_id: &str) -> Option<f64> {
        self.routes.get(route_id)?.distance_for(stop_id)
    }

    /// Number of routes with a topology.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Total stations across all routes.
    pub fn station_count(&self) -> usize {
        self.routes.values().map(|r| r.stations.len()).sum()
    }
}

/// Shared handle to the current topology snapshot.
///
/// Ingestion and serving each hold a clone of this handle. A reload swaps
/// in a complete new snapshot; readers that already fetched the old `Arc`
/// keep a consistent view until they next call [`TopologyCache::snapshot`].
#[derive(Clone)]
pub struct TopologyCache {
    inner: Arc<RwLock<Arc<TopologySnapshot>>>,
}

impl TopologyCache {
    pub fn new(snapshot: TopologySnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// A cache holding an empty snapshot (degraded mode: static schedule
    /// unavailable at startup).
    pub fn empty() -> Self {
        Self::new(TopologySnapshot::empty())
    }

    /// The current snapshot.
    pub async fn snapshot(&self) -> Arc<TopologySnapshot> {
        let guard = self.inner.read().await;
        Arc::clone(&guard)
    }

    /// Atomically replace the snapshot.
    pub async fn replace(&self, snapshot: TopologySnapshot) {
        let mut guard = self.inner.write().await;
        *guard = Arc::new(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(stop_id: &str, distance: f64) -> Station {
        Station {
            stop_id: stop_id.to_string(),
            name: format!("Station {stop_id}"),
            distance,
        }
    }

    #[test]
    fn distance_lookup_exact_and_stripped() {
        let topo = RouteTopology::new(vec![station("R17", 0.0), station("R20", 200.0)]);

        assert_eq!(topo.distance_for("R17"), Some(0.0));
        // Platform id falls back to the base station.
        assert_eq!(topo.distance_for("R17N"), Some(0.0));
        assert_eq!(topo.distance_for("R17S"), Some(0.0));
        assert_eq!(topo.distance_for("Z99"), None);
    }

    #[test]
    fn terminals_are_min_and_max() {
        let topo = RouteTopology::new(vec![
            station("A01", 0.0),
            station("A02", 100.0),
            station("A03", 200.0),
        ]);

        let (first, last) = topo.terminals().unwrap();
        assert_eq!(first.stop_id, "A01");
        assert_eq!(last.stop_id, "A03");
    }

    #[test]
    fn empty_topology_has_no_terminals() {
        let topo = RouteTopology::default();
        assert!(topo.terminals().is_none());
    }

    #[test]
    fn single_station_is_both_terminals() {
        let topo = RouteTopology::new(vec![station("A01", 0.0)]);
        let (first, last) = topo.terminals().unwrap();
        assert_eq!(first.stop_id, "A01");
        assert_eq!(last.stop_id, "A01");
    }

    #[test]
    fn snapshot_scopes_lookups_by_route() {
        let mut routes = HashMap::new();
        routes.insert(
            "Q".to_string(),
            RouteTopology::new(vec![station("R17", 50.0)]),
        );
        routes.insert(
            "N".to_string(),
            RouteTopology::new(vec![station("R17", 120.0)]),
        );
        let snapshot = TopologySnapshot::new(routes);

        // The same physical station sits at different relative positions on
        // different routes.
        assert_eq!(snapshot.distance_for("Q", "R17"), Some(50.0));
        assert_eq!(snapshot.distance_for("N", "R17"), Some(120.0));
        assert_eq!(snapshot.distance_for("L", "R17"), None);
    }

    #[tokio::test]
    async fn cache_replace_swaps_wholesale() {
        let cache = TopologyCache::empty();
        assert_eq!(cache.snapshot().await.route_count(), 0);

        let mut routes = HashMap::new();
        routes.insert(
            "Q".to_string(),
            RouteTopology::new(vec![station("Q01", 0.0)]),
        );
        cache.replace(TopologySnapshot::new(routes)).await;

        let snap = cache.snapshot().await;
        assert_eq!(snap.route_count(), 1);
        assert!(snap.route("Q").is_some());
    }
}
