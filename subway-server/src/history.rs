//! Assembles smoothed per-trip trajectories for display.
//!
//! A train that has finished its run keeps reporting the same terminal
//! stop for as long as it sits there, which draws a long flat tail on the
//! chart. Smoothing collapses those terminal dwells down to their final
//! sample. Dwells anywhere else — a train held mid-route is a real delay —
//! are kept in full.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::domain::base_stop_id;
use crate::store::{PositionRow, Store, StoreError};
use crate::topology::TopologySnapshot;

/// Configuration for history assembly.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Lookback window in minutes.
    pub lookback_mins: i64,

    /// Consecutive samples whose distances differ by less than this are
    /// part of the same dwell.
    pub dwell_tolerance: f64,

    /// Dwells longer than this (seconds) at a terminal are collapsed.
    pub dwell_threshold_secs: f64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            lookback_mins: 60,
            dwell_tolerance: 0.01,
            dwell_threshold_secs: 180.0,
        }
    }
}

/// One point of a smoothed trajectory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryPoint {
    pub timestamp: f64,
    pub distance: f64,
    pub stop_id: String,
}

/// A trip's smoothed trajectory.
#[derive(Debug, Clone, Serialize)]
pub struct TripTrajectory {
    pub trip_id: String,
    pub route_id: String,
    pub direction_id: i64,
    pub positions: Vec<TrajectoryPoint>,
}

/// Reads persisted samples and serves smoothed trajectories.
#[derive(Debug, Clone)]
pub struct HistoryAssembler {
    config: HistoryConfig,
}

impl HistoryAssembler {
    pub fn new(config: HistoryConfig) -> Self {
        Self { config }
    }

    /// Smoothed trajectories for every trip of `route_id` seen within the
    /// lookback window ending at `now`.
    ///
    /// `lookback_mins` overrides the configured window when given. Trips
    /// whose smoothed sequence has fewer than 2 samples are omitted — a
    /// single point cannot render a trajectory.
    pub async fn assemble(
        &self,
        store: &Store,
        topology: &TopologySnapshot,
        route_id: &str,
        lookback_mins: Option<i64>,
        now: f64,
    ) -> Result<Vec<TripTrajectory>, StoreError> {
        let lookback = lookback_mins.unwrap_or(self.config.lookback_mins);
        let cutoff = now - lookback as f64 * 60.0;
        let rows = store.positions_since(route_id, cutoff).await?;

        let terminals = terminal_ids(topology, route_id);

        // Group by trip, preserving first-seen (= earliest sample) order.
        let mut order: Vec<String> = Vec::new();
        let mut by_trip: HashMap<String, (i64, Vec<TrajectoryPoint>)> = HashMap::new();
        for row in rows {
            let PositionRow {
                trip_id,
                timestamp,
                distance,
                stop_id,
                direction_id,
            } = row;
            let entry = by_trip.entry(trip_id.clone()).or_insert_with(|| {
                order.push(trip_id);
                (direction_id, Vec::new())
            });
            entry.1.push(TrajectoryPoint {
                timestamp,
                distance,
                stop_id,
            });
        }

        let mut trajectories = Vec::new();
        for trip_id in order {
            let (direction_id, points) = by_trip.remove(&trip_id).unwrap();
            let smoothed = collapse_dwells(points, &terminals, &self.config);
            if smoothed.len() < 2 {
                continue;
            }
            trajectories.push(TripTrajectory {
                trip_id,
                route_id: route_id.to_string(),
                direction_id,
                positions: smoothed,
            });
        }

        Ok(trajectories)
    }
}

/// The route's terminal station ids (suffix-stripped), or empty when the
/// route has no topology.
fn terminal_ids(topology: &TopologySnapshot, route_id: &str) -> HashSet<String> {
    topology
        .route(route_id)
        .and_then(|t| t.terminals())
        .map(|(a, b)| {
            HashSet::from([
                base_stop_id(&a.stop_id).to_string(),
                base_stop_id(&b.stop_id).to_string(),
            ])
        })
        .unwrap_or_default()
}

/// Collapse long terminal dwells in a trip's ordered samples.
///
/// Samples are partitioned into maximal runs where consecutive distances
/// differ by less than the tolerance. A run lasting longer than the
/// threshold at a terminal keeps only its final sample; every other run is
/// kept unchanged.
fn collapse_dwells(
    points: Vec<TrajectoryPoint>,
    terminals: &HashSet<String>,
    config: &HistoryConfig,
) -> Vec<TrajectoryPoint> {
    let mut out = Vec::with_capacity(points.len());
    let mut run: Vec<TrajectoryPoint> = Vec::new();

    for point in points {
        let same_dwell = run
            .last()
            .is_some_and(|prev| (point.distance - prev.distance).abs() < config.dwell_tolerance);
        if !same_dwell && !run.is_empty() {
            emit_run(&mut out, std::mem::take(&mut run), terminals, config);
        }
        run.push(point);
    }
    if !run.is_empty() {
        emit_run(&mut out, run, terminals, config);
    }

    out
}

fn emit_run(
    out: &mut Vec<TrajectoryPoint>,
    run: Vec<TrajectoryPoint>,
    terminals: &HashSet<String>,
    config: &HistoryConfig,
) {
    let duration = run.last().unwrap().timestamp - run.first().unwrap().timestamp;
    let at_terminal = run
        .last()
        .is_some_and(|p| terminals.contains(base_stop_id(&p.stop_id)));

    if duration > config.dwell_threshold_secs && at_terminal {
        out.push(run.into_iter().last().unwrap());
    } else {
        out.extend(run);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(timestamp: f64, distance: f64, stop_id: &str) -> TrajectoryPoint {
        TrajectoryPoint {
            timestamp,
            distance,
            stop_id: stop_id.to_string(),
        }
    }

    fn terminals(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn long_terminal_dwell_collapses_to_final_sample() {
        let points = vec![
            point(0.0, 0.0, "A01"),
            point(100.0, 0.0, "A01"),
            point(200.0, 0.0, "A01"),
            point(260.0, 66.7, "B02"),
        ];
        let smoothed = collapse_dwells(points, &terminals(&["A01"]), &HistoryConfig::default());

        assert_eq!(
            smoothed,
            vec![point(200.0, 0.0, "A01"), point(260.0, 66.7, "B02")]
        );
    }

    #[test]
    fn long_dwell_mid_route_is_kept() {
        // A train held at a non-terminal station is a legitimate delay.
        let points = vec![
            point(0.0, 66.7, "B02"),
            point(100.0, 66.7, "B02"),
            point(300.0, 66.7, "B02"),
            point(400.0, 133.3, "C03"),
        ];
        let smoothed = collapse_dwells(
            points.clone(),
            &terminals(&["A01", "D04"]),
            &HistoryConfig::default(),
        );
        assert_eq!(smoothed, points);
    }

    #[test]
    fn short_terminal_dwell_is_kept() {
        let points = vec![
            point(0.0, 0.0, "A01"),
            point(100.0, 0.0, "A01"),
            point(160.0, 66.7, "B02"),
        ];
        let smoothed = collapse_dwells(
            points.clone(),
            &terminals(&["A01"]),
            &HistoryConfig::default(),
        );
        // 100s dwell is under the 180s threshold.
        assert_eq!(smoothed, points);
    }

    #[test]
    fn two_sample_dwell_keeps_final_sample() {
        // (t=0,A,0), (t=200,A,0), (t=260,B,66.7) with A terminal collapses
        // to [(t=200,A,0), (t=260,B,66.7)].
        let points = vec![
            point(0.0, 0.0, "A01"),
            point(200.0, 0.0, "A01"),
            point(260.0, 66.7, "B02"),
        ];
        let smoothed = collapse_dwells(points, &terminals(&["A01"]), &HistoryConfig::default());
        assert_eq!(
            smoothed,
            vec![point(200.0, 0.0, "A01"), point(260.0, 66.7, "B02")]
        );
    }

    #[test]
    fn dwell_matches_on_stripped_platform_id() {
        let points = vec![
            point(0.0, 200.0, "D40S"),
            point(300.0, 200.0, "D40S"),
            point(400.0, 150.0, "D35S"),
        ];
        // Terminal set holds base ids; the platform suffix must not defeat
        // the match.
        let smoothed = collapse_dwells(points, &terminals(&["D40"]), &HistoryConfig::default());
        assert_eq!(smoothed.len(), 2);
        assert_eq!(smoothed[0].timestamp, 300.0);
    }

    #[test]
    fn moving_samples_never_collapse() {
        let points = vec![
            point(0.0, 0.0, "A01"),
            point(100.0, 66.7, "B02"),
            point(200.0, 133.3, "C03"),
            point(300.0, 200.0, "D04"),
        ];
        let smoothed = collapse_dwells(
            points.clone(),
            &terminals(&["A01", "D04"]),
            &HistoryConfig::default(),
        );
        assert_eq!(smoothed, points);
    }

    #[test]
    fn distance_jitter_within_tolerance_is_one_dwell() {
        let points = vec![
            point(0.0, 0.0, "A01"),
            point(150.0, 0.005, "A01"),
            point(300.0, 0.0, "A01"),
            point(400.0, 66.7, "B02"),
        ];
        let smoothed = collapse_dwells(points, &terminals(&["A01"]), &HistoryConfig::default());
        assert_eq!(smoothed.len(), 2);
        assert_eq!(smoothed[0].timestamp, 300.0);
    }

    mod assemble {
        use super::*;
        use crate::store::{PositionRecord, SqliteStore, TripRecord};
        use crate::topology::{StaticTables, StaticTrip, StopTimeEntry, build_snapshot};

        async fn seeded_store() -> Store {
            let store = Store::Sqlite(SqliteStore::in_memory().await.unwrap());
            store
                .upsert_trips(&[
                    TripRecord {
                        trip_id: "t1".into(),
                        route_id: "Q".into(),
                        start_time: None,
                        direction_id: 1,
                    },
                    TripRecord {
                        trip_id: "t2".into(),
                        route_id: "Q".into(),
                        start_time: None,
                        direction_id: 0,
                    },
                ])
                .await
                .unwrap();
            store
        }

        fn q_topology() -> TopologySnapshot {
            let tables = StaticTables {
                stop_names: Default::default(),
                trips: vec![StaticTrip {
                    trip_id: "s1".into(),
                    route_id: "Q".into(),
                    direction_id: Some(1),
                }],
                stop_times: [(
                    "s1".to_string(),
                    vec![
                        StopTimeEntry {
                            sequence: 1,
                            stop_id: "A011".into(),
                        },
                        StopTimeEntry {
                            sequence: 2,
                            stop_id: "B022".into(),
                        },
                        StopTimeEntry {
                            sequence: 3,
                            stop_id: "C033".into(),
                        },
                    ],
                )]
                .into_iter()
                .collect(),
            };
            build_snapshot(&tables)
        }

        fn sample(trip_id: &str, timestamp: f64, stop_id: &str, distance: f64) -> PositionRecord {
            PositionRecord {
                trip_id: trip_id.into(),
                timestamp,
                stop_id: stop_id.into(),
                distance,
            }
        }

        #[tokio::test]
        async fn single_sample_trip_excluded() {
            let store = seeded_store().await;
            store
                .append_positions(&[
                    sample("t1", 100.0, "A011", 0.0),
                    sample("t1", 200.0, "B022", 100.0),
                    sample("t2", 150.0, "A011", 0.0),
                ])
                .await
                .unwrap();

            let assembler = HistoryAssembler::new(HistoryConfig::default());
            let trajectories = assembler
                .assemble(&store, &q_topology(), "Q", None, 1_000.0)
                .await
                .unwrap();

            assert_eq!(trajectories.len(), 1);
            assert_eq!(trajectories[0].trip_id, "t1");
            assert_eq!(trajectories[0].direction_id, 1);
            assert_eq!(trajectories[0].positions.len(), 2);
        }

        #[tokio::test]
        async fn lookback_window_bounds_results() {
            let store = seeded_store().await;
            let now = 10_000.0;
            store
                .append_positions(&[
                    // Way before the window.
                    sample("t1", now - 7_200.0, "A011", 0.0),
                    sample("t1", now - 100.0, "A011", 0.0),
                    sample("t1", now - 50.0, "B022", 100.0),
                ])
                .await
                .unwrap();

            let assembler = HistoryAssembler::new(HistoryConfig::default());
            let trajectories = assembler
                .assemble(&store, &q_topology(), "Q", Some(60), now)
                .await
                .unwrap();

            assert_eq!(trajectories.len(), 1);
            assert_eq!(trajectories[0].positions.len(), 2);
            assert_eq!(trajectories[0].positions[0].timestamp, now - 100.0);
        }

        #[tokio::test]
        async fn terminal_dwell_collapsed_end_to_end() {
            let store = seeded_store().await;
            store
                .append_positions(&[
                    sample("t1", 0.0, "C033S", 200.0),
                    sample("t1", 100.0, "C033S", 200.0),
                    sample("t1", 300.0, "C033S", 200.0),
                ])
                .await
                .unwrap();

            let assembler = HistoryAssembler::new(HistoryConfig::default());
            let trajectories = assembler
                .assemble(&store, &q_topology(), "Q", None, 1_000.0)
                .await
                .unwrap();

            // The dwell collapses to one sample, leaving fewer than 2: the
            // trip disappears from the output entirely.
            assert!(trajectories.is_empty());
        }

        #[tokio::test]
        async fn route_without_topology_skips_collapse() {
            let store = seeded_store().await;
            store
                .append_positions(&[
                    sample("t1", 0.0, "A011", 0.0),
                    sample("t1", 300.0, "A011", 0.0),
                ])
                .await
                .unwrap();

            let assembler = HistoryAssembler::new(HistoryConfig::default());
            let trajectories = assembler
                .assemble(&store, &TopologySnapshot::empty(), "Q", None, 1_000.0)
                .await
                .unwrap();

            // No terminals known, so the long dwell is retained.
            assert_eq!(trajectories.len(), 1);
            assert_eq!(trajectories[0].positions.len(), 2);
        }
    }
}
