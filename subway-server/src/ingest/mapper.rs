//! Maps decoded feed entities to trip rows and position samples.
//!
//! Each feed message is processed in two passes: trip updates first (so
//! trip metadata exists before positions reference it), then vehicle
//! positions. Writes are flushed in bounded batches rather than one
//! transaction per message. Entity-level problems are logged with a
//! per-message cap and skipped; they never abort the batch.

use gtfs_rt::{FeedMessage, TripDescriptor, VehiclePosition};
use tracing::warn;

use crate::domain::Direction;
use crate::store::{PositionRecord, Store, StoreError, TripRecord};
use crate::topology::TopologySnapshot;

/// Entities per write batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// How many per-entity warnings to emit per feed message before
/// suppressing the rest.
const ENTITY_ERROR_LOG_CAP: u32 = 5;

/// Counters for one processed feed message.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    /// Trip rows sent to the store (inserted or already present).
    pub trips: usize,
    /// Position samples written.
    pub positions: usize,
    /// Entities skipped for missing/malformed fields.
    pub skipped: usize,
    /// Vehicle observations dropped because the stop is not in the route's
    /// topology. Expected, not an error.
    pub unmapped: usize,
}

/// Outcome of mapping one vehicle observation.
enum SampleOutcome {
    Mapped(PositionRecord),
    /// The vehicle carried no stop id; nothing to record.
    NoStop,
    /// The stop is outside the route's topology; dropped silently.
    Unmapped,
}

/// Caps repeated per-entity warnings within one feed message.
struct EntityErrorLog {
    count: u32,
}

impl EntityErrorLog {
    fn new() -> Self {
        Self { count: 0 }
    }

    fn note(&mut self, entity_id: &str, reason: &str) {
        self.count += 1;
        if self.count <= ENTITY_ERROR_LOG_CAP {
            warn!(entity = entity_id, "skipping entity: {reason}");
        }
    }

    fn suppressed(&self) -> u32 {
        self.count.saturating_sub(ENTITY_ERROR_LOG_CAP)
    }
}

/// Maps one feed message's entities to storage writes.
pub struct PositionMapper<'a> {
    store: &'a Store,
    topology: &'a TopologySnapshot,
    batch_size: usize,
}

impl<'a> PositionMapper<'a> {
    pub fn new(store: &'a Store, topology: &'a TopologySnapshot) -> Self {
        Self {
            store,
            topology,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    #[cfg(test)]
    fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Process a decoded feed message.
    ///
    /// `now` is the current Unix time in seconds; observation timestamps
    /// ahead of it are clamped down to defend against upstream clock skew.
    ///
    /// Returns `Err` only for storage failures; the caller abandons the
    /// rest of the cycle and relies on the next one to retry.
    pub async fn process(&self, feed: &FeedMessage, now: f64) -> Result<FeedStats, StoreError> {
        let mut stats = FeedStats::default();
        let mut errors = EntityErrorLog::new();
        let mut trips: Vec<TripRecord> = Vec::new();
        let mut positions: Vec<PositionRecord> = Vec::new();

        // Pass 1: trip updates.
        let mut processed = 0usize;
        for entity in &feed.entity {
            let Some(update) = &entity.trip_update else {
                continue;
            };
            processed += 1;
            match trip_record(&update.trip) {
                Some(record) => trips.push(record),
                None => {
                    stats.skipped += 1;
                    errors.note(&entity.id, "trip update missing trip or route id");
                }
            }
            if processed % self.batch_size == 0 {
                self.flush(&mut trips, &mut positions, &mut stats).await?;
            }
        }
        self.flush(&mut trips, &mut positions, &mut stats).await?;

        // Pass 2: vehicle positions.
        processed = 0;
        for entity in &feed.entity {
            let Some(vehicle) = &entity.vehicle else {
                continue;
            };
            processed += 1;

            let Some(trip) = &vehicle.trip else {
                stats.skipped += 1;
                errors.note(&entity.id, "vehicle position without trip descriptor");
                continue;
            };
            let Some(record) = trip_record(trip) else {
                stats.skipped += 1;
                errors.note(&entity.id, "vehicle trip missing trip or route id");
                continue;
            };

            match vehicle_sample(vehicle, &record, self.topology, now) {
                SampleOutcome::Mapped(sample) => {
                    trips.push(record);
                    positions.push(sample);
                }
                SampleOutcome::NoStop => {
                    trips.push(record);
                }
                SampleOutcome::Unmapped => {
                    trips.push(record);
                    stats.unmapped += 1;
                }
            }

            if processed % self.batch_size == 0 {
                self.flush(&mut trips, &mut positions, &mut stats).await?;
            }
        }
        self.flush(&mut trips, &mut positions, &mut stats).await?;

        if errors.suppressed() > 0 {
            warn!(
                "suppressed {} further entity warnings this message",
                errors.suppressed()
            );
        }

        Ok(stats)
    }

    /// Write the pending trip and position buffers in bounded
    /// transactions. Trips go first so samples never reference a trip the
    /// store has not seen.
    async fn flush(
        &self,
        trips: &mut Vec<TripRecord>,
        positions: &mut Vec<PositionRecord>,
        stats: &mut FeedStats,
    ) -> Result<(), StoreError> {
        if !trips.is_empty() {
            self.store.upsert_trips(trips).await?;
            stats.trips += trips.len();
            trips.clear();
        }
        if !positions.is_empty() {
            self.store.append_positions(positions).await?;
            stats.positions += positions.len();
            positions.clear();
        }
        Ok(())
    }
}

/// Build a trip row from a feed trip descriptor.
///
/// Returns `None` when the descriptor lacks a trip or route id; such
/// entities are skipped. Direction falls back to trip-id marker inference
/// when the explicit field is absent.
fn trip_record(trip: &TripDescriptor) -> Option<TripRecord> {
    let trip_id = trip.trip_id.clone().filter(|id| !id.is_empty())?;
    let route_id = trip.route_id.clone().filter(|id| !id.is_empty())?;
    let direction = Direction::infer(trip.direction_id, &trip_id);

    Some(TripRecord {
        trip_id,
        route_id,
        start_time: trip.start_time.clone(),
        direction_id: direction.as_id(),
    })
}

/// Map one vehicle observation to a position sample.
fn vehicle_sample(
    vehicle: &VehiclePosition,
    trip: &TripRecord,
    topology: &TopologySnapshot,
    now: f64,
) -> SampleOutcome {
    let Some(stop_id) = vehicle.stop_id.as_deref().filter(|s| !s.is_empty()) else {
        return SampleOutcome::NoStop;
    };

    let Some(distance) = topology.distance_for(&trip.route_id, stop_id) else {
        return SampleOutcome::Unmapped;
    };

    // Clamp observations from the future down to now; some upstream
    // clocks run ahead.
    let timestamp = vehicle.timestamp.map(|t| t as f64).unwrap_or(now).min(now);

    SampleOutcome::Mapped(PositionRecord {
        trip_id: trip.trip_id.clone(),
        timestamp,
        stop_id: stop_id.to_string(),
        distance,
    })
}
