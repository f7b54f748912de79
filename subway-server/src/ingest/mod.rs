//! Background ingestion of real-time feeds.
//!
//! The poller runs as its own tokio task so request serving is never
//! coupled to upstream feed latency. Each cycle fetches every configured
//! endpoint, maps the decoded entities to storage writes, and finally
//! prunes samples older than the retention horizon. The task is safe to
//! cancel at any point: trip upserts are repeatable and the next cycle
//! resupplies any missed positions.

mod mapper;

pub use mapper::{DEFAULT_BATCH_SIZE, FeedStats, PositionMapper};

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::feed::{FeedClient, FeedError};
use crate::store::Store;
use crate::topology::TopologyCache;

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Samples older than this are pruned after each cycle.
const RETENTION_SECS: f64 = 24.0 * 60.0 * 60.0;

/// The background feed poller.
pub struct Poller {
    client: FeedClient,
    store: Store,
    topology: TopologyCache,
    endpoints: Vec<String>,
    interval: Duration,
}

impl Poller {
    pub fn new(
        client: FeedClient,
        store: Store,
        topology: TopologyCache,
        endpoints: Vec<String>,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            store,
            topology,
            endpoints,
            interval,
        }
    }

    /// Run the poll loop forever. The first cycle starts immediately.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.interval);
        loop {
            interval.tick().await;
            self.cycle().await;
        }
    }

    /// One poll cycle: fetch each endpoint, map, then prune.
    async fn cycle(&self) {
        let topology = self.topology.snapshot().await;
        let now = unix_now();
        let mapper = PositionMapper::new(&self.store, &topology);

        for url in &self.endpoints {
            let feed = match self.client.fetch(url).await {
                Ok(feed) => feed,
                Err(e @ FeedError::Forbidden { .. }) => {
                    // Credential problem, not an outage; worth a louder log.
                    error!(%url, "{e}");
                    continue;
                }
                Err(e) => {
                    warn!(%url, "feed fetch failed, skipping endpoint this cycle: {e}");
                    continue;
                }
            };

            match mapper.process(&feed, now).await {
                Ok(stats) => {
                    debug!(
                        %url,
                        entities = feed.entity.len(),
                        trips = stats.trips,
                        positions = stats.positions,
                        unmapped = stats.unmapped,
                        skipped = stats.skipped,
                        "processed feed"
                    );
                }
                Err(e) => {
                    // Storage trouble: abandon the rest of the cycle; the
                    // next one retries from scratch.
                    error!("storage write failed, abandoning cycle: {e}");
                    return;
                }
            }
        }

        match self.store.delete_positions_before(now - RETENTION_SECS).await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "pruned expired position samples"),
            Err(e) => warn!("prune failed (will retry next cycle): {e}"),
        }
    }
}

/// Current Unix time in seconds.
pub(crate) fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_is_24_hours() {
        assert_eq!(RETENTION_SECS, 86_400.0);
    }

    #[test]
    fn unix_now_is_sane() {
        let now = unix_now();
        // Well after 2020, well before 2100.
        assert!(now > 1.6e9);
        assert!(now < 4.1e9);
    }
}
