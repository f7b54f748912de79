use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use subway_server::config::AppConfig;
use subway_server::feed::{FeedClient, FeedConfig};
use subway_server::history::{HistoryAssembler, HistoryConfig};
use subway_server::ingest::Poller;
use subway_server::store::Store;
use subway_server::topology::{TopologyCache, build_snapshot, gtfs};
use subway_server::web::{AppState, create_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();

    // Storage must be reachable at startup; nothing else is fatal.
    let store = Store::connect(&config.database_url)
        .await
        .expect("failed to connect to database");
    store
        .init_schema()
        .await
        .expect("failed to initialize database schema");

    // Build the topology snapshot. If the static schedule is missing we
    // degrade to metadata-only recording rather than refusing to start.
    let topology = match gtfs::load_tables(&config.gtfs_dir) {
        Ok(tables) => {
            let snapshot = build_snapshot(&tables);
            info!(
                routes = snapshot.route_count(),
                stations = snapshot.station_count(),
                "built route topologies"
            );
            TopologyCache::new(snapshot)
        }
        Err(e) => {
            warn!("static schedule unavailable, distance mapping disabled: {e}");
            TopologyCache::empty()
        }
    };

    if config.disable_poller {
        info!("poller disabled, serving existing data only");
    } else {
        let client = FeedClient::new(FeedConfig::default()).expect("failed to create feed client");
        let poller = Poller::new(
            client,
            store.clone(),
            topology.clone(),
            config.feed_urls.clone(),
            config.poll_interval,
        );
        tokio::spawn(poller.run());
    }

    let state = AppState::new(
        store,
        topology,
        HistoryAssembler::new(HistoryConfig::default()),
    );
    let app = create_router(state, &config.static_dir);

    info!("listening on http://{}", config.bind_addr);
    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind {}: {e}", config.bind_addr);
            std::process::exit(1);
        }
    };
    axum::serve(listener, app).await.expect("server error");
}
