//! Environment-driven application configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// The upstream feed endpoints, one per route group.
const DEFAULT_FEED_URLS: &[&str] = &[
    // 1, 2, 3, 4, 5, 6, 7, GS
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs",
    // A, C, E, H, FS
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-ace",
    // B, D, F, M
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-bdfm",
    // G
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-g",
    // J, Z
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-jz",
    // N, Q, R, W
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-nqrw",
    // L
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-l",
];

/// Application configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the static GTFS export.
    pub gtfs_dir: PathBuf,

    /// Database URL; the scheme selects the backend.
    pub database_url: String,

    /// Upstream feed endpoints to poll.
    pub feed_urls: Vec<String>,

    /// Polling interval for the ingestion task.
    pub poll_interval: Duration,

    /// Run the serving surface without the background poller.
    pub disable_poller: bool,

    /// Address to bind the HTTP server on.
    pub bind_addr: SocketAddr,

    /// Directory of static frontend assets.
    pub static_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gtfs_dir: PathBuf::from("gtfs_subway"),
            database_url: "sqlite:subway.db".to_string(),
            feed_urls: DEFAULT_FEED_URLS.iter().map(|s| s.to_string()).collect(),
            poll_interval: Duration::from_secs(10),
            disable_poller: false,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            static_dir: PathBuf::from("static"),
        }
    }
}

impl AppConfig {
    /// Read configuration from the environment, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            gtfs_dir: std::env::var("GTFS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.gtfs_dir),
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            feed_urls: std::env::var("FEED_URLS")
                .map(|s| parse_feed_urls(&s))
                .unwrap_or(defaults.feed_urls),
            poll_interval: std::env::var("POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            disable_poller: std::env::var("DISABLE_POLLER")
                .map(|s| s.eq_ignore_ascii_case("true") || s == "1")
                .unwrap_or(false),
            bind_addr: std::env::var("BIND_ADDR")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.bind_addr),
            static_dir: std::env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
        }
    }
}

/// Parse a comma-separated endpoint list, dropping empty segments.
fn parse_feed_urls(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.gtfs_dir, PathBuf::from("gtfs_subway"));
        assert_eq!(config.database_url, "sqlite:subway.db");
        assert_eq!(config.feed_urls.len(), 7);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert!(!config.disable_poller);
    }

    #[test]
    fn feed_url_parsing() {
        let urls = parse_feed_urls("http://a/feed, http://b/feed ,,http://c/feed");
        assert_eq!(urls, vec!["http://a/feed", "http://b/feed", "http://c/feed"]);
    }

    #[test]
    fn feed_url_parsing_empty() {
        assert!(parse_feed_urls("").is_empty());
        assert!(parse_feed_urls(" , ").is_empty());
    }
}
