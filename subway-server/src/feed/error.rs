//! Feed client error types.

/// Errors from the GTFS-RT feed client.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// HTTP request failed (network error, timeout, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint rejected the request outright. Distinct from a generic
    /// failure because it usually means a credential problem, not an outage.
    #[error("access forbidden (403) for {url}: check feed API credentials")]
    Forbidden { url: String },

    /// Any other non-success status.
    #[error("feed returned status {status} for {url}")]
    Status { status: u16, url: String },

    /// Protobuf decode failed.
    #[error("failed to decode feed message: {0}")]
    Decode(#[from] prost::DecodeError),
}
