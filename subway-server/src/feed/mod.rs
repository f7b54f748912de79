//! GTFS-RT feed client.
//!
//! Each upstream endpoint serves a protobuf `FeedMessage` covering a
//! disjoint group of routes. Endpoints are polled independently: a failure
//! on one never affects the others, and there is no in-cycle retry — the
//! next scheduled cycle retries naturally.

mod client;
mod error;

pub use client::{FeedClient, FeedConfig};
pub use error::FeedError;
