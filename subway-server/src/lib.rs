//! Subway position tracker.
//!
//! Polls real-time vehicle feeds for a subway network, maps each stop
//! observation to a normalized position along its route, persists the
//! resulting time series, and serves smoothed per-trip trajectories.

pub mod config;
pub mod domain;
pub mod feed;
pub mod history;
pub mod ingest;
pub mod store;
pub mod topology;
pub mod web;
