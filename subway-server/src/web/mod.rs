//! HTTP serving layer.
//!
//! A thin JSON API over the topology snapshot and the history assembler,
//! plus static file hosting for the frontend. All queries here are
//! read-only; the ingestion task is the sole writer.

mod dto;
mod routes;
mod state;

pub use dto::{StationDto, TerminalsDto};
pub use routes::create_router;
pub use state::AppState;
