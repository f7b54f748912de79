//! Application state for the web layer.

use std::sync::Arc;

use crate::history::HistoryAssembler;
use crate::store::Store;
use crate::topology::TopologyCache;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend (read-only from this layer).
    pub store: Store,

    /// Current topology snapshot handle.
    pub topology: TopologyCache,

    /// History assembly with its smoothing configuration.
    pub history: Arc<HistoryAssembler>,
}

impl AppState {
    pub fn new(store: Store, topology: TopologyCache, history: HistoryAssembler) -> Self {
        Self {
            store,
            topology,
            history: Arc::new(history),
        }
    }
}
