//! Shared application state.

use std::sync::Arc;

use dashmap::DashMap;
use domain::Cart;
use event_store::EventStore;
use lifecycle::LifecycleCoordinator;

/// State shared by every handler.
pub struct AppState<S: EventStore> {
    pub coordinator: Arc<LifecycleCoordinator<S>>,
    /// Open carts keyed by client session id.
    pub carts: DashMap<String, Cart>,
    /// Default for on-demand delay scans.
    pub delay_threshold_minutes: u32,
}

impl<S: EventStore> AppState<S> {
    pub fn new(coordinator: Arc<LifecycleCoordinator<S>>, delay_threshold_minutes: u32) -> Self {
        Self {
            coordinator,
            carts: DashMap::new(),
            delay_threshold_minutes,
        }
    }
}
