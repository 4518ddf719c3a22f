use std::sync::Arc;

use cronica_tracker::Tracker;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Tracker>,
}

impl AppState {
    pub fn new(tracker: Tracker) -> Self {
        Self {
            tracker: Arc::new(tracker),
        }
    }
}
