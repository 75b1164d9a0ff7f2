use std::sync::Arc;

use stargazer_core::StatusSource;

/// Shared state for the status server.
#[derive(Clone)]
pub struct AppState {
    pub status: Arc<dyn StatusSource>,
}

impl AppState {
    pub fn new(status: Arc<dyn StatusSource>) -> Self {
        Self { status }
    }
}
