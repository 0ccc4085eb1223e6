//! Application state for the API server

use crate::AudioFetcher;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The pipeline service handling every request
    pub fetcher: Arc<AudioFetcher>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(fetcher: Arc<AudioFetcher>) -> Self {
        Self { fetcher }
    }
}
