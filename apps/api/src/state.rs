use std::sync::Arc;

use crate::matching::MatchService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub matcher: Arc<MatchService>,
}

impl AppState {
    pub fn new(matcher: MatchService) -> Self {
        Self {
            matcher: Arc::new(matcher),
        }
    }
}
