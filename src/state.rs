//! Shared application state for the generated routes. The binding table is read-only after startup.

use crate::config::ResolvedResources;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct AppState {
    pub resources: Arc<ResolvedResources>,
}

impl AppState {
    pub fn new(resources: ResolvedResources) -> Self {
        AppState {
            resources: Arc::new(resources),
        }
    }
}
