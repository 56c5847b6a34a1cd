pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::inference::InferenceService;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InferenceService>,
}

impl AppState {
    pub fn new(service: Arc<InferenceService>) -> Self {
        Self { service }
    }
}
