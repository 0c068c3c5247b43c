use std::sync::Arc;

use audiograb::Pipeline;

use crate::auth::AuthGate;

/// Shared, immutable application state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub auth: AuthGate,
}

impl AppState {
    pub fn new(pipeline: Pipeline, auth: AuthGate) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            auth,
        }
    }
}
