//! HTTP API for the gateway

mod auth;
mod handlers;
mod types;

pub use auth::cors_layer;
pub use handlers::create_router;

use crate::registry::ServiceRegistry;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ServiceRegistry>,
    /// Bearer token every non-public route requires. `None` disables auth.
    pub access_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(registry: Arc<ServiceRegistry>, access_token: Option<String>) -> Self {
        Self {
            registry,
            access_token: access_token.map(Arc::from),
        }
    }
}
