//! Application State

use std::sync::Arc;

use cart_checkout::SessionClient;

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Session backend (None if Stripe is not configured)
    pub sessions: Option<Arc<dyn SessionClient>>,

    /// Redirect defaults and bind address
    pub config: Arc<ServerConfig>,
}
