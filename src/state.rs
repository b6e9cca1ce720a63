use std::sync::Arc;

use crate::config::Config;
use crate::session::SessionKeys;
use crate::store::Store;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub sessions: Arc<SessionKeys>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, store: Store) -> Self {
        let sessions = SessionKeys::new(config.session_secret.as_bytes(), config.session_ttl_hours);
        Self {
            store,
            sessions: Arc::new(sessions),
            config: Arc::new(config),
        }
    }
}
