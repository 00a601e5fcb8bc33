//! Application state shared across routes

use std::sync::Arc;

use crate::app::sessions::SessionRegistry;
use crate::config::Config;
use crate::store::{RecordStore, SheetsClient};
use crate::util::rate_limit::{create_limiter, Limiter};

/// Shared application state
pub struct AppState<S = SheetsClient> {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionRegistry<S>>,
    /// Throttles saves to stay under the backend's write quota
    pub mutation_limiter: Arc<Limiter>,
}

impl<S: RecordStore> AppState<S> {
    /// `store` is the process-wide client; every session gets a clone of it.
    pub fn new(config: Config, store: S) -> Self {
        let mutation_limiter = create_limiter(config.mutations_per_minute);

        Self {
            config: Arc::new(config),
            sessions: Arc::new(SessionRegistry::new(store)),
            mutation_limiter,
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            sessions: self.sessions.clone(),
            mutation_limiter: self.mutation_limiter.clone(),
        }
    }
}
