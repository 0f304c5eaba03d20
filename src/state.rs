use std::sync::Arc;

use crate::config::AppConfig;
use crate::identity::IdentityVerifier;
use crate::store::Datastore;

/// Shared application state handed to every handler. Everything is
/// constructed in `main` and injected; there are no process globals.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Datastore,
    pub verifier: Arc<IdentityVerifier>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Datastore) -> Self {
        let verifier = Arc::new(IdentityVerifier::new(config.oauth.clone()));
        Self {
            config: Arc::new(config),
            store,
            verifier,
        }
    }

    /// Base URL for `self` and pagination links.
    pub fn base_url(&self) -> &str {
        &self.config.server.public_url
    }
}
