//! Application state.

use std::sync::Arc;

use tally_core::RuleStore;
use tally_ledger::PointsLedger;
use tally_store::Store;

use crate::config::ServiceConfig;
use crate::error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The points ledger.
    pub ledger: Arc<PointsLedger>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state over `store` and `rules`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, rules: Arc<dyn RuleStore>, config: ServiceConfig) -> Self {
        if config.service_api_key.is_none() {
            tracing::warn!("SERVICE_API_KEY not set - service endpoints will reject all requests");
        }
        if config.admin_api_key.is_none() {
            tracing::warn!("ADMIN_API_KEY not set - admin endpoints will reject all requests");
        }
        if config.auth_jwt_secret.is_none() {
            tracing::warn!("AUTH_JWT_SECRET not set - user endpoints will reject all tokens");
        }

        let ledger = Arc::new(PointsLedger::new(store, rules, config.ledger));

        Self { ledger, config }
    }

    /// Run a ledger operation on tokio's blocking pool.
    ///
    /// The ledger is synchronous and waits on per-user locks and the store,
    /// so handlers never call it on a runtime worker thread.
    pub async fn blocking<T, F>(self: &Arc<Self>, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Self) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || op(&state))
            .await
            .map_err(|e| ApiError::Internal(format!("ledger task failed: {e}")))?
    }
}
