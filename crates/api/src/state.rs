//! Shared application state

use std::sync::Arc;

use sqlx::PgPool;

use dealcrm_entitlements::SubscriptionStore;

use crate::auth::JwtManager;
use crate::config::Config;

/// State shared by all request handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: JwtManager,
    pub store: SubscriptionStore,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let jwt = JwtManager::new(&config.jwt_secret, config.jwt_expiry_hours);
        let store = SubscriptionStore::new(pool.clone());
        Self {
            pool,
            config: Arc::new(config),
            jwt,
            store,
        }
    }
}
