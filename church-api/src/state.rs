//! Shared application state.

use std::sync::Arc;

use account_service::AccountService;
use auth::JwtConfig;
use db::DbPool;

use crate::config::ApiConfig;

/// State handed to every handler through axum's `State`
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub settings: Arc<ApiConfig>,
    /// Present when accounts live in MySQL
    pub db: Option<DbPool>,
}

impl AppState {
    pub fn new(accounts: AccountService, settings: ApiConfig) -> Self {
        Self {
            accounts,
            settings: Arc::new(settings),
            db: None,
        }
    }

    pub fn with_pool(mut self, pool: DbPool) -> Self {
        self.db = Some(pool);
        self
    }

    /// State over an in-memory account store
    pub fn in_memory(settings: ApiConfig) -> Self {
        let accounts = AccountService::in_memory(settings.jwt_config())
            .with_email_domain(settings.email_domain.clone());
        Self::new(accounts, settings)
    }

    /// Token settings used by the extractors
    pub fn jwt(&self) -> &JwtConfig {
        self.accounts.jwt_config()
    }
}
