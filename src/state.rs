//! Shared application state.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::application::services::TokenService;
use crate::domain::page::DEFAULT_LIMIT;

/// Immutable request-handling settings built from [`Config`](crate::config::Config).
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Reveal detail of unexpected errors to clients.
    pub debug: bool,
    /// `limit` applied when a list request omits it.
    pub default_limit: u32,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            debug: false,
            default_limit: DEFAULT_LIMIT,
        }
    }
}

/// State injected into every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub tokens: Arc<TokenService>,
    pub settings: Arc<ApiSettings>,
}

impl AppState {
    pub fn new(pool: SqlitePool, tokens: TokenService, settings: ApiSettings) -> Self {
        Self {
            pool,
            tokens: Arc::new(tokens),
            settings: Arc::new(settings),
        }
    }
}
