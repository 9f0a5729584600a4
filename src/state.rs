use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::exchange::AuthExchangeService;
use crate::auth::provider::{Auth0Client, IdentityProvider};
use crate::auth::token::TokenCodec;
use crate::config::AppConfig;

/// Shared application state. Everything request handlers need reaches them
/// through here; in particular the token codec is injected, never global,
/// so tests can run with their own signing key.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: PgPool,
    pub codec: Arc<TokenCodec>,
    pub exchange: Arc<AuthExchangeService>,
}

impl AppState {
    pub fn new(config: AppConfig, pool: PgPool) -> Result<Self, reqwest::Error> {
        let provider = Arc::new(Auth0Client::new(&config.provider)?);
        Ok(Self::with_provider(config, pool, provider))
    }

    /// Same wiring with the identity provider swapped out; the seam tests
    /// use to avoid real Auth0 traffic.
    pub fn with_provider(
        config: AppConfig,
        pool: PgPool,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let config = Arc::new(config);
        let codec = Arc::new(TokenCodec::new(&config.auth));
        let exchange = Arc::new(AuthExchangeService::new(
            provider,
            codec.clone(),
            pool.clone(),
        ));

        Self {
            config,
            pool,
            codec,
            exchange,
        }
    }
}
