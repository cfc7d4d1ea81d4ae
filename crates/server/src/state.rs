//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::pix::{PixError, PixGateway};
use crate::services::auth::TokenKeys;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    gateway: PixGateway,
    tokens: TokenKeys,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns `PixError::Config` if the PIX gateway cannot be built from the
    /// configuration.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, PixError> {
        let gateway = PixGateway::from_config(&config.pix)?;
        Ok(Self::with_gateway(config, pool, gateway))
    }

    /// Create state around an already built gateway.
    #[must_use]
    pub fn with_gateway(config: ServerConfig, pool: PgPool, gateway: PixGateway) -> Self {
        let tokens = TokenKeys::new(&config.jwt);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                gateway,
                tokens,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the PIX gateway.
    #[must_use]
    pub fn gateway(&self) -> &PixGateway {
        &self.inner.gateway
    }

    /// Get a reference to the token signing keys.
    #[must_use]
    pub fn tokens(&self) -> &TokenKeys {
        &self.inner.tokens
    }
}
