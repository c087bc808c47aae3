use std::sync::Arc;

use crate::{
    auth::jwt::JwtService,
    config::{AppConfig, SettlementCodes},
    db::{PgPool, PgPooledConnection},
    error::{AppError, AppResult},
    storage::ObjectStorage,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn ObjectStorage>,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: AppConfig,
        storage: Arc<dyn ObjectStorage>,
        jwt: JwtService,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            storage,
            jwt,
        }
    }

    pub fn db(&self) -> AppResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| AppError::internal(format!("database pool error: {err}")))
    }

    /// Largest slip or cash receipt file accepted, in bytes.
    pub fn upload_limit(&self) -> usize {
        self.config.upload_max_bytes
    }

    pub fn settlement_codes(&self) -> SettlementCodes {
        self.config.settlement
    }
}
