//! PostgreSQL driver implementation

use async_trait::async_trait;
use std::sync::Arc;
use tessera_core::{Connection, ConnectionConfig, DatabaseDriver, ProviderKind, Result, TesseraError};

use crate::PostgresConnection;

/// PostgreSQL database driver
pub struct PostgresDriver;

impl PostgresDriver {
    /// Create a new PostgreSQL driver instance
    pub fn new() -> Self {
        tracing::debug!("PostgreSQL driver initialized");
        Self
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for PostgresDriver {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Postgres
    }

    fn display_name(&self) -> &'static str {
        "PostgreSQL"
    }

    #[tracing::instrument(skip(self, config), fields(name = %config.name))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let conn = PostgresConnection::connect(&config.url).await.map_err(|e| {
            tracing::error!(error = %e, "failed to connect to PostgreSQL database");
            match e {
                TesseraError::Connection(_) | TesseraError::Configuration(_) => e,
                other => TesseraError::Connection(other.to_string()),
            }
        })?;
        Ok(Arc::new(conn))
    }
}
