//! MS SQL Server driver implementation

use async_trait::async_trait;
use std::sync::Arc;
use tessera_core::{Connection, ConnectionConfig, DatabaseDriver, ProviderKind, Result, TesseraError};

use crate::MssqlConnection;

/// MS SQL Server database driver
pub struct MssqlDriver;

impl MssqlDriver {
    /// Create a new MS SQL Server driver instance
    pub fn new() -> Self {
        tracing::debug!("MS SQL Server driver initialized");
        Self
    }
}

impl Default for MssqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for MssqlDriver {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Mssql
    }

    fn display_name(&self) -> &'static str {
        "Microsoft SQL Server"
    }

    #[tracing::instrument(skip(self, config), fields(name = %config.name))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let conn = MssqlConnection::connect(&config.url).await.map_err(|e| {
            tracing::error!(error = %e, "failed to connect to MS SQL Server");
            match TesseraError::from(e) {
                e @ (TesseraError::Connection(_) | TesseraError::Configuration(_)) => e,
                other => TesseraError::Connection(other.to_string()),
            }
        })?;
        Ok(Arc::new(conn))
    }
}
