//! SQLite driver implementation

use async_trait::async_trait;
use std::sync::Arc;
use tessera_core::{Connection, ConnectionConfig, DatabaseDriver, ProviderKind, Result, TesseraError};

use crate::SqliteConnection;

/// SQLite database driver
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create a new SQLite driver instance
    pub fn new() -> Self {
        tracing::debug!("SQLite driver initialized");
        Self
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Sqlite
    }

    fn display_name(&self) -> &'static str {
        "SQLite"
    }

    #[tracing::instrument(skip(self, config), fields(name = %config.name))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let conn = SqliteConnection::open(&config.url).map_err(|e| {
            tracing::error!(error = %e, "failed to connect to SQLite database");
            match e {
                TesseraError::Connection(_) | TesseraError::Configuration(_) => e,
                other => TesseraError::Connection(other.to_string()),
            }
        })?;
        Ok(Arc::new(conn))
    }
}
