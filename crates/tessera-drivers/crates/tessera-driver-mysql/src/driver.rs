//! MySQL driver implementation

use async_trait::async_trait;
use std::sync::Arc;
use tessera_core::{Connection, ConnectionConfig, DatabaseDriver, ProviderKind, Result, TesseraError};

use crate::MySqlConnection;

/// MySQL/MariaDB database driver
pub struct MySqlDriver;

impl MySqlDriver {
    /// Create a new MySQL driver instance
    pub fn new() -> Self {
        tracing::debug!("MySQL driver initialized");
        Self
    }
}

impl Default for MySqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for MySqlDriver {
    fn provider(&self) -> ProviderKind {
        ProviderKind::MySql
    }

    fn display_name(&self) -> &'static str {
        "MySQL"
    }

    #[tracing::instrument(skip(self, config), fields(name = %config.name))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        // mariadb:// is accepted as an alias
        let url = match config.url.strip_prefix("mariadb://") {
            Some(rest) => format!("mysql://{}", rest),
            None => config.url.clone(),
        };
        let conn = MySqlConnection::connect(&url).await.map_err(|e| {
            tracing::error!(error = %e, "failed to connect to MySQL database");
            match e {
                TesseraError::Connection(_) | TesseraError::Configuration(_) => e,
                other => TesseraError::Connection(other.to_string()),
            }
        })?;
        Ok(Arc::new(conn))
    }
}
