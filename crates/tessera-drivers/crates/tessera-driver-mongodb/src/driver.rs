//! MongoDB driver implementation

use async_trait::async_trait;
use mongodb::Client;
use mongodb::options::ClientOptions;
use std::sync::Arc;
use tessera_core::{
    ConnectionConfig, DocumentConnection, DocumentDriver, DocumentTimeouts, ProviderKind, Result,
    TesseraError,
};

use crate::MongoDbConnection;

/// MongoDB database driver
pub struct MongoDbDriver {
    timeouts: DocumentTimeouts,
}

impl MongoDbDriver {
    /// Create a new MongoDB driver instance
    pub fn new() -> Self {
        Self::with_timeouts(DocumentTimeouts::default())
    }

    pub fn with_timeouts(timeouts: DocumentTimeouts) -> Self {
        tracing::debug!(?timeouts, "MongoDB driver initialized");
        Self { timeouts }
    }

    pub fn timeouts(&self) -> DocumentTimeouts {
        self.timeouts
    }
}

impl Default for MongoDbDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentDriver for MongoDbDriver {
    fn provider(&self) -> ProviderKind {
        ProviderKind::MongoDb
    }

    fn display_name(&self) -> &'static str {
        "MongoDB"
    }

    #[tracing::instrument(skip(self, config), fields(name = %config.name))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn DocumentConnection>> {
        tracing::debug!("connecting to MongoDB");

        let mut options = tokio::time::timeout(self.timeouts.connect, ClientOptions::parse(&config.url))
            .await
            .map_err(|_| TesseraError::Timeout("MongoDB URL resolution timed out".into()))?
            .map_err(|e| {
                TesseraError::Configuration(format!("Failed to parse MongoDB options: {}", e))
            })?;
        options.connect_timeout = Some(self.timeouts.connect);
        options.server_selection_timeout = Some(self.timeouts.connect);

        let client = Client::with_options(options)
            .map_err(|e| TesseraError::Connection(format!("Failed to create MongoDB client: {}", e)))?;

        MongoDbConnection::ping_with(&client, self.timeouts.connect)
            .await
            .map_err(|e| match e {
                TesseraError::Timeout(_) => e,
                other => TesseraError::Connection(other.to_string()),
            })?;

        tracing::debug!("successfully connected to MongoDB");
        Ok(Arc::new(MongoDbConnection::new(client, self.timeouts)))
    }
}
