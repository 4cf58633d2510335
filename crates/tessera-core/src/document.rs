//! Document-store driver contract
//!
//! Document stores get introspection and filtered retrieval only. They do
//! not take part in change tracking, so this contract shares nothing with
//! [`crate::Connection`].

use crate::{ConnectionConfig, ProviderKind, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Bounds applied to every document-store call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTimeouts {
    /// Connect and ping
    #[serde(with = "secs")]
    pub connect: Duration,
    /// Listing and document queries
    #[serde(with = "secs")]
    pub query: Duration,
}

impl Default for DocumentTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            query: Duration::from_secs(30),
        }
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

/// A page of documents request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentsRequest {
    pub database: String,
    pub collection: String,
    /// JSON filter document, passed to the store as-is
    #[serde(default)]
    pub filter: Option<String>,
    /// JSON sort document
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub skip: u64,
    #[serde(default)]
    pub limit: u64,
}

impl DocumentsRequest {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
            ..Default::default()
        }
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn page(mut self, skip: u64, limit: u64) -> Self {
        self.skip = skip;
        self.limit = limit;
        self
    }

    /// Limit after the default cap is applied
    pub fn effective_limit(&self) -> u64 {
        if self.limit == 0 {
            crate::DEFAULT_RECORD_LIMIT
        } else {
            self.limit
        }
    }
}

/// Documents rendered as relaxed extended JSON, plus the filter's total
#[derive(Debug, Clone, Default)]
pub struct DocumentPage {
    pub documents: Vec<serde_json::Value>,
    pub total_count: u64,
}

/// A document-store driver
#[async_trait]
pub trait DocumentDriver: Send + Sync {
    fn provider(&self) -> ProviderKind;

    fn display_name(&self) -> &'static str;

    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn DocumentConnection>>;

    /// Connect, ping, and close again.
    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()> {
        let conn = self.connect(config).await?;
        let ping = conn.ping().await;
        let closed = conn.close().await;
        ping?;
        closed
    }
}

/// A live document-store connection
#[async_trait]
pub trait DocumentConnection: Send + Sync {
    fn driver_name(&self) -> &str;

    async fn list_databases(&self) -> Result<Vec<String>>;

    async fn list_collections(&self, database: &str) -> Result<Vec<String>>;

    async fn get_documents(&self, request: &DocumentsRequest) -> Result<DocumentPage>;

    async fn ping(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}
