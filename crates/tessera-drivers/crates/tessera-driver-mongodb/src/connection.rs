//! MongoDB connection implementing the document-store contract

use async_trait::async_trait;
use bson::{Document, doc};
use futures::TryStreamExt;
use mongodb::Client;
use std::future::IntoFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tessera_core::{
    DocumentConnection, DocumentPage, DocumentTimeouts, DocumentsRequest, Result, TesseraError,
};

use crate::convert::{parse_json_document, to_relaxed_json};

/// Await a driver call, failing with `Timeout` once `limit` has passed.
pub(crate) async fn bounded<T, F>(operation: &str, limit: Duration, fut: F) -> Result<T>
where
    F: IntoFuture<Output = mongodb::error::Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(TesseraError::Query(format!("MongoDB {} failed: {}", operation, e))),
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "MongoDB call timed out");
            Err(TesseraError::Timeout(format!(
                "MongoDB {} exceeded {:?}",
                operation, limit
            )))
        }
    }
}

/// A live MongoDB client
pub struct MongoDbConnection {
    client: Client,
    timeouts: DocumentTimeouts,
    closed: AtomicBool,
}

impl MongoDbConnection {
    pub(crate) fn new(client: Client, timeouts: DocumentTimeouts) -> Self {
        Self {
            client,
            timeouts,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_not_closed(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TesseraError::Connection("Connection is closed".to_string()));
        }
        Ok(())
    }

    pub(crate) async fn ping_with(client: &Client, limit: Duration) -> Result<()> {
        bounded(
            "ping",
            limit,
            client.database("admin").run_command(doc! { "ping": 1 }),
        )
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl DocumentConnection for MongoDbConnection {
    fn driver_name(&self) -> &str {
        "mongodb"
    }

    #[tracing::instrument(skip(self))]
    async fn list_databases(&self) -> Result<Vec<String>> {
        self.ensure_not_closed()?;
        let mut names = bounded(
            "listDatabases",
            self.timeouts.query,
            self.client.list_database_names(),
        )
        .await?;
        names.sort();
        Ok(names)
    }

    #[tracing::instrument(skip(self))]
    async fn list_collections(&self, database: &str) -> Result<Vec<String>> {
        self.ensure_not_closed()?;
        let mut names = bounded(
            "listCollections",
            self.timeouts.query,
            self.client.database(database).list_collection_names(),
        )
        .await?;
        names.sort();
        tracing::debug!(collection_count = names.len(), "collections listed");
        Ok(names)
    }

    #[tracing::instrument(skip(self, request), fields(collection = %request.collection))]
    async fn get_documents(&self, request: &DocumentsRequest) -> Result<DocumentPage> {
        self.ensure_not_closed()?;
        let filter = parse_json_document(request.filter.as_deref())?;
        let sort = parse_json_document(request.sort.as_deref())?;
        let limit = request.effective_limit();

        let collection = self
            .client
            .database(&request.database)
            .collection::<Document>(&request.collection);

        let mut find = collection
            .find(filter.clone())
            .skip(request.skip)
            .limit(i64::try_from(limit).unwrap_or(i64::MAX));
        if !sort.is_empty() {
            find = find.sort(sort);
        }

        let documents = bounded("find", self.timeouts.query, async {
            let cursor = find.await?;
            cursor.try_collect::<Vec<Document>>().await
        })
        .await?;

        let total_count = bounded(
            "countDocuments",
            self.timeouts.query,
            collection.count_documents(filter),
        )
        .await?;

        tracing::debug!(document_count = documents.len(), total_count, "documents fetched");
        Ok(DocumentPage {
            documents: documents.into_iter().map(to_relaxed_json).collect(),
            total_count,
        })
    }

    async fn ping(&self) -> Result<()> {
        self.ensure_not_closed()?;
        Self::ping_with(&self.client, self.timeouts.connect).await
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let limit = self.timeouts.connect;
        if tokio::time::timeout(limit, self.client.clone().shutdown())
            .await
            .is_err()
        {
            tracing::warn!("MongoDB client shutdown did not finish in time");
        }
        tracing::debug!("MongoDB connection closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
