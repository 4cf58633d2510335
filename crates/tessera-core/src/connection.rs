//! Connection trait and transaction handling

use crate::dml::{self, DmlChange, QueryBuilder};
use crate::{
    DmlSummary, QueryResult, RecordPage, RecordsRequest, Result, SchemaIntrospection, SqlDialect,
    StatementResult, Value,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Handle for cancelling a running query from any thread.
///
/// Subsequent calls are no-ops. If no query is running, nothing happens.
pub trait QueryCancelHandle: Send + Sync {
    fn cancel(&self);
}

/// A live relational connection.
///
/// Drivers implement the primitives (`execute`, `query`, transactions and
/// introspection); the record, DML and pending-change operations are
/// provided on top of them and are the same for every backend.
#[async_trait]
pub trait Connection: SchemaIntrospection + Send + Sync {
    /// Get the driver name (e.g., "sqlite", "postgres", "mysql")
    fn driver_name(&self) -> &str;

    /// SQL spelling for this backend
    fn dialect(&self) -> &'static dyn SqlDialect;

    /// Execute a statement that modifies data (INSERT/UPDATE/DELETE)
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Execute a query that returns rows (SELECT)
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Begin a transaction
    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;

    /// Get a handle that can be used to cancel running queries.
    ///
    /// Returns `None` if the driver does not support query cancellation.
    fn cancel_handle(&self) -> Option<Arc<dyn QueryCancelHandle>> {
        None
    }

    /// Fetch one page of a table plus the total row count for the same
    /// filter. A zero limit is capped at [`crate::DEFAULT_RECORD_LIMIT`].
    async fn get_records(&self, request: &RecordsRequest) -> Result<RecordPage> {
        let dialect = self.dialect();
        let executed_query = request.select_sql(dialect);
        tracing::debug!(
            table = %request.table,
            offset = request.offset,
            limit = request.effective_limit(),
            "fetching records"
        );

        let result = self.query(&executed_query, &[]).await?;
        let total_count = self
            .query(&request.count_sql(dialect), &[])
            .await?
            .scalar_i64()
            .unwrap_or(0)
            .max(0) as u64;

        Ok(RecordPage {
            result,
            total_count,
            executed_query,
        })
    }

    /// Run free-form read SQL.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        self.query(sql, &[]).await
    }

    /// Run a single free-form mutation.
    ///
    /// Read-only enforcement happens before this call; see
    /// [`crate::validate_query_for_read_only`].
    async fn execute_dml_statement(&self, sql: &str) -> Result<DmlSummary> {
        let result = self.execute(sql, &[]).await?;
        Ok(result.into())
    }

    /// Apply the pending changes in order inside one transaction.
    async fn execute_pending_changes(&self, changes: &[DmlChange]) -> Result<DmlSummary> {
        dml::execute_pending_changes(self, changes).await
    }

    /// Literal SQL for one change. Never touches the backend.
    fn dml_change_to_query_string(&self, change: &DmlChange) -> Result<String> {
        QueryBuilder::new(self.dialect()).preview(change)
    }
}

/// A database transaction
#[async_trait]
pub trait Transaction: Send + Sync {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;

    /// Execute a query within the transaction
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Execute a statement within the transaction
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;
}
