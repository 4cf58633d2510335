//! Open sessions and the rules that apply to them

use std::sync::Arc;
use tessera_core::dml::{DmlChange, QueryBuilder};
use tessera_core::{
    Connection, ConnectionConfig, DmlSummary, DocumentConnection, DocumentPage, DocumentsRequest,
    QueryResult, RecordPage, RecordsRequest, Result, TesseraError, validate_query_for_read_only,
};
use uuid::Uuid;

use crate::{BackgroundProcess, LifetimeToken};

/// An open relational connection plus its session state
pub struct RelationalSession {
    id: Uuid,
    config: ConnectionConfig,
    conn: Arc<dyn Connection>,
    lifetime: LifetimeToken,
    /// Held for the duration of a pending-change commit
    pub(crate) commit_gate: tokio::sync::Mutex<()>,
    _setup: Vec<BackgroundProcess>,
}

impl RelationalSession {
    pub(crate) fn new(
        config: ConnectionConfig,
        conn: Arc<dyn Connection>,
        lifetime: LifetimeToken,
        setup: Vec<BackgroundProcess>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            conn,
            lifetime,
            commit_gate: tokio::sync::Mutex::new(()),
            _setup: setup,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn is_read_only(&self) -> bool {
        self.config.read_only
    }

    pub fn lifetime(&self) -> &LifetimeToken {
        &self.lifetime
    }

    /// The driver connection, for introspection
    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.conn
    }

    fn check_read_only(&self, sql: &str) -> Result<()> {
        if self.config.read_only {
            validate_query_for_read_only(sql)?;
        }
        Ok(())
    }

    pub async fn get_records(&self, request: &RecordsRequest) -> Result<RecordPage> {
        self.lifetime.guard(self.conn.get_records(request)).await
    }

    /// Free-form SQL expected to return rows
    #[tracing::instrument(skip(self, sql), fields(session = %self.id))]
    pub async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        self.check_read_only(sql)?;
        self.lifetime.guard(self.conn.execute_query(sql)).await
    }

    /// Free-form mutation. Rejected on a read-only session before anything
    /// reaches the backend.
    #[tracing::instrument(skip(self, sql), fields(session = %self.id))]
    pub async fn execute_dml_statement(&self, sql: &str) -> Result<DmlSummary> {
        self.check_read_only(sql)?;
        self.lifetime.guard(self.conn.execute_dml_statement(sql)).await
    }

    /// Apply pending changes in one transaction.
    ///
    /// Read-only sessions are refused, and so is a second commit while one
    /// is running. Cancelling the lifetime drops the transaction, which rolls
    /// it back.
    #[tracing::instrument(skip(self, changes), fields(session = %self.id, count = changes.len()))]
    pub async fn execute_pending_changes(&self, changes: &[DmlChange]) -> Result<DmlSummary> {
        if self.config.read_only {
            return Err(TesseraError::ReadOnlyViolation(format!(
                "{} pending change(s) on '{}'",
                changes.len(),
                self.config.name
            )));
        }
        let Ok(_gate) = self.commit_gate.try_lock() else {
            tracing::warn!("commit rejected, another commit is in flight");
            return Err(TesseraError::CommitInProgress);
        };
        let summary = self
            .lifetime
            .guard(self.conn.execute_pending_changes(changes))
            .await?;
        tracing::info!(affected_rows = summary.affected_rows, "pending changes committed");
        Ok(summary)
    }

    /// Literal SQL for each change, in commit order
    pub fn preview(&self, changes: &[DmlChange]) -> Result<Vec<String>> {
        let builder = QueryBuilder::new(self.conn.dialect());
        changes.iter().map(|change| builder.preview(change)).collect()
    }

    pub(crate) async fn close(&self) -> Result<()> {
        self.lifetime.cancel();
        self.conn.close().await
    }
}

/// An open document-store connection
pub struct DocumentSession {
    id: Uuid,
    config: ConnectionConfig,
    conn: Arc<dyn DocumentConnection>,
    lifetime: LifetimeToken,
    _setup: Vec<BackgroundProcess>,
}

impl DocumentSession {
    pub(crate) fn new(
        config: ConnectionConfig,
        conn: Arc<dyn DocumentConnection>,
        lifetime: LifetimeToken,
        setup: Vec<BackgroundProcess>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            conn,
            lifetime,
            _setup: setup,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn lifetime(&self) -> &LifetimeToken {
        &self.lifetime
    }

    pub async fn list_databases(&self) -> Result<Vec<String>> {
        self.lifetime.guard(self.conn.list_databases()).await
    }

    pub async fn list_collections(&self, database: &str) -> Result<Vec<String>> {
        self.lifetime.guard(self.conn.list_collections(database)).await
    }

    pub async fn get_documents(&self, request: &DocumentsRequest) -> Result<DocumentPage> {
        self.lifetime.guard(self.conn.get_documents(request)).await
    }

    pub(crate) async fn close(&self) -> Result<()> {
        self.lifetime.cancel();
        self.conn.close().await
    }
}

/// A session of either family
#[derive(Clone)]
pub enum Session {
    Relational(Arc<RelationalSession>),
    Document(Arc<DocumentSession>),
}

impl Session {
    pub fn id(&self) -> Uuid {
        match self {
            Session::Relational(s) => s.id(),
            Session::Document(s) => s.id(),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        match self {
            Session::Relational(s) => s.config(),
            Session::Document(s) => s.config(),
        }
    }

    pub fn as_relational(&self) -> Option<&Arc<RelationalSession>> {
        match self {
            Session::Relational(s) => Some(s),
            Session::Document(_) => None,
        }
    }

    pub fn as_document(&self) -> Option<&Arc<DocumentSession>> {
        match self {
            Session::Document(s) => Some(s),
            Session::Relational(_) => None,
        }
    }

    pub(crate) async fn close(&self) -> Result<()> {
        match self {
            Session::Relational(s) => s.close().await,
            Session::Document(s) => s.close().await,
        }
    }
}
