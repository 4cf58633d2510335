//! PostgreSQL connection implementation

use async_trait::async_trait;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio_postgres::config::SslMode;
use tokio_postgres::types::ToSql;
use tokio_postgres::{CancelToken, Client, NoTls};
use tessera_core::{
    ColumnMeta, Connection, QueryCancelHandle, QueryResult, Result, Row, SqlDialect,
    StatementResult, TesseraError, Transaction, Value,
};

use crate::POSTGRES_DIALECT;
use crate::convert::{PgValue, bind_params, postgres_to_value, query_error};

/// Cancel handle for PostgreSQL queries.
///
/// Sends a cancel request over a separate connection; the running
/// statement fails with `57014 query_canceled`.
pub struct PostgresCancelHandle {
    cancel_token: CancelToken,
    runtime: Handle,
}

impl QueryCancelHandle for PostgresCancelHandle {
    fn cancel(&self) {
        tracing::debug!("sending cancel request to PostgreSQL server");
        let cancel_token = self.cancel_token.clone();
        self.runtime.spawn(async move {
            if let Err(e) = cancel_token.cancel_query(NoTls).await {
                tracing::warn!(error = %e, "failed to cancel PostgreSQL query");
            }
        });
    }
}

/// PostgreSQL connection wrapper
pub struct PostgresConnection {
    client: Arc<Mutex<Client>>,
    cancel_token: CancelToken,
    runtime: Handle,
    closed: AtomicBool,
}

impl PostgresConnection {
    /// Connect using a `postgres://` URL or a libpq key/value string.
    ///
    /// `sslmode=disable` connects in plain text; every other mode goes
    /// through native-tls, with `require` skipping certificate checks.
    pub async fn connect(url: &str) -> Result<Self> {
        let config = tokio_postgres::Config::from_str(url)
            .map_err(|e| TesseraError::Configuration(format!("Invalid PostgreSQL URL: {}", e)))?;
        let runtime = Handle::try_current().map_err(|e| {
            TesseraError::Connection(format!("PostgreSQL needs a Tokio runtime: {}", e))
        })?;

        tracing::info!(
            hosts = ?config.get_hosts(),
            database = ?config.get_dbname(),
            ssl_mode = ?config.get_ssl_mode(),
            "connecting to PostgreSQL database"
        );

        let client = match config.get_ssl_mode() {
            SslMode::Disable => {
                let (client, connection) = config.connect(NoTls).await.map_err(|e| {
                    TesseraError::Connection(format!("Failed to connect to PostgreSQL: {}", e))
                })?;
                runtime.spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::error!(error = %e, "PostgreSQL connection error");
                    }
                });
                client
            }
            mode => {
                let lenient = matches!(mode, SslMode::Require);
                let tls_connector = TlsConnector::builder()
                    .danger_accept_invalid_certs(lenient)
                    .danger_accept_invalid_hostnames(lenient)
                    .build()
                    .map_err(|e| {
                        TesseraError::Connection(format!("Failed to build TLS connector: {}", e))
                    })?;
                let tls = MakeTlsConnector::new(tls_connector);

                let (client, connection) = config.connect(tls).await.map_err(|e| {
                    TesseraError::Connection(format!("Failed to connect to PostgreSQL: {}", e))
                })?;
                runtime.spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::error!(error = %e, "PostgreSQL connection error");
                    }
                });
                client
            }
        };

        tracing::info!("PostgreSQL connection established");
        Ok(Self {
            cancel_token: client.cancel_token(),
            client: Arc::new(Mutex::new(client)),
            runtime,
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TesseraError::Connection("PostgreSQL connection is closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for PostgresConnection {
    fn driver_name(&self) -> &str {
        "postgres"
    }

    fn dialect(&self) -> &'static dyn SqlDialect {
        &POSTGRES_DIALECT
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        self.ensure_open()?;
        let client = self.client.lock().await;
        run_execute(&client, sql, params).await
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.ensure_open()?;
        let client = self.client.lock().await;
        run_query(&client, sql, params).await
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>> {
        self.ensure_open()?;
        tracing::debug!("beginning PostgreSQL transaction");
        {
            let client = self.client.lock().await;
            client
                .batch_execute("BEGIN")
                .await
                .map_err(|e| query_error("Failed to begin transaction", &e))?;
        }
        Ok(Box::new(PostgresTransaction {
            client: Arc::clone(&self.client),
            committed: false,
            rolled_back: false,
        }))
    }

    async fn close(&self) -> Result<()> {
        tracing::info!("closing PostgreSQL connection");
        // The background task ends once the client is dropped.
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.client.try_lock().is_ok_and(|c| c.is_closed())
    }

    fn cancel_handle(&self) -> Option<Arc<dyn QueryCancelHandle>> {
        Some(Arc::new(PostgresCancelHandle {
            cancel_token: self.cancel_token.clone(),
            runtime: self.runtime.clone(),
        }))
    }
}

/// PostgreSQL transaction on the shared client.
pub struct PostgresTransaction {
    client: Arc<Mutex<Client>>,
    committed: bool,
    rolled_back: bool,
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        if self.committed || self.rolled_back {
            return;
        }
        tracing::warn!("PostgreSQL transaction dropped without commit or rollback, rolling back");
        if let Ok(runtime) = Handle::try_current() {
            let client = Arc::clone(&self.client);
            runtime.spawn(async move {
                if let Err(e) = client.lock().await.batch_execute("ROLLBACK").await {
                    tracing::error!(error = %e, "automatic rollback on drop failed");
                }
            });
        }
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(mut self: Box<Self>) -> Result<()> {
        if self.rolled_back {
            return Err(TesseraError::Query("Transaction already rolled back".into()));
        }
        let client = Arc::clone(&self.client);
        let client = client.lock().await;
        client
            .batch_execute("COMMIT")
            .await
            .map_err(|e| query_error("Failed to commit transaction", &e))?;
        self.committed = true;
        tracing::debug!("PostgreSQL transaction committed");
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        if self.committed {
            return Err(TesseraError::Query("Transaction already committed".into()));
        }
        let client = Arc::clone(&self.client);
        let client = client.lock().await;
        self.rolled_back = true;
        client
            .batch_execute("ROLLBACK")
            .await
            .map_err(|e| query_error("Failed to rollback transaction", &e))?;
        tracing::debug!("PostgreSQL transaction rolled back");
        Ok(())
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "query in PostgreSQL transaction");
        let client = self.client.lock().await;
        run_query(&client, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "statement in PostgreSQL transaction");
        let client = self.client.lock().await;
        run_execute(&client, sql, params).await
    }
}

fn param_refs(values: &[PgValue]) -> Vec<&(dyn ToSql + Sync)> {
    values.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

async fn run_execute(client: &Client, sql: &str, params: &[Value]) -> Result<StatementResult> {
    let start_time = std::time::Instant::now();

    // Prepare first so parameters bind with the server's types
    let statement = client
        .prepare(sql)
        .await
        .map_err(|e| query_error("Failed to prepare statement", &e))?;
    let pg_params = bind_params(params, statement.params());

    let rows_affected = client
        .execute(&statement, &param_refs(&pg_params))
        .await
        .map_err(|e| query_error("Failed to execute statement", &e))?;

    tracing::debug!(affected_rows = rows_affected, "statement executed");
    Ok(StatementResult {
        affected_rows: rows_affected,
        execution_time_ms: start_time.elapsed().as_millis() as u64,
    })
}

async fn run_query(client: &Client, sql: &str, params: &[Value]) -> Result<QueryResult> {
    let start_time = std::time::Instant::now();

    let statement = client
        .prepare(sql)
        .await
        .map_err(|e| query_error("Failed to prepare query", &e))?;
    let pg_params = bind_params(params, statement.params());

    // Column metadata comes from the statement so empty results keep it
    let columns: Vec<ColumnMeta> = statement
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| ColumnMeta::new(col.name(), col.type_().name(), idx))
        .collect();
    let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

    let pg_rows = client
        .query(&statement, &param_refs(&pg_params))
        .await
        .map_err(|e| query_error("Failed to execute query", &e))?;

    let mut rows = Vec::with_capacity(pg_rows.len());
    for pg_row in &pg_rows {
        let values = (0..column_names.len())
            .map(|i| postgres_to_value(pg_row, i))
            .collect::<Result<Vec<_>>>()?;
        rows.push(Row::new(column_names.clone(), values));
    }

    let execution_time_ms = start_time.elapsed().as_millis() as u64;
    tracing::debug!(row_count = rows.len(), execution_time_ms, "query executed");
    Ok(QueryResult::from_rows(columns, rows, execution_time_ms))
}
