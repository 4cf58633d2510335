//! Unit tests for the transactional executor

use super::*;
use crate::dialect::tests::AnsiDialect;
use crate::{
    ColumnInfo, Connection, ConstraintInfo, DatabaseInfo, ForeignKeyInfo, IndexInfo, QueryResult,
    Result, SchemaIntrospection, SqlDialect, StatementResult, TableInfo, TesseraError, Transaction,
    Value,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::error::Error as _;
use std::sync::Arc;

static ANSI: AnsiDialect = AnsiDialect;

/// Records every call and fails on request.
#[derive(Default)]
struct MockConnection {
    log: Arc<Mutex<Vec<String>>>,
    fail_on: Option<&'static str>,
    fail_rollback: bool,
}

impl MockConnection {
    fn failing_on(fragment: &'static str) -> Self {
        Self {
            fail_on: Some(fragment),
            ..Default::default()
        }
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

struct MockTransaction {
    log: Arc<Mutex<Vec<String>>>,
    fail_on: Option<&'static str>,
    fail_rollback: bool,
}

#[async_trait]
impl Transaction for MockTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.log.lock().push("COMMIT".into());
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.log.lock().push("ROLLBACK".into());
        if self.fail_rollback {
            return Err(TesseraError::Connection("connection reset".into()));
        }
        Ok(())
    }

    async fn query(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
        Ok(QueryResult::empty())
    }

    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<StatementResult> {
        self.log.lock().push(sql.to_string());
        if let Some(fragment) = self.fail_on
            && sql.contains(fragment)
        {
            return Err(TesseraError::Query("constraint failed".into()));
        }
        Ok(StatementResult {
            affected_rows: 1,
            execution_time_ms: 0,
        })
    }
}

#[async_trait]
impl SchemaIntrospection for MockConnection {
    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        Ok(vec![])
    }
    async fn list_tables(&self, _database: &str) -> Result<Vec<TableInfo>> {
        Ok(vec![])
    }
    async fn get_columns(&self, _database: &str, _table: &str) -> Result<Vec<ColumnInfo>> {
        Ok(vec![])
    }
    async fn get_indexes(&self, _database: &str, _table: &str) -> Result<Vec<IndexInfo>> {
        Ok(vec![])
    }
    async fn get_foreign_keys(&self, _database: &str, _table: &str) -> Result<Vec<ForeignKeyInfo>> {
        Ok(vec![])
    }
    async fn get_constraints(&self, _database: &str, _table: &str) -> Result<Vec<ConstraintInfo>> {
        Ok(vec![])
    }
    async fn get_primary_key_columns(&self, _database: &str, _table: &str) -> Result<Vec<String>> {
        Ok(vec![])
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    fn dialect(&self) -> &'static dyn SqlDialect {
        &ANSI
    }

    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<StatementResult> {
        self.log.lock().push(format!("AUTOCOMMIT {}", sql));
        Ok(StatementResult {
            affected_rows: 1,
            execution_time_ms: 0,
        })
    }

    async fn query(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
        Ok(QueryResult::empty())
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>> {
        self.log.lock().push("BEGIN".into());
        Ok(Box::new(MockTransaction {
            log: self.log.clone(),
            fail_on: self.fail_on,
            fail_rollback: self.fail_rollback,
        }))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }
}

fn key(id: i64) -> Vec<PrimaryKeyInfo> {
    vec![PrimaryKeyInfo::new("id", Value::Int64(id))]
}

fn three_changes() -> Vec<DmlChange> {
    vec![
        DmlChange::insert("main", "users", vec![CellValue::new("name", "first")]),
        DmlChange::update("main", "users", key(2), vec![CellValue::new("name", "second")]),
        DmlChange::delete("main", "users", key(3)),
    ]
}

#[tokio::test]
async fn test_commits_changes_in_order() {
    let conn = MockConnection::default();
    let summary = conn.execute_pending_changes(&three_changes()).await.unwrap();

    assert_eq!(summary.affected_rows, 3);
    let log = conn.log();
    assert_eq!(log.first().map(String::as_str), Some("BEGIN"));
    assert!(log[1].starts_with("INSERT"));
    assert!(log[2].starts_with("UPDATE"));
    assert!(log[3].starts_with("DELETE"));
    assert_eq!(log.last().map(String::as_str), Some("COMMIT"));
}

#[tokio::test]
async fn test_failure_rolls_back_and_stops() {
    let conn = MockConnection::failing_on("UPDATE");
    let err = conn.execute_pending_changes(&three_changes()).await.unwrap_err();

    assert!(matches!(err, TesseraError::Query(_)));
    let log = conn.log();
    assert_eq!(log.last().map(String::as_str), Some("ROLLBACK"));
    assert!(!log.iter().any(|entry| entry.starts_with("DELETE")));
    assert!(!log.iter().any(|entry| entry == "COMMIT"));
}

#[tokio::test]
async fn test_rollback_failure_is_joined() {
    let conn = MockConnection {
        fail_rollback: true,
        ..MockConnection::failing_on("DELETE")
    };
    let err = conn.execute_pending_changes(&three_changes()).await.unwrap_err();

    let TesseraError::RollbackFailed { ref rollback, .. } = err else {
        panic!("expected RollbackFailed, got {err:?}");
    };
    assert!(rollback.to_string().contains("connection reset"));
    assert!(err.source().unwrap().to_string().contains("constraint failed"));
}

#[tokio::test]
async fn test_missing_key_runs_nothing() {
    let conn = MockConnection::default();
    let changes = vec![
        DmlChange::insert("main", "users", vec![CellValue::new("name", "ok")]),
        DmlChange::update("main", "log", vec![], vec![CellValue::new("msg", "x")]),
    ];
    let err = conn.execute_pending_changes(&changes).await.unwrap_err();

    assert!(matches!(err, TesseraError::MissingPrimaryKey { .. }));
    assert!(conn.log().is_empty());
}

#[tokio::test]
async fn test_empty_batch_skips_transaction() {
    let conn = MockConnection::default();
    let summary = conn.execute_pending_changes(&[]).await.unwrap();
    assert_eq!(summary.affected_rows, 0);
    assert!(conn.log().is_empty());
}

#[tokio::test]
async fn test_preview_does_not_touch_connection() {
    let conn = MockConnection::default();
    let sql = conn.dml_change_to_query_string(&three_changes()[1]).unwrap();
    assert_eq!(sql, "UPDATE \"users\" SET \"name\" = 'second' WHERE \"id\" = 2");
    assert!(conn.log().is_empty());
}
