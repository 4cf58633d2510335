//! Unit tests for session rules against in-memory SQLite

use super::*;
use std::sync::Arc;
use tessera_core::dml::{CellValue, ChangeSet, DmlChange, PrimaryKeyInfo, RowIdentity};
use tessera_core::{ConnectionConfig, ProviderKind, RecordsRequest, TesseraError, Value};

async fn open(read_only: bool) -> (ConnectionManager, Arc<RelationalSession>) {
    let manager = ConnectionManager::default();
    let config = ConnectionConfig::new(ProviderKind::Sqlite, ":memory:").read_only(read_only);
    let session = manager.connect(config).await.unwrap();
    let session = session.as_relational().cloned().unwrap();

    for sql in [
        "CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT NOT NULL)",
        "INSERT INTO items (id, label) VALUES (1, 'first'), (2, 'second')",
    ] {
        session.connection().execute(sql, &[]).await.unwrap();
    }
    (manager, session)
}

fn rename_first() -> Vec<DmlChange> {
    vec![DmlChange::update(
        "",
        "items",
        vec![PrimaryKeyInfo::new("id", Value::Int64(1))],
        vec![CellValue::new("label", "renamed")],
    )]
}

// ============================================================================
// Read-Only Tests
// ============================================================================

mod read_only_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_reads_are_allowed() {
        let (_manager, session) = open(true).await;
        let result = session.execute_query("SELECT label FROM items ORDER BY id").await.unwrap();
        assert_eq!(result.rows.len(), 2);

        let page = session.get_records(&RecordsRequest::new("", "items")).await.unwrap();
        assert_eq!(page.total_count, 2);
    }

    #[tokio::test]
    async fn test_free_form_mutation_rejected() {
        let (_manager, session) = open(true).await;
        let err = session
            .execute_dml_statement("DELETE FROM items")
            .await
            .unwrap_err();
        assert!(matches!(err, TesseraError::ReadOnlyViolation(_)));

        let err = session
            .execute_query("SELECT 1; DROP TABLE items")
            .await
            .unwrap_err();
        assert!(matches!(err, TesseraError::ReadOnlyViolation(_)));

        let count = session.execute_query("SELECT COUNT(*) FROM items").await.unwrap();
        assert_eq!(count.scalar_i64(), Some(2));
    }

    #[tokio::test]
    async fn test_pending_changes_rejected() {
        let (_manager, session) = open(true).await;
        let err = session
            .execute_pending_changes(&rename_first())
            .await
            .unwrap_err();
        assert!(matches!(err, TesseraError::ReadOnlyViolation(_)));
        assert!(err.is_rejected_locally());
    }

    #[tokio::test]
    async fn test_writable_session_accepts_mutation() {
        let (_manager, session) = open(false).await;
        let summary = session
            .execute_dml_statement("DELETE FROM items WHERE id = 2")
            .await
            .unwrap();
        assert_eq!(summary.affected_rows, 1);
    }
}

// ============================================================================
// Commit Gate Tests
// ============================================================================

mod commit_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_commit_applies_change_set() {
        let (_manager, session) = open(false).await;

        let mut changes = ChangeSet::new();
        let second = RowIdentity::key(vec![PrimaryKeyInfo::new("id", Value::Int64(2))]);
        changes.record_delete("", "items", &second).unwrap();
        changes.record_insert(
            "",
            "items",
            vec![CellValue::new("id", Value::Int64(9)), CellValue::new("label", "ninth")],
        );

        let summary = session
            .execute_pending_changes(&changes.to_changes())
            .await
            .unwrap();
        assert_eq!(summary.affected_rows, 2);

        let ids = session.execute_query("SELECT id FROM items ORDER BY id").await.unwrap();
        let ids: Vec<Option<i64>> = ids.rows.iter().map(|r| r.get(0).and_then(|v| v.as_i64())).collect();
        assert_eq!(ids, vec![Some(1), Some(9)]);
    }

    #[tokio::test]
    async fn test_second_commit_while_one_in_flight_is_rejected() {
        let (_manager, session) = open(false).await;

        let _in_flight = session.commit_gate.try_lock().unwrap();
        let err = session
            .execute_pending_changes(&rename_first())
            .await
            .unwrap_err();
        assert!(matches!(err, TesseraError::CommitInProgress));
    }

    #[tokio::test]
    async fn test_gate_reopens_after_commit() {
        let (_manager, session) = open(false).await;
        session.execute_pending_changes(&rename_first()).await.unwrap();
        session.execute_pending_changes(&rename_first()).await.unwrap();
    }

    #[tokio::test]
    async fn test_preview_lists_literal_sql_in_order() {
        let (_manager, session) = open(false).await;
        let mut changes = rename_first();
        changes.push(DmlChange::delete(
            "",
            "items",
            vec![PrimaryKeyInfo::new("id", Value::Int64(2))],
        ));
        assert_eq!(
            session.preview(&changes).unwrap(),
            vec![
                "UPDATE \"items\" SET \"label\" = 'renamed' WHERE \"id\" = 1".to_string(),
                "DELETE FROM \"items\" WHERE \"id\" = 2".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_cancelled_session_refuses_work() {
        let (_manager, session) = open(false).await;
        session.lifetime().cancel();
        let err = session
            .execute_pending_changes(&rename_first())
            .await
            .unwrap_err();
        assert!(matches!(err, TesseraError::Cancelled));
    }
}
