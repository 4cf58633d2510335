use super::{DmlChange, QueryBuilder};
use crate::{Connection, DmlSummary, Result};
use std::time::Instant;

/// Apply `changes` in order inside a single transaction.
///
/// Every statement is built before the transaction starts, so a change that
/// cannot be addressed (no primary key, empty update) fails without running
/// anything. The first execution error rolls the whole batch back; if the
/// rollback fails too, both errors are returned together.
#[tracing::instrument(skip(conn, changes), fields(driver = %conn.driver_name(), changes = changes.len()))]
pub async fn execute_pending_changes<C>(conn: &C, changes: &[DmlChange]) -> Result<DmlSummary>
where
    C: Connection + ?Sized,
{
    let start = Instant::now();
    if changes.is_empty() {
        return Ok(DmlSummary {
            affected_rows: 0,
            execution_time_ms: 0,
        });
    }

    let builder = QueryBuilder::new(conn.dialect());
    let statements = changes
        .iter()
        .map(|change| builder.build(change))
        .collect::<Result<Vec<_>>>()?;

    let tx = conn.begin_transaction().await?;
    let mut affected_rows = 0;

    for (index, statement) in statements.iter().enumerate() {
        match tx.execute(&statement.sql, &statement.params).await {
            Ok(result) => affected_rows += result.affected_rows,
            Err(err) => {
                tracing::warn!(index, error = %err, "pending change failed, rolling back");
                return Err(match tx.rollback().await {
                    Ok(()) => err,
                    Err(rollback) => {
                        tracing::error!(error = %rollback, "rollback failed");
                        err.with_rollback_failure(rollback)
                    }
                });
            }
        }
    }

    tx.commit().await?;

    let summary = DmlSummary {
        affected_rows,
        execution_time_ms: start.elapsed().as_millis() as u64,
    };
    tracing::info!(affected_rows, "pending changes committed");
    Ok(summary)
}
