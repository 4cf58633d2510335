use super::PrimaryKeyInfo;
use crate::{Result, Row, TesseraError};

/// Capture the key of a fetched row.
///
/// `key_columns` comes from `get_primary_key_columns` and is in key order.
/// Fails when the table has no key or the row lacks one of its columns,
/// since such a row cannot be addressed by UPDATE or DELETE.
pub fn primary_key_for_row(table: &str, key_columns: &[String], row: &Row) -> Result<Vec<PrimaryKeyInfo>> {
    if key_columns.is_empty() {
        return Err(TesseraError::MissingPrimaryKey {
            table: table.to_string(),
        });
    }

    key_columns
        .iter()
        .map(|name| {
            row.get_by_name(name)
                .map(|value| PrimaryKeyInfo::new(name.clone(), value.clone()))
                .ok_or_else(|| {
                    TesseraError::InvalidChange(format!(
                        "key column '{}' of '{}' is not in the result set",
                        name, table
                    ))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    fn row() -> Row {
        Row::new(
            vec!["order_id".into(), "tenant_id".into(), "note".into()],
            vec![Value::Int64(9), Value::String("acme".into()), Value::Null],
        )
    }

    #[test]
    fn key_follows_column_order_not_row_order() {
        let key = primary_key_for_row("orders", &["tenant_id".into(), "order_id".into()], &row())
            .unwrap();
        assert_eq!(
            key,
            vec![
                PrimaryKeyInfo::new("tenant_id", "acme"),
                PrimaryKeyInfo::new("order_id", Value::Int64(9)),
            ]
        );
    }

    #[test]
    fn keyless_table_is_an_error() {
        let err = primary_key_for_row("log", &[], &row()).unwrap_err();
        assert!(matches!(err, TesseraError::MissingPrimaryKey { ref table } if table == "log"));
    }

    #[test]
    fn key_column_missing_from_projection() {
        let err = primary_key_for_row("orders", &["id".into()], &row()).unwrap_err();
        assert!(matches!(err, TesseraError::InvalidChange(_)));
    }
}
