//! Unit tests for the query builder

use super::*;
use crate::dialect::tests::AnsiDialect;
use crate::{SqlDialect, TesseraError, Value};

/// `$n` placeholders and schema-qualified tables
struct NumberedDialect;

impl SqlDialect for NumberedDialect {
    fn name(&self) -> &'static str {
        "numbered"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn bool_literal(&self, value: bool) -> String {
        if value { "TRUE" } else { "FALSE" }.to_string()
    }
}

/// Substitute literals for placeholders, turning an executable statement
/// into what its preview should be.
fn inline(statement: &Statement, dialect: &dyn SqlDialect) -> String {
    let mut sql = statement.sql.clone();
    if dialect.placeholder(1) == dialect.placeholder(2) {
        for param in &statement.params {
            sql = sql.replacen(&dialect.placeholder(1), &dialect.literal(param), 1);
        }
    } else {
        for (index, param) in statement.params.iter().enumerate().rev() {
            sql = sql.replace(&dialect.placeholder(index + 1), &dialect.literal(param));
        }
    }
    sql
}

fn composite_key() -> Vec<PrimaryKeyInfo> {
    vec![
        PrimaryKeyInfo::new("tenant_id", "acme"),
        PrimaryKeyInfo::new("order_id", Value::Int64(42)),
    ]
}

// ============================================================================
// Statement Shape Tests
// ============================================================================

mod statement_shape_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_binds_each_value() {
        let change = DmlChange::insert(
            "main",
            "users",
            vec![CellValue::new("name", "ada"), CellValue::new("age", Value::Int64(36))],
        );
        let statement = QueryBuilder::new(&AnsiDialect).build(&change).unwrap();
        assert_eq!(statement.sql, "INSERT INTO \"users\" (\"name\", \"age\") VALUES (?, ?)");
        assert_eq!(
            statement.params,
            vec![Value::String("ada".into()), Value::Int64(36)]
        );
    }

    #[test]
    fn test_insert_without_values_uses_defaults() {
        let change = DmlChange::insert("main", "users", vec![]);
        let statement = QueryBuilder::new(&AnsiDialect).build(&change).unwrap();
        assert_eq!(statement.sql, "INSERT INTO \"users\" DEFAULT VALUES");
        assert!(statement.params.is_empty());
    }

    #[test]
    fn test_update_ands_every_key_column() {
        let change = DmlChange::update(
            "sales",
            "orders",
            composite_key(),
            vec![CellValue::new("status", "shipped")],
        );
        let statement = QueryBuilder::new(&NumberedDialect).build(&change).unwrap();
        assert_eq!(
            statement.sql,
            "UPDATE \"sales\".\"orders\" SET \"status\" = $1 WHERE \"tenant_id\" = $2 AND \"order_id\" = $3"
        );
        assert_eq!(statement.params.len(), 3);
    }

    #[test]
    fn test_delete_ands_every_key_column() {
        let change = DmlChange::delete("sales", "orders", composite_key());
        let sql = QueryBuilder::new(&NumberedDialect).preview(&change).unwrap();
        assert_eq!(
            sql,
            "DELETE FROM \"sales\".\"orders\" WHERE \"tenant_id\" = 'acme' AND \"order_id\" = 42"
        );
    }

    #[test]
    fn test_null_and_default_cells_are_inlined() {
        let change = DmlChange::update(
            "main",
            "users",
            vec![PrimaryKeyInfo::new("id", Value::Int64(1))],
            vec![CellValue::null("email"), CellValue::default_value("created_at")],
        );
        let statement = QueryBuilder::new(&AnsiDialect).build(&change).unwrap();
        assert_eq!(
            statement.sql,
            "UPDATE \"users\" SET \"email\" = NULL, \"created_at\" = DEFAULT WHERE \"id\" = ?"
        );
        assert_eq!(statement.params, vec![Value::Int64(1)]);
    }

    #[test]
    fn test_empty_cell_is_empty_string() {
        let change = DmlChange::insert("main", "users", vec![CellValue::empty("nick")]);
        let sql = QueryBuilder::new(&AnsiDialect).preview(&change).unwrap();
        assert_eq!(sql, "INSERT INTO \"users\" (\"nick\") VALUES ('')");
    }

    #[test]
    fn test_null_key_value_uses_is_null() {
        let change = DmlChange::delete(
            "main",
            "pairs",
            vec![
                PrimaryKeyInfo::new("a", Value::Int64(1)),
                PrimaryKeyInfo::new("b", Value::Null),
            ],
        );
        let statement = QueryBuilder::new(&AnsiDialect).build(&change).unwrap();
        assert_eq!(statement.sql, "DELETE FROM \"pairs\" WHERE \"a\" = ? AND \"b\" IS NULL");
        assert_eq!(statement.params, vec![Value::Int64(1)]);
    }
}

// ============================================================================
// Rejection Tests
// ============================================================================

mod rejection_tests {
    use super::*;

    #[test]
    fn test_update_without_key_is_missing_primary_key() {
        let change = DmlChange::update("main", "log", vec![], vec![CellValue::new("msg", "x")]);
        let err = QueryBuilder::new(&AnsiDialect).build(&change).unwrap_err();
        assert!(matches!(err, TesseraError::MissingPrimaryKey { ref table } if table == "log"));
    }

    #[test]
    fn test_delete_without_key_is_missing_primary_key() {
        let change = DmlChange::delete("main", "log", vec![]);
        let err = QueryBuilder::new(&AnsiDialect).preview(&change).unwrap_err();
        assert!(matches!(err, TesseraError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn test_update_without_values_is_invalid() {
        let change = DmlChange::update("main", "users", composite_key(), vec![]);
        let err = QueryBuilder::new(&AnsiDialect).build(&change).unwrap_err();
        assert!(matches!(err, TesseraError::InvalidChange(_)));
    }
}

// ============================================================================
// Preview/Execute Equivalence Tests
// ============================================================================

mod equivalence_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn changes() -> Vec<DmlChange> {
        vec![
            DmlChange::insert(
                "sales",
                "orders",
                vec![
                    CellValue::new("tenant_id", "acme"),
                    CellValue::new("note", "it's fine"),
                    CellValue::new("blob", Value::Bytes(vec![0x01, 0xff])),
                    CellValue::new("paid", Value::Bool(true)),
                    CellValue::null("shipped_at"),
                ],
            ),
            DmlChange::update(
                "sales",
                "orders",
                composite_key(),
                vec![
                    CellValue::new("note", "O'Brien"),
                    CellValue::default_value("status"),
                    CellValue::new("total", Value::Decimal("19.99".into())),
                ],
            ),
            DmlChange::delete("sales", "orders", composite_key()),
        ]
    }

    #[test]
    fn test_preview_matches_bound_statement() {
        let dialects: [&dyn SqlDialect; 2] = [&AnsiDialect, &NumberedDialect];
        for dialect in dialects {
            let builder = QueryBuilder::new(dialect);
            for change in changes() {
                let statement = builder.build(&change).unwrap();
                let preview = builder.preview(&change).unwrap();
                assert_eq!(inline(&statement, dialect), preview, "{}", dialect.name());
            }
        }
    }

    #[test]
    fn test_preview_escapes_quotes() {
        let preview = QueryBuilder::new(&AnsiDialect)
            .preview(&changes()[1])
            .unwrap();
        assert!(preview.contains("'O''Brien'"));
        assert!(preview.contains("\"status\" = DEFAULT"));
        assert!(preview.contains("\"total\" = 19.99"));
    }

    #[test]
    fn test_preview_hex_encodes_bytes() {
        let preview = QueryBuilder::new(&AnsiDialect)
            .preview(&changes()[0])
            .unwrap();
        assert!(preview.contains("X'01ff'"));
        assert!(preview.contains("NULL)"));
    }
}
