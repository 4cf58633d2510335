//! Tests for the T-SQL dialect

use super::*;
use pretty_assertions::assert_eq;
use tessera_core::dml::{CellValue, DmlChange, PrimaryKeyInfo, QueryBuilder};
use tessera_core::{RecordsRequest, SqlDialect, Value};

#[test]
fn test_bracket_quoting() {
    assert_eq!(MSSQL_DIALECT.quote_identifier("Order Details"), "[Order Details]");
    assert_eq!(MSSQL_DIALECT.quote_identifier("a]b"), "[a]]b]");
    assert_eq!(MSSQL_DIALECT.qualify("dbo", "users"), "[dbo].[users]");
}

#[test]
fn test_records_without_sort_get_a_neutral_order() {
    let request = RecordsRequest::new("dbo", "users");
    assert_eq!(
        request.select_sql(&MSSQL_DIALECT),
        "SELECT * FROM [dbo].[users] ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 300 ROWS ONLY"
    );
}

#[test]
fn test_records_with_sort() {
    let request = RecordsRequest::new("dbo", "users").sort("name").page(10, 5);
    assert_eq!(
        request.select_sql(&MSSQL_DIALECT),
        "SELECT * FROM [dbo].[users] ORDER BY name OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"
    );
}

#[test]
fn test_update_uses_numbered_parameters() {
    let change = DmlChange::update(
        "dbo",
        "users",
        vec![PrimaryKeyInfo::new("id", Value::Int32(4))],
        vec![CellValue::new("name", "Zoë"), CellValue::new("active", Value::Bool(true))],
    );
    let builder = QueryBuilder::new(&MSSQL_DIALECT);

    let stmt = builder.build(&change).unwrap();
    assert_eq!(
        stmt.sql,
        "UPDATE [dbo].[users] SET [name] = @P1, [active] = @P2 WHERE [id] = @P3"
    );
    assert_eq!(stmt.params.len(), 3);

    assert_eq!(
        builder.preview(&change).unwrap(),
        "UPDATE [dbo].[users] SET [name] = N'Zoë', [active] = 1 WHERE [id] = 4"
    );
}

#[test]
fn test_binary_literal() {
    assert_eq!(MSSQL_DIALECT.literal(&Value::Bytes(vec![0x0a, 0xff])), "0x0aff");
}
