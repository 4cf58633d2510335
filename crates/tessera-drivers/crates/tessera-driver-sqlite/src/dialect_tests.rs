//! Unit tests for the SQLite dialect

use super::*;
use pretty_assertions::assert_eq;
use tessera_core::dml::{CellValue, DmlChange, PrimaryKeyInfo, QueryBuilder};
use tessera_core::{SqlDialect, Value};

#[test]
fn test_sqlite_ignores_database_qualifier() {
    assert_eq!(SQLITE_DIALECT.qualify("main", "users"), "\"users\"");
}

#[test]
fn test_sqlite_numbered_placeholders() {
    let change = DmlChange::update(
        "main",
        "users",
        vec![PrimaryKeyInfo::new("id", Value::Int64(1))],
        vec![CellValue::new("name", "ada")],
    );
    let statement = QueryBuilder::new(&SQLITE_DIALECT).build(&change).unwrap();
    assert_eq!(statement.sql, "UPDATE \"users\" SET \"name\" = ?1 WHERE \"id\" = ?2");
}

#[test]
fn test_sqlite_literals() {
    assert_eq!(SQLITE_DIALECT.literal(&Value::Bool(true)), "1");
    assert_eq!(SQLITE_DIALECT.literal(&Value::Bytes(vec![0xca, 0xfe])), "X'cafe'");
    assert_eq!(SQLITE_DIALECT.literal(&Value::String("it's".into())), "'it''s'");
}

#[test]
fn test_sqlite_pagination_and_empty_insert() {
    assert_eq!(SQLITE_DIALECT.paginate(10, 300, false), "LIMIT 300 OFFSET 10");
    assert_eq!(
        SQLITE_DIALECT.empty_insert("\"t\""),
        "INSERT INTO \"t\" DEFAULT VALUES"
    );
}
