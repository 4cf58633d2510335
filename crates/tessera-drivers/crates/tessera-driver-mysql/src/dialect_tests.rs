//! Unit tests for the MySQL dialect

use super::*;
use pretty_assertions::assert_eq;
use tessera_core::dml::{CellValue, DmlChange, PrimaryKeyInfo, QueryBuilder};
use tessera_core::{SqlDialect, Value};

#[test]
fn test_identifiers_use_backticks() {
    assert_eq!(MYSQL_DIALECT.quote_identifier("order"), "`order`");
    assert_eq!(MYSQL_DIALECT.quote_identifier("a`b"), "`a``b`");
    assert_eq!(MYSQL_DIALECT.qualify("shop", "order"), "`shop`.`order`");
}

#[test]
fn test_string_literals_escape_backslashes() {
    assert_eq!(
        MYSQL_DIALECT.literal(&Value::String("C:\\tmp\\it's".into())),
        "'C:\\\\tmp\\\\it''s'"
    );
}

#[test]
fn test_empty_insert() {
    let stmt = QueryBuilder::new(&MYSQL_DIALECT)
        .build(&DmlChange::insert("shop", "orders", vec![]))
        .unwrap();
    assert_eq!(stmt.sql, "INSERT INTO `shop`.`orders` () VALUES ()");
    assert!(stmt.params.is_empty());
}

#[test]
fn test_delete_and_preview() {
    let change = DmlChange::delete(
        "shop",
        "orders",
        vec![PrimaryKeyInfo::new("id", Value::Int64(9))],
    );
    let builder = QueryBuilder::new(&MYSQL_DIALECT);

    let stmt = builder.build(&change).unwrap();
    assert_eq!(stmt.sql, "DELETE FROM `shop`.`orders` WHERE `id` = ?");
    assert_eq!(stmt.params, vec![Value::Int64(9)]);

    assert_eq!(
        builder.preview(&change).unwrap(),
        "DELETE FROM `shop`.`orders` WHERE `id` = 9"
    );
}

#[test]
fn test_default_keyword_is_inlined() {
    let change = DmlChange::insert(
        "shop",
        "orders",
        vec![CellValue::default_value("created_at"), CellValue::new("note", "x")],
    );
    let stmt = QueryBuilder::new(&MYSQL_DIALECT).build(&change).unwrap();
    assert_eq!(
        stmt.sql,
        "INSERT INTO `shop`.`orders` (`created_at`, `note`) VALUES (DEFAULT, ?)"
    );
    assert_eq!(stmt.params, vec![Value::String("x".into())]);
}
