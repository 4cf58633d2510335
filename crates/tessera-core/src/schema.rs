//! Schema introspection traits and types

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Catalog access for a relational connection.
///
/// `database` is the namespace the backend groups tables under: the database
/// for MySQL, the schema for Postgres and SQL Server. SQLite ignores it.
#[async_trait]
pub trait SchemaIntrospection: Send + Sync {
    /// List all databases
    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>>;

    /// List all tables in a database
    async fn list_tables(&self, database: &str) -> Result<Vec<TableInfo>>;

    /// Get columns for a table
    async fn get_columns(&self, database: &str, table: &str) -> Result<Vec<ColumnInfo>>;

    /// Get indexes for a table
    async fn get_indexes(&self, database: &str, table: &str) -> Result<Vec<IndexInfo>>;

    /// Get foreign keys for a table
    async fn get_foreign_keys(&self, database: &str, table: &str)
    -> Result<Vec<ForeignKeyInfo>>;

    /// Get constraints for a table
    async fn get_constraints(&self, database: &str, table: &str)
    -> Result<Vec<ConstraintInfo>>;

    /// Primary key columns in key order. Empty when the table has no key.
    async fn get_primary_key_columns(&self, database: &str, table: &str) -> Result<Vec<String>>;
}

/// Database information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub name: String,
}

impl DatabaseInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Table information (basic)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub database: Option<String>,
    pub name: String,
    pub table_type: TableType,
}

/// Table type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableType {
    Table,
    View,
}

impl TableType {
    pub fn from_catalog(kind: &str) -> Self {
        if kind.to_ascii_uppercase().contains("VIEW") {
            TableType::View
        } else {
            TableType::Table
        }
    }
}

/// Column information
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ColumnInfo {
    pub name: String,
    pub ordinal: usize,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub is_primary_key: bool,
}

/// Index information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
}

/// Foreign key information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub on_update: ForeignKeyAction,
    pub on_delete: ForeignKeyAction,
}

/// Foreign key action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForeignKeyAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ForeignKeyAction {
    /// Parse the action text catalogs report (`CASCADE`, `SET NULL`, ...).
    pub fn parse(action: &str) -> Self {
        match action.trim().to_uppercase().replace('_', " ").as_str() {
            "CASCADE" => ForeignKeyAction::Cascade,
            "SET NULL" => ForeignKeyAction::SetNull,
            "SET DEFAULT" => ForeignKeyAction::SetDefault,
            "RESTRICT" => ForeignKeyAction::Restrict,
            _ => ForeignKeyAction::NoAction,
        }
    }
}

/// Constraint information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintInfo {
    pub name: String,
    pub constraint_type: ConstraintType,
    pub columns: Vec<String>,
    pub definition: Option<String>,
}

/// Constraint type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintType {
    PrimaryKey,
    ForeignKey,
    Unique,
    Check,
}

impl ConstraintType {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.trim().to_uppercase().as_str() {
            "PRIMARY KEY" | "P" => Some(ConstraintType::PrimaryKey),
            "FOREIGN KEY" | "F" => Some(ConstraintType::ForeignKey),
            "UNIQUE" | "U" => Some(ConstraintType::Unique),
            "CHECK" | "C" => Some(ConstraintType::Check),
            _ => None,
        }
    }
}

/// Fold (name, type, column, definition) rows into constraints, keeping
/// catalog order of both constraints and their columns.
pub fn group_constraint_rows(
    rows: impl IntoIterator<Item = (String, String, Option<String>, Option<String>)>,
) -> Vec<ConstraintInfo> {
    let mut grouped: Vec<ConstraintInfo> = Vec::new();
    for (name, kind, column, definition) in rows {
        let Some(constraint_type) = ConstraintType::parse(&kind) else {
            continue;
        };
        match grouped.iter_mut().find(|c| c.name == name) {
            Some(existing) => {
                if let Some(column) = column
                    && !existing.columns.contains(&column)
                {
                    existing.columns.push(column);
                }
            }
            None => grouped.push(ConstraintInfo {
                name,
                constraint_type,
                columns: column.into_iter().collect(),
                definition,
            }),
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_rows_group_by_name() {
        let rows = vec![
            ("pk_orders".to_string(), "PRIMARY KEY".to_string(), Some("tenant_id".to_string()), None),
            ("pk_orders".to_string(), "PRIMARY KEY".to_string(), Some("order_id".to_string()), None),
            ("chk_total".to_string(), "CHECK".to_string(), None, Some("total >= 0".to_string())),
            ("ignored".to_string(), "EXCLUDE".to_string(), None, None),
        ];
        let grouped = group_constraint_rows(rows);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].columns, vec!["tenant_id", "order_id"]);
        assert_eq!(grouped[1].constraint_type, ConstraintType::Check);
        assert_eq!(grouped[1].definition.as_deref(), Some("total >= 0"));
    }

    #[test]
    fn foreign_key_actions_parse() {
        assert_eq!(ForeignKeyAction::parse("cascade"), ForeignKeyAction::Cascade);
        assert_eq!(ForeignKeyAction::parse("SET_NULL"), ForeignKeyAction::SetNull);
        assert_eq!(ForeignKeyAction::parse("whatever"), ForeignKeyAction::NoAction);
    }
}
