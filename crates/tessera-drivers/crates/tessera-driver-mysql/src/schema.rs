//! MySQL schema introspection via information_schema

use async_trait::async_trait;
use tessera_core::{
    ColumnInfo, ConstraintInfo, Connection, DatabaseInfo, ForeignKeyAction, ForeignKeyInfo,
    IndexInfo, Result, Row, SchemaIntrospection, TableInfo, TableType, Value,
    group_constraint_rows,
};

use crate::MySqlConnection;

const SYSTEM_SCHEMAS: [&str; 4] = ["information_schema", "mysql", "performance_schema", "sys"];

fn text(row: &Row, idx: usize) -> String {
    opt_text(row, idx).unwrap_or_default()
}

/// Some catalog columns are reported with the binary charset.
fn opt_text(row: &Row, idx: usize) -> Option<String> {
    match row.get(idx)? {
        Value::Null => None,
        Value::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        other => Some(other.to_string()),
    }
}

fn int(row: &Row, idx: usize) -> i64 {
    row.get(idx).and_then(|v| v.as_i64()).unwrap_or(0)
}

impl MySqlConnection {
    async fn catalog_query(&self, sql: &str, database: &str, table: &str) -> Result<Vec<Row>> {
        let database = self.resolve_database(database)?;
        Ok(self
            .query(sql, &[Value::from(database), Value::from(table)])
            .await?
            .rows)
    }
}

#[async_trait]
impl SchemaIntrospection for MySqlConnection {
    #[tracing::instrument(skip(self))]
    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        let result = self
            .query(
                "SELECT SCHEMA_NAME FROM information_schema.SCHEMATA ORDER BY SCHEMA_NAME",
                &[],
            )
            .await?;
        Ok(result
            .rows
            .iter()
            .map(|row| text(row, 0))
            .filter(|name| !SYSTEM_SCHEMAS.contains(&name.as_str()))
            .map(DatabaseInfo::new)
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn list_tables(&self, database: &str) -> Result<Vec<TableInfo>> {
        let database = self.resolve_database(database)?;
        let result = self
            .query(
                "SELECT TABLE_NAME, TABLE_TYPE FROM information_schema.TABLES \
                 WHERE TABLE_SCHEMA = ? ORDER BY TABLE_NAME",
                &[Value::from(database.as_str())],
            )
            .await?;

        let tables: Vec<TableInfo> = result
            .rows
            .iter()
            .map(|row| TableInfo {
                database: Some(database.clone()),
                name: text(row, 0),
                table_type: TableType::from_catalog(&text(row, 1)),
            })
            .collect();
        tracing::debug!(table_count = tables.len(), "tables listed");
        Ok(tables)
    }

    #[tracing::instrument(skip(self))]
    async fn get_columns(&self, database: &str, table: &str) -> Result<Vec<ColumnInfo>> {
        let rows = self
            .catalog_query(
                "SELECT COLUMN_NAME, ORDINAL_POSITION, COLUMN_TYPE, IS_NULLABLE, COLUMN_DEFAULT, COLUMN_KEY \
                 FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION",
                database,
                table,
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| ColumnInfo {
                name: text(row, 0),
                ordinal: int(row, 1) as usize,
                data_type: text(row, 2),
                nullable: text(row, 3) == "YES",
                default_value: opt_text(row, 4),
                is_primary_key: text(row, 5) == "PRI",
            })
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn get_indexes(&self, database: &str, table: &str) -> Result<Vec<IndexInfo>> {
        let rows = self
            .catalog_query(
                "SELECT INDEX_NAME, NON_UNIQUE, COLUMN_NAME FROM information_schema.STATISTICS \
                 WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? ORDER BY INDEX_NAME, SEQ_IN_INDEX",
                database,
                table,
            )
            .await?;

        let mut indexes: Vec<IndexInfo> = Vec::new();
        for row in &rows {
            let name = text(row, 0);
            // Functional key parts have no column name
            let column = opt_text(row, 2);
            match indexes.iter_mut().find(|i| i.name == name) {
                Some(index) => index.columns.extend(column),
                None => indexes.push(IndexInfo {
                    is_primary: name == "PRIMARY",
                    is_unique: int(row, 1) == 0,
                    name,
                    columns: column.into_iter().collect(),
                }),
            }
        }
        Ok(indexes)
    }

    #[tracing::instrument(skip(self))]
    async fn get_foreign_keys(&self, database: &str, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        let rows = self
            .catalog_query(
                "SELECT k.CONSTRAINT_NAME, k.REFERENCED_TABLE_NAME, k.COLUMN_NAME, k.REFERENCED_COLUMN_NAME, \
                 r.UPDATE_RULE, r.DELETE_RULE \
                 FROM information_schema.KEY_COLUMN_USAGE k \
                 JOIN information_schema.REFERENTIAL_CONSTRAINTS r \
                   ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME \
                 WHERE k.TABLE_SCHEMA = ? AND k.TABLE_NAME = ? AND k.REFERENCED_TABLE_NAME IS NOT NULL \
                 ORDER BY k.CONSTRAINT_NAME, k.ORDINAL_POSITION",
                database,
                table,
            )
            .await?;

        let mut keys: Vec<ForeignKeyInfo> = Vec::new();
        for row in &rows {
            let name = text(row, 0);
            match keys.iter_mut().find(|fk| fk.name == name) {
                Some(fk) => {
                    fk.columns.push(text(row, 2));
                    fk.referenced_columns.push(text(row, 3));
                }
                None => keys.push(ForeignKeyInfo {
                    name,
                    referenced_table: text(row, 1),
                    columns: vec![text(row, 2)],
                    referenced_columns: vec![text(row, 3)],
                    on_update: ForeignKeyAction::parse(&text(row, 4)),
                    on_delete: ForeignKeyAction::parse(&text(row, 5)),
                }),
            }
        }
        Ok(keys)
    }

    #[tracing::instrument(skip(self))]
    async fn get_constraints(&self, database: &str, table: &str) -> Result<Vec<ConstraintInfo>> {
        let rows = self
            .catalog_query(
                "SELECT tc.CONSTRAINT_NAME, tc.CONSTRAINT_TYPE, k.COLUMN_NAME, NULL \
                 FROM information_schema.TABLE_CONSTRAINTS tc \
                 LEFT JOIN information_schema.KEY_COLUMN_USAGE k \
                   ON k.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA \
                  AND k.TABLE_NAME = tc.TABLE_NAME \
                  AND k.CONSTRAINT_NAME = tc.CONSTRAINT_NAME \
                 WHERE tc.TABLE_SCHEMA = ? AND tc.TABLE_NAME = ? \
                 ORDER BY tc.CONSTRAINT_NAME, k.ORDINAL_POSITION",
                database,
                table,
            )
            .await?;

        Ok(group_constraint_rows(rows.iter().map(|row| {
            (text(row, 0), text(row, 1), opt_text(row, 2), opt_text(row, 3))
        })))
    }

    #[tracing::instrument(skip(self))]
    async fn get_primary_key_columns(&self, database: &str, table: &str) -> Result<Vec<String>> {
        let rows = self
            .catalog_query(
                "SELECT COLUMN_NAME FROM information_schema.KEY_COLUMN_USAGE \
                 WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY' \
                 ORDER BY ORDINAL_POSITION",
                database,
                table,
            )
            .await?;
        Ok(rows.iter().map(|row| text(row, 0)).collect())
    }
}
