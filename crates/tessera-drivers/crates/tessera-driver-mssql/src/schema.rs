//! SQL Server schema introspection
//!
//! The `database` argument names a schema; an empty one means `dbo`.

use async_trait::async_trait;
use tessera_core::{
    ColumnInfo, ConstraintInfo, Connection, DatabaseInfo, ForeignKeyAction, ForeignKeyInfo,
    IndexInfo, Result, Row, SchemaIntrospection, TableInfo, TableType, Value,
    group_constraint_rows,
};

use crate::MssqlConnection;

const DEFAULT_SCHEMA: &str = "dbo";

pub(crate) fn schema_name(database: &str) -> &str {
    if database.is_empty() {
        DEFAULT_SCHEMA
    } else {
        database
    }
}

fn text(row: &Row, idx: usize) -> String {
    opt_text(row, idx).unwrap_or_default()
}

fn opt_text(row: &Row, idx: usize) -> Option<String> {
    row.get(idx).and_then(|v| v.as_str()).map(str::to_string)
}

fn flag(row: &Row, idx: usize) -> bool {
    row.get(idx).and_then(|v| v.as_bool()).unwrap_or(false)
}

impl MssqlConnection {
    async fn catalog_query(&self, sql: &str, database: &str, table: &str) -> Result<Vec<Row>> {
        Ok(self
            .query(
                sql,
                &[Value::from(schema_name(database)), Value::from(table)],
            )
            .await?
            .rows)
    }
}

#[async_trait]
impl SchemaIntrospection for MssqlConnection {
    /// Lists schemas that own at least one table or view.
    #[tracing::instrument(skip(self))]
    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        let result = self
            .query(
                "SELECT DISTINCT TABLE_SCHEMA FROM INFORMATION_SCHEMA.TABLES ORDER BY TABLE_SCHEMA",
                &[],
            )
            .await?;
        Ok(result
            .rows
            .iter()
            .map(|row| DatabaseInfo::new(text(row, 0)))
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn list_tables(&self, database: &str) -> Result<Vec<TableInfo>> {
        let schema = schema_name(database);
        let result = self
            .query(
                "SELECT TABLE_NAME, TABLE_TYPE FROM INFORMATION_SCHEMA.TABLES \
                 WHERE TABLE_SCHEMA = @P1 ORDER BY TABLE_NAME",
                &[Value::from(schema)],
            )
            .await?;

        let tables: Vec<TableInfo> = result
            .rows
            .iter()
            .map(|row| TableInfo {
                database: Some(schema.to_string()),
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
                "SELECT c.COLUMN_NAME, c.ORDINAL_POSITION, c.DATA_TYPE, c.IS_NULLABLE, c.COLUMN_DEFAULT, \
                 CAST(CASE WHEN k.COLUMN_NAME IS NULL THEN 0 ELSE 1 END AS BIT) \
                 FROM INFORMATION_SCHEMA.COLUMNS c \
                 LEFT JOIN ( \
                   SELECT ku.TABLE_SCHEMA, ku.TABLE_NAME, ku.COLUMN_NAME \
                   FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
                   JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE ku \
                     ON ku.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA AND ku.CONSTRAINT_NAME = tc.CONSTRAINT_NAME \
                   WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY' \
                 ) k ON k.TABLE_SCHEMA = c.TABLE_SCHEMA AND k.TABLE_NAME = c.TABLE_NAME AND k.COLUMN_NAME = c.COLUMN_NAME \
                 WHERE c.TABLE_SCHEMA = @P1 AND c.TABLE_NAME = @P2 ORDER BY c.ORDINAL_POSITION",
                database,
                table,
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| ColumnInfo {
                name: text(row, 0),
                ordinal: row.get(1).and_then(|v| v.as_i64()).unwrap_or(0) as usize,
                data_type: text(row, 2),
                nullable: text(row, 3) == "YES",
                default_value: opt_text(row, 4),
                is_primary_key: flag(row, 5),
            })
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn get_indexes(&self, database: &str, table: &str) -> Result<Vec<IndexInfo>> {
        let rows = self
            .catalog_query(
                "SELECT i.name, i.is_unique, i.is_primary_key, c.name \
                 FROM sys.indexes i \
                 JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id \
                 JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id \
                 WHERE i.object_id = OBJECT_ID(QUOTENAME(@P1) + '.' + QUOTENAME(@P2)) \
                   AND i.name IS NOT NULL AND ic.is_included_column = 0 \
                 ORDER BY i.name, ic.key_ordinal",
                database,
                table,
            )
            .await?;

        let mut indexes: Vec<IndexInfo> = Vec::new();
        for row in &rows {
            let name = text(row, 0);
            let column = text(row, 3);
            match indexes.iter_mut().find(|i| i.name == name) {
                Some(index) => index.columns.push(column),
                None => indexes.push(IndexInfo {
                    name,
                    columns: vec![column],
                    is_unique: flag(row, 1),
                    is_primary: flag(row, 2),
                }),
            }
        }
        Ok(indexes)
    }

    #[tracing::instrument(skip(self))]
    async fn get_foreign_keys(&self, database: &str, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        let rows = self
            .catalog_query(
                "SELECT fk.name, OBJECT_NAME(fk.referenced_object_id), pc.name, rc.name, \
                 fk.update_referential_action_desc, fk.delete_referential_action_desc \
                 FROM sys.foreign_keys fk \
                 JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id \
                 JOIN sys.columns pc ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id \
                 JOIN sys.columns rc ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id \
                 WHERE fk.parent_object_id = OBJECT_ID(QUOTENAME(@P1) + '.' + QUOTENAME(@P2)) \
                 ORDER BY fk.name, fkc.constraint_column_id",
                database,
                table,
            )
            .await?;

        // Actions arrive as NO_ACTION, SET_NULL and so on
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
                "SELECT tc.CONSTRAINT_NAME, tc.CONSTRAINT_TYPE, ku.COLUMN_NAME, cc.CHECK_CLAUSE \
                 FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
                 LEFT JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE ku \
                   ON ku.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA AND ku.CONSTRAINT_NAME = tc.CONSTRAINT_NAME \
                 LEFT JOIN INFORMATION_SCHEMA.CHECK_CONSTRAINTS cc \
                   ON cc.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA AND cc.CONSTRAINT_NAME = tc.CONSTRAINT_NAME \
                 WHERE tc.TABLE_SCHEMA = @P1 AND tc.TABLE_NAME = @P2 \
                 ORDER BY tc.CONSTRAINT_NAME, ku.ORDINAL_POSITION",
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
                "SELECT ku.COLUMN_NAME \
                 FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
                 JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE ku \
                   ON ku.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA AND ku.CONSTRAINT_NAME = tc.CONSTRAINT_NAME \
                 WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY' AND tc.TABLE_SCHEMA = @P1 AND tc.TABLE_NAME = @P2 \
                 ORDER BY ku.ORDINAL_POSITION",
                database,
                table,
            )
            .await?;
        Ok(rows.iter().map(|row| text(row, 0)).collect())
    }
}
