//! PostgreSQL schema introspection
//!
//! The `database` argument names a schema; an empty one means `public`.
//! Catalog columns are cast to `text` so they decode without domain types.

use async_trait::async_trait;
use tessera_core::{
    ColumnInfo, ConstraintInfo, Connection, DatabaseInfo, ForeignKeyAction, ForeignKeyInfo,
    IndexInfo, Result, Row, SchemaIntrospection, TableInfo, TableType, Value,
    group_constraint_rows,
};

use crate::PostgresConnection;

const DEFAULT_SCHEMA: &str = "public";

fn schema_name(database: &str) -> &str {
    if database.is_empty() {
        DEFAULT_SCHEMA
    } else {
        database
    }
}

fn text(row: &Row, idx: usize) -> String {
    row.get(idx)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn opt_text(row: &Row, idx: usize) -> Option<String> {
    row.get(idx).and_then(|v| v.as_str()).map(str::to_string)
}

fn flag(row: &Row, idx: usize) -> bool {
    row.get(idx).and_then(|v| v.as_bool()).unwrap_or(false)
}

/// `pg_constraint.confupdtype` / `confdeltype` codes
fn fk_action(code: &str) -> ForeignKeyAction {
    match code {
        "r" => ForeignKeyAction::Restrict,
        "c" => ForeignKeyAction::Cascade,
        "n" => ForeignKeyAction::SetNull,
        "d" => ForeignKeyAction::SetDefault,
        _ => ForeignKeyAction::NoAction,
    }
}

impl PostgresConnection {
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
impl SchemaIntrospection for PostgresConnection {
    /// Lists schemas, which are the namespaces tables live in.
    #[tracing::instrument(skip(self))]
    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        let result = self
            .query(
                "SELECT schema_name::text FROM information_schema.schemata \
                 WHERE schema_name NOT IN ('pg_catalog', 'information_schema') \
                 AND schema_name NOT LIKE 'pg_toast%' AND schema_name NOT LIKE 'pg_temp%' \
                 ORDER BY schema_name",
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
                "SELECT table_name::text, table_type::text FROM information_schema.tables \
                 WHERE table_schema = $1 ORDER BY table_name",
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
        let key = self.get_primary_key_columns(database, table).await?;
        let rows = self
            .catalog_query(
                "SELECT column_name::text, ordinal_position::int4, data_type::text, \
                 is_nullable::text, column_default::text \
                 FROM information_schema.columns \
                 WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position",
                database,
                table,
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name = text(row, 0);
                ColumnInfo {
                    is_primary_key: key.contains(&name),
                    name,
                    ordinal: row.get(1).and_then(|v| v.as_i64()).unwrap_or(0) as usize,
                    data_type: text(row, 2),
                    nullable: text(row, 3) == "YES",
                    default_value: opt_text(row, 4),
                }
            })
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn get_indexes(&self, database: &str, table: &str) -> Result<Vec<IndexInfo>> {
        let rows = self
            .catalog_query(
                "SELECT ic.relname::text, i.indisunique, i.indisprimary, a.attname::text \
                 FROM pg_index i \
                 JOIN pg_class t ON t.oid = i.indrelid \
                 JOIN pg_class ic ON ic.oid = i.indexrelid \
                 JOIN pg_namespace n ON n.oid = t.relnamespace \
                 CROSS JOIN LATERAL unnest(i.indkey) WITH ORDINALITY AS k(attnum, ord) \
                 LEFT JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum \
                 WHERE n.nspname = $1 AND t.relname = $2 \
                 ORDER BY ic.relname, k.ord",
                database,
                table,
            )
            .await?;

        let mut indexes: Vec<IndexInfo> = Vec::new();
        for row in &rows {
            let name = text(row, 0);
            // Expression columns have no attribute name
            let column = opt_text(row, 3);
            match indexes.iter_mut().find(|i| i.name == name) {
                Some(index) => index.columns.extend(column),
                None => indexes.push(IndexInfo {
                    name,
                    columns: column.into_iter().collect(),
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
                "SELECT con.conname::text, rt.relname::text, a.attname::text, ra.attname::text, \
                 con.confupdtype::text, con.confdeltype::text \
                 FROM pg_constraint con \
                 JOIN pg_class t ON t.oid = con.conrelid \
                 JOIN pg_namespace n ON n.oid = t.relnamespace \
                 JOIN pg_class rt ON rt.oid = con.confrelid \
                 CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, refnum, ord) \
                 JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum \
                 JOIN pg_attribute ra ON ra.attrelid = con.confrelid AND ra.attnum = k.refnum \
                 WHERE con.contype = 'f' AND n.nspname = $1 AND t.relname = $2 \
                 ORDER BY con.conname, k.ord",
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
                    on_update: fk_action(&text(row, 4)),
                    on_delete: fk_action(&text(row, 5)),
                }),
            }
        }
        Ok(keys)
    }

    #[tracing::instrument(skip(self))]
    async fn get_constraints(&self, database: &str, table: &str) -> Result<Vec<ConstraintInfo>> {
        let rows = self
            .catalog_query(
                "SELECT con.conname::text, con.contype::text, a.attname::text, \
                 pg_get_constraintdef(con.oid) \
                 FROM pg_constraint con \
                 JOIN pg_class t ON t.oid = con.conrelid \
                 JOIN pg_namespace n ON n.oid = t.relnamespace \
                 LEFT JOIN LATERAL unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord) ON true \
                 LEFT JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum \
                 WHERE n.nspname = $1 AND t.relname = $2 \
                 ORDER BY con.conname, k.ord",
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
        // indkey is in key order, not column order
        let rows = self
            .catalog_query(
                "SELECT a.attname::text \
                 FROM pg_index i \
                 JOIN pg_class t ON t.oid = i.indrelid \
                 JOIN pg_namespace n ON n.oid = t.relnamespace \
                 CROSS JOIN LATERAL unnest(i.indkey) WITH ORDINALITY AS k(attnum, ord) \
                 JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum \
                 WHERE i.indisprimary AND n.nspname = $1 AND t.relname = $2 \
                 ORDER BY k.ord",
                database,
                table,
            )
            .await?;
        Ok(rows.iter().map(|row| text(row, 0)).collect())
    }
}
