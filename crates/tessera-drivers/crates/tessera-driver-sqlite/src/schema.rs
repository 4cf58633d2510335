//! SQLite schema introspection
//!
//! Everything comes from the `pragma_*` table-valued functions so table
//! names are bound rather than spliced into the SQL.

use async_trait::async_trait;
use tessera_core::{
    ColumnInfo, ConstraintInfo, ConstraintType, Connection, DatabaseInfo, ForeignKeyAction,
    ForeignKeyInfo, IndexInfo, Result, Row, SchemaIntrospection, TableInfo, TableType, Value,
};

use crate::SqliteConnection;

fn text(row: &Row, idx: usize) -> String {
    row.get(idx)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn int(row: &Row, idx: usize) -> i64 {
    row.get(idx).and_then(|v| v.as_i64()).unwrap_or(0)
}

#[async_trait]
impl SchemaIntrospection for SqliteConnection {
    #[tracing::instrument(skip(self))]
    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        let result = self.query("SELECT name FROM pragma_database_list ORDER BY seq", &[]).await?;
        Ok(result
            .rows
            .iter()
            .map(|row| DatabaseInfo::new(text(row, 0)))
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn list_tables(&self, _database: &str) -> Result<Vec<TableInfo>> {
        let result = self
            .query(
                "SELECT name, type FROM sqlite_master WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' ORDER BY name",
                &[],
            )
            .await?;

        let tables: Vec<TableInfo> = result
            .rows
            .iter()
            .map(|row| TableInfo {
                database: Some("main".to_string()),
                name: text(row, 0),
                table_type: TableType::from_catalog(&text(row, 1)),
            })
            .collect();
        tracing::debug!(table_count = tables.len(), "tables listed");
        Ok(tables)
    }

    #[tracing::instrument(skip(self))]
    async fn get_columns(&self, _database: &str, table: &str) -> Result<Vec<ColumnInfo>> {
        let result = self
            .query(
                "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1)",
                &[Value::from(table)],
            )
            .await?;

        Ok(result
            .rows
            .iter()
            .map(|row| ColumnInfo {
                ordinal: int(row, 0) as usize,
                name: text(row, 1),
                data_type: text(row, 2),
                nullable: int(row, 3) == 0,
                default_value: row.get(4).filter(|v| !v.is_null()).map(|v| v.to_string()),
                is_primary_key: int(row, 5) > 0,
            })
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn get_indexes(&self, _database: &str, table: &str) -> Result<Vec<IndexInfo>> {
        let list = self
            .query(
                "SELECT name, \"unique\", origin FROM pragma_index_list(?1) ORDER BY seq",
                &[Value::from(table)],
            )
            .await?;

        let mut indexes = Vec::with_capacity(list.rows.len());
        for row in &list.rows {
            let name = text(row, 0);
            let columns = self
                .query(
                    "SELECT name FROM pragma_index_info(?1) ORDER BY seqno",
                    &[Value::from(name.as_str())],
                )
                .await?
                .rows
                .iter()
                .map(|r| text(r, 0))
                .collect();

            indexes.push(IndexInfo {
                name,
                columns,
                is_unique: int(row, 1) == 1,
                is_primary: text(row, 2) == "pk",
            });
        }
        Ok(indexes)
    }

    #[tracing::instrument(skip(self))]
    async fn get_foreign_keys(&self, _database: &str, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        let result = self
            .query(
                "SELECT id, \"table\", \"from\", \"to\", on_update, on_delete FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
                &[Value::from(table)],
            )
            .await?;

        // One row per column; composite keys share an id.
        let mut keys: Vec<(i64, ForeignKeyInfo)> = Vec::new();
        for row in &result.rows {
            let id = int(row, 0);
            match keys.iter_mut().find(|(existing, _)| *existing == id) {
                Some((_, fk)) => {
                    fk.columns.push(text(row, 2));
                    fk.referenced_columns.push(text(row, 3));
                }
                None => {
                    let referenced_table = text(row, 1);
                    keys.push((
                        id,
                        ForeignKeyInfo {
                            name: format!("fk_{}_{}_{}", table, referenced_table, id),
                            columns: vec![text(row, 2)],
                            referenced_table,
                            referenced_columns: vec![text(row, 3)],
                            on_update: ForeignKeyAction::parse(&text(row, 4)),
                            on_delete: ForeignKeyAction::parse(&text(row, 5)),
                        },
                    ));
                }
            }
        }
        Ok(keys.into_iter().map(|(_, fk)| fk).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn get_constraints(&self, database: &str, table: &str) -> Result<Vec<ConstraintInfo>> {
        let mut constraints = Vec::new();

        let key = self.get_primary_key_columns(database, table).await?;
        if !key.is_empty() {
            constraints.push(ConstraintInfo {
                name: format!("pk_{}", table),
                constraint_type: ConstraintType::PrimaryKey,
                columns: key,
                definition: None,
            });
        }

        for index in self.get_indexes(database, table).await? {
            if index.is_unique && !index.is_primary {
                constraints.push(ConstraintInfo {
                    name: index.name,
                    constraint_type: ConstraintType::Unique,
                    columns: index.columns,
                    definition: None,
                });
            }
        }

        for fk in self.get_foreign_keys(database, table).await? {
            constraints.push(ConstraintInfo {
                definition: Some(format!(
                    "REFERENCES {}({})",
                    fk.referenced_table,
                    fk.referenced_columns.join(", ")
                )),
                name: fk.name,
                constraint_type: ConstraintType::ForeignKey,
                columns: fk.columns,
            });
        }

        Ok(constraints)
    }

    #[tracing::instrument(skip(self))]
    async fn get_primary_key_columns(&self, _database: &str, table: &str) -> Result<Vec<String>> {
        // pk is the 1-based position within the key, 0 for other columns
        let result = self
            .query(
                "SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk",
                &[Value::from(table)],
            )
            .await?;
        Ok(result.rows.iter().map(|row| text(row, 0)).collect())
    }
}
