//! SQLite SQL spelling

use tessera_core::SqlDialect;

/// Shared instance handed out by every SQLite connection
pub static SQLITE_DIALECT: SqliteDialect = SqliteDialect;

/// Double-quoted identifiers, `?N` placeholders, `X'..'` blobs.
///
/// SQLite has a single schema per connection, so the database qualifier is
/// dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("?{}", index)
    }

    fn qualify(&self, _database: &str, table: &str) -> String {
        self.quote_identifier(table)
    }
}
