//! MySQL SQL dialect

use tessera_core::SqlDialect;

/// MySQL spelling: backtick identifiers and `?` placeholders.
pub struct MySqlDialect;

pub static MYSQL_DIALECT: MySqlDialect = MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn empty_insert(&self, table: &str) -> String {
        format!("INSERT INTO {} () VALUES ()", table)
    }

    fn bool_literal(&self, value: bool) -> String {
        if value { "TRUE" } else { "FALSE" }.to_string()
    }

    /// Backslash is an escape character unless NO_BACKSLASH_ESCAPES is set.
    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }
}
