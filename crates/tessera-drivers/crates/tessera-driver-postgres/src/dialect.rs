//! PostgreSQL SQL dialect

use tessera_core::{SqlDialect, Value};

/// PostgreSQL spelling: `$n` placeholders, schema-qualified tables.
pub struct PostgresDialect;

/// Shared instance handed out by [`crate::PostgresConnection`].
pub static POSTGRES_DIALECT: PostgresDialect = PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn bool_literal(&self, value: bool) -> String {
        if value { "TRUE" } else { "FALSE" }.to_string()
    }

    fn bytes_literal(&self, value: &[u8]) -> String {
        format!("'\\x{}'::bytea", hex::encode(value))
    }

    fn array_literal(&self, items: &[Value]) -> String {
        let items: Vec<String> = items.iter().map(|item| self.literal(item)).collect();
        format!("ARRAY[{}]", items.join(", "))
    }
}
