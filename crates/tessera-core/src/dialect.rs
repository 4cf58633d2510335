//! SQL dialect rules used by the query builder
//!
//! A dialect knows how one backend quotes identifiers, spells bind
//! placeholders and renders literal values. The literal rendering is only
//! used for previews; statements sent to the backend always bind values.

use crate::Value;

/// Backend-specific SQL spelling.
pub trait SqlDialect: Send + Sync {
    /// Dialect identifier (e.g. "sqlite", "postgres")
    fn name(&self) -> &'static str;

    /// Quote a single identifier. Embedded quote characters are doubled.
    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Bind placeholder for the 1-based parameter `index`.
    fn placeholder(&self, index: usize) -> String;

    /// Qualified table reference. An empty `database` yields the bare table.
    fn qualify(&self, database: &str, table: &str) -> String {
        if database.is_empty() {
            self.quote_identifier(table)
        } else {
            format!(
                "{}.{}",
                self.quote_identifier(database),
                self.quote_identifier(table)
            )
        }
    }

    /// Pagination suffix appended after the optional ORDER BY.
    fn paginate(&self, offset: u64, limit: u64, _has_order: bool) -> String {
        format!("LIMIT {} OFFSET {}", limit, offset)
    }

    /// INSERT for a row where every column takes its default.
    fn empty_insert(&self, table: &str) -> String {
        format!("INSERT INTO {} DEFAULT VALUES", table)
    }

    /// Boolean literal
    fn bool_literal(&self, value: bool) -> String {
        if value { "1" } else { "0" }.to_string()
    }

    /// Quoted string literal
    fn string_literal(&self, value: &str) -> String {
        quote_string(value)
    }

    /// Binary literal, hex encoded
    fn bytes_literal(&self, value: &[u8]) -> String {
        format!("X'{}'", hex::encode(value))
    }

    /// Array literal. Backends without arrays get the JSON text.
    fn array_literal(&self, items: &[Value]) -> String {
        let json = serde_json::Value::Array(items.iter().map(value_to_json).collect());
        self.string_literal(&json.to_string())
    }

    /// Render a value as an inline SQL literal for previews.
    fn literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(v) => self.bool_literal(*v),
            Value::Int8(v) => v.to_string(),
            Value::Int16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Float32(v) if v.is_finite() => v.to_string(),
            Value::Float64(v) if v.is_finite() => v.to_string(),
            Value::Float32(v) => self.string_literal(&v.to_string()),
            Value::Float64(v) => self.string_literal(&v.to_string()),
            Value::Decimal(v) => v.clone(),
            Value::String(v) => self.string_literal(v),
            Value::Bytes(v) => self.bytes_literal(v),
            Value::Uuid(v) => self.string_literal(&v.to_string()),
            Value::Date(v) => self.string_literal(&v.format("%Y-%m-%d").to_string()),
            Value::Time(v) => self.string_literal(&v.format("%H:%M:%S%.f").to_string()),
            Value::DateTime(v) => {
                self.string_literal(&v.format("%Y-%m-%d %H:%M:%S%.f").to_string())
            }
            Value::DateTimeUtc(v) => self.string_literal(&v.to_rfc3339()),
            Value::Json(v) => self.string_literal(&v.to_string()),
            Value::Array(items) => self.array_literal(items),
        }
    }
}

/// Single-quote a string, doubling embedded quotes.
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// JSON form of a value, used for arrays and document output.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Value::Null => Json::Null,
        Value::Bool(v) => Json::Bool(*v),
        Value::Int8(v) => Json::from(*v),
        Value::Int16(v) => Json::from(*v),
        Value::Int32(v) => Json::from(*v),
        Value::Int64(v) => Json::from(*v),
        Value::Float32(v) => Json::from(*v as f64),
        Value::Float64(v) => Json::from(*v),
        Value::Json(v) => v.clone(),
        Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Bytes(v) => Json::String(hex::encode(v)),
        other => Json::String(other.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Plain double-quote dialect with `?` placeholders.
    pub(crate) struct AnsiDialect;

    impl SqlDialect for AnsiDialect {
        fn name(&self) -> &'static str {
            "ansi"
        }

        fn placeholder(&self, _index: usize) -> String {
            "?".to_string()
        }

        fn qualify(&self, _database: &str, table: &str) -> String {
            self.quote_identifier(table)
        }
    }

    #[test]
    fn identifiers_double_embedded_quotes() {
        assert_eq!(AnsiDialect.quote_identifier("user\"s"), "\"user\"\"s\"");
    }

    #[test]
    fn literals_escape_for_preview() {
        let d = AnsiDialect;
        assert_eq!(d.literal(&Value::Null), "NULL");
        assert_eq!(d.literal(&Value::String("O'Brien".into())), "'O''Brien'");
        assert_eq!(d.literal(&Value::Bytes(vec![0xde, 0xad])), "X'dead'");
        assert_eq!(d.literal(&Value::Int64(-4)), "-4");
        assert_eq!(d.literal(&Value::Bool(true)), "1");
        assert_eq!(d.literal(&Value::String("NULL".into())), "'NULL'");
    }

    #[test]
    fn default_qualify_joins_namespace() {
        struct Dotted;
        impl SqlDialect for Dotted {
            fn name(&self) -> &'static str {
                "dotted"
            }
            fn placeholder(&self, index: usize) -> String {
                format!("${}", index)
            }
        }
        assert_eq!(Dotted.qualify("public", "users"), "\"public\".\"users\"");
        assert_eq!(Dotted.qualify("", "users"), "\"users\"");
    }
}
