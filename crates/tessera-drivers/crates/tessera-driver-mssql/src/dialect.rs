//! T-SQL dialect

use tessera_core::{SqlDialect, quote_string};

/// SQL Server spelling: bracketed identifiers and `@Pn` parameters.
pub struct MssqlDialect;

pub static MSSQL_DIALECT: MssqlDialect = MssqlDialect;

impl SqlDialect for MssqlDialect {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("[{}]", ident.replace(']', "]]"))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@P{}", index)
    }

    /// OFFSET/FETCH is only valid after an ORDER BY.
    fn paginate(&self, offset: u64, limit: u64, has_order: bool) -> String {
        let fetch = format!("OFFSET {} ROWS FETCH NEXT {} ROWS ONLY", offset, limit);
        if has_order {
            fetch
        } else {
            format!("ORDER BY (SELECT NULL) {}", fetch)
        }
    }

    /// Unicode literal so non-ASCII text survives the preview.
    fn string_literal(&self, value: &str) -> String {
        format!("N{}", quote_string(value))
    }

    fn bytes_literal(&self, value: &[u8]) -> String {
        format!("0x{}", hex::encode(value))
    }
}
