//! Paginated table reads

use crate::{QueryResult, SqlDialect};
use serde::{Deserialize, Serialize};

/// Row cap applied when a caller asks for `limit = 0`.
pub const DEFAULT_RECORD_LIMIT: u64 = 300;

/// A page request against one table.
///
/// `filter` and `sort` are fragments typed by the user and are appended to
/// the generated SQL verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordsRequest {
    pub database: String,
    pub table: String,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub limit: u64,
}

impl RecordsRequest {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn page(mut self, offset: u64, limit: u64) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// Limit after the default cap is applied.
    pub fn effective_limit(&self) -> u64 {
        if self.limit == 0 {
            DEFAULT_RECORD_LIMIT
        } else {
            self.limit
        }
    }

    fn where_clause(&self) -> String {
        match self.filter.as_deref().map(str::trim) {
            Some(filter) if !filter.is_empty() => {
                let filter = strip_keyword(filter, "WHERE");
                format!(" WHERE {}", filter)
            }
            _ => String::new(),
        }
    }

    fn order_clause(&self) -> Option<String> {
        match self.sort.as_deref().map(str::trim) {
            Some(sort) if !sort.is_empty() => {
                let sort = strip_keyword(sort, "ORDER BY");
                Some(format!(" ORDER BY {}", sort))
            }
            _ => None,
        }
    }

    /// The page query this request runs.
    pub fn select_sql(&self, dialect: &dyn SqlDialect) -> String {
        let table = dialect.qualify(&self.database, &self.table);
        let order = self.order_clause();
        let mut sql = format!("SELECT * FROM {}{}", table, self.where_clause());
        if let Some(order) = &order {
            sql.push_str(order);
        }
        sql.push(' ');
        sql.push_str(&dialect.paginate(self.offset, self.effective_limit(), order.is_some()));
        sql
    }

    /// The total-count query for the same filter.
    pub fn count_sql(&self, dialect: &dyn SqlDialect) -> String {
        format!(
            "SELECT COUNT(*) FROM {}{}",
            dialect.qualify(&self.database, &self.table),
            self.where_clause()
        )
    }
}

/// Strip a leading keyword the user may have typed themselves.
fn strip_keyword<'a>(fragment: &'a str, keyword: &str) -> &'a str {
    let len = keyword.len();
    if fragment.len() > len
        && fragment.is_char_boundary(len)
        && fragment[..len].eq_ignore_ascii_case(keyword)
        && fragment[len..].starts_with(char::is_whitespace)
    {
        fragment[len..].trim_start()
    } else {
        fragment
    }
}

/// One page of rows plus the count and the SQL that produced it.
#[derive(Debug, Clone)]
pub struct RecordPage {
    pub result: QueryResult,
    pub total_count: u64,
    pub executed_query: String,
}
