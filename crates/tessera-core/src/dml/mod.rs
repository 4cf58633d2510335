//! Pending row changes and how they reach the database
//!
//! A [`ChangeSet`] collects edits, inserts and deletes made in a results
//! view without touching the backend. [`QueryBuilder`] turns each change into
//! a bound statement for execution or a literal string for preview, and
//! [`execute_pending_changes`] applies a batch inside one transaction.

mod builder;
mod change_set;
mod executor;
mod primary_key;

pub use builder::{QueryBuilder, Statement};
pub use change_set::{ChangeSet, RowStatus};
pub use executor::execute_pending_changes;
pub use primary_key::primary_key_for_row;

use crate::Value;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(test)]
mod builder_tests;
#[cfg(test)]
mod executor_tests;

/// Operation a change performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DmlKind {
    Insert,
    Update,
    Delete,
}

/// What the user asked a cell to become.
///
/// The kind is separate from the value so that setting a cell to SQL NULL
/// differs from typing the text `NULL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    /// Use `value` as given
    #[default]
    String,
    /// SQL NULL
    Null,
    /// Empty string
    Empty,
    /// The column's DEFAULT
    Default,
}

/// Location of a cell in the grid currently on screen. Meaningless once the
/// grid is re-fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPosition {
    pub row: usize,
    pub col: usize,
}

/// One column's pending value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellValue {
    pub column: String,
    pub value: Value,
    #[serde(default)]
    pub kind: CellKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<CellPosition>,
}

impl CellValue {
    pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
            kind: CellKind::String,
            position: None,
        }
    }

    pub fn null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: Value::Null,
            kind: CellKind::Null,
            position: None,
        }
    }

    pub fn empty(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: Value::String(String::new()),
            kind: CellKind::Empty,
            position: None,
        }
    }

    pub fn default_value(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: Value::Null,
            kind: CellKind::Default,
            position: None,
        }
    }

    pub fn at(mut self, row: usize, col: usize) -> Self {
        self.position = Some(CellPosition { row, col });
        self
    }

    /// The value the backend should receive, or `None` for DEFAULT.
    pub fn effective_value(&self) -> Option<Value> {
        match self.kind {
            CellKind::String => Some(self.value.clone()),
            CellKind::Null => Some(Value::Null),
            CellKind::Empty => Some(Value::String(String::new())),
            CellKind::Default => None,
        }
    }

    /// Whether this cell holds the value originally loaded for the column.
    pub fn matches_original(&self, original: &Value) -> bool {
        match self.kind {
            CellKind::Default => false,
            CellKind::Null => original.is_null(),
            CellKind::Empty => matches!(original, Value::String(s) if s.is_empty()),
            CellKind::String => {
                if self.value == *original {
                    return true;
                }
                // Typed text against a loaded integer, date, etc.
                !original.is_null()
                    && !self.value.is_null()
                    && self.value.display_text() == original.display_text()
            }
        }
    }
}

/// One key column and its value captured when the row was fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKeyInfo {
    pub name: String,
    pub value: Value,
}

impl PrimaryKeyInfo {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// How a pending row is addressed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowIdentity {
    /// An existing row, addressed by its full primary key
    Key(Vec<PrimaryKeyInfo>),
    /// A row that only exists as a pending insert
    Placeholder(Uuid),
}

impl RowIdentity {
    pub fn key(columns: Vec<PrimaryKeyInfo>) -> Self {
        RowIdentity::Key(columns)
    }

    pub fn placeholder() -> Self {
        RowIdentity::Placeholder(Uuid::new_v4())
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, RowIdentity::Placeholder(_))
    }
}

/// One row's worth of pending work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmlChange {
    pub kind: DmlKind,
    pub database: String,
    pub table: String,
    /// Key captured at fetch time. Empty for inserts.
    #[serde(default)]
    pub primary_key_info: Vec<PrimaryKeyInfo>,
    #[serde(default)]
    pub values: Vec<CellValue>,
}

impl DmlChange {
    pub fn insert(database: impl Into<String>, table: impl Into<String>, values: Vec<CellValue>) -> Self {
        Self {
            kind: DmlKind::Insert,
            database: database.into(),
            table: table.into(),
            primary_key_info: Vec::new(),
            values,
        }
    }

    pub fn update(
        database: impl Into<String>,
        table: impl Into<String>,
        primary_key_info: Vec<PrimaryKeyInfo>,
        values: Vec<CellValue>,
    ) -> Self {
        Self {
            kind: DmlKind::Update,
            database: database.into(),
            table: table.into(),
            primary_key_info,
            values,
        }
    }

    pub fn delete(
        database: impl Into<String>,
        table: impl Into<String>,
        primary_key_info: Vec<PrimaryKeyInfo>,
    ) -> Self {
        Self {
            kind: DmlKind::Delete,
            database: database.into(),
            table: table.into(),
            primary_key_info,
            values: Vec::new(),
        }
    }

    /// Pending value for a column, if any.
    pub fn value_for(&self, column: &str) -> Option<&CellValue> {
        self.values.iter().find(|cell| cell.column == column)
    }
}
