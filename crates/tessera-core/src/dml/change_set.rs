use super::{CellValue, DmlChange, DmlKind, PrimaryKeyInfo, RowIdentity};
use crate::{Result, TesseraError, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Pending state of a row as the grid should render it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Inserted,
    Updated,
    Deleted,
    Untouched,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RowKey {
    Key(String),
    Placeholder(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ChangeKey {
    database: String,
    table: String,
    row: RowKey,
}

impl ChangeKey {
    fn new(database: &str, table: &str, row: &RowIdentity) -> Result<Self> {
        let row = match row {
            RowIdentity::Placeholder(id) => RowKey::Placeholder(*id),
            RowIdentity::Key(columns) if columns.is_empty() => {
                return Err(TesseraError::MissingPrimaryKey {
                    table: table.to_string(),
                });
            }
            RowIdentity::Key(columns) => RowKey::Key(canonical_key(columns)),
        };
        Ok(Self {
            database: database.to_string(),
            table: table.to_string(),
            row,
        })
    }
}

/// Stable text form of a composite key. Column order is part of the key.
fn canonical_key(columns: &[PrimaryKeyInfo]) -> String {
    columns
        .iter()
        .map(|pk| format!("{}={:?}", pk.name, pk.value))
        .collect::<Vec<_>>()
        .join("\u{1f}")
}

/// The uncommitted edits, inserts and deletes of one results view.
///
/// Changes are keyed by `(database, table, row)` so each row has at most one
/// entry, and an explicit order list records commit order. The set never
/// talks to the backend.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    entries: HashMap<ChangeKey, DmlChange>,
    order: Vec<ChangeKey>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drop every pending change.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Pending changes in commit order.
    pub fn iter(&self) -> impl Iterator<Item = &DmlChange> {
        self.order.iter().filter_map(|key| self.entries.get(key))
    }

    /// Owned copy of the pending changes in commit order.
    pub fn to_changes(&self) -> Vec<DmlChange> {
        self.iter().cloned().collect()
    }

    /// Record a cell edit.
    ///
    /// Edits to a pending insert go straight into the insert. Edits to an
    /// existing row accumulate in a single update per row; a column that goes
    /// back to `original` is dropped, and an update left with no columns is
    /// removed.
    pub fn record_edit(
        &mut self,
        database: &str,
        table: &str,
        row: &RowIdentity,
        cell: CellValue,
        original: &Value,
    ) -> Result<()> {
        let key = ChangeKey::new(database, table, row)?;

        if let RowIdentity::Placeholder(id) = row {
            let Some(insert) = self.entries.get_mut(&key) else {
                return Err(TesseraError::InvalidChange(format!(
                    "no pending insert {} in '{}'",
                    id, table
                )));
            };
            upsert_cell(&mut insert.values, cell);
            return Ok(());
        }

        let reverted = cell.matches_original(original);
        match self.entries.get_mut(&key) {
            Some(change) if change.kind == DmlKind::Delete => Err(TesseraError::InvalidChange(
                format!("row in '{}' is pending deletion", table),
            )),
            Some(change) => {
                if reverted {
                    change.values.retain(|v| v.column != cell.column);
                    if change.values.is_empty() {
                        self.remove(&key);
                    }
                } else {
                    upsert_cell(&mut change.values, cell);
                }
                Ok(())
            }
            None if reverted => Ok(()),
            None => {
                let RowIdentity::Key(columns) = row else {
                    return Ok(());
                };
                let change = DmlChange::update(database, table, columns.clone(), vec![cell]);
                self.push(key, change);
                Ok(())
            }
        }
    }

    /// Record a row deletion.
    ///
    /// Deleting a pending insert removes the insert. Deleting a row with a
    /// pending update replaces the update and moves the row to the end of
    /// the commit order.
    pub fn record_delete(&mut self, database: &str, table: &str, row: &RowIdentity) -> Result<()> {
        let key = ChangeKey::new(database, table, row)?;

        let columns = match row {
            RowIdentity::Placeholder(id) => {
                return if self.remove(&key).is_some() {
                    Ok(())
                } else {
                    Err(TesseraError::InvalidChange(format!(
                        "no pending insert {} in '{}'",
                        id, table
                    )))
                };
            }
            RowIdentity::Key(columns) => columns,
        };

        if let Some(existing) = self.entries.get(&key)
            && existing.kind == DmlKind::Delete
        {
            return Ok(());
        }

        self.remove(&key);
        self.push(key, DmlChange::delete(database, table, columns.clone()));
        Ok(())
    }

    /// Record a new row and return its placeholder identity.
    pub fn record_insert(&mut self, database: &str, table: &str, values: Vec<CellValue>) -> RowIdentity {
        let id = Uuid::new_v4();
        let key = ChangeKey {
            database: database.to_string(),
            table: table.to_string(),
            row: RowKey::Placeholder(id),
        };
        self.push(key, DmlChange::insert(database, table, values));
        RowIdentity::Placeholder(id)
    }

    /// Undo a pending delete. Returns whether one was removed.
    pub fn cancel_delete(&mut self, database: &str, table: &str, row: &RowIdentity) -> bool {
        let Ok(key) = ChangeKey::new(database, table, row) else {
            return false;
        };
        match self.entries.get(&key) {
            Some(change) if change.kind == DmlKind::Delete => self.remove(&key).is_some(),
            _ => false,
        }
    }

    /// Whether a pending change targets this row of `table`.
    pub fn is_row_pending(&self, database: &str, table: &str, row: &RowIdentity) -> bool {
        self.entry(database, table, row).is_some()
    }

    pub fn row_status(&self, database: &str, table: &str, row: &RowIdentity) -> RowStatus {
        match self.entry(database, table, row).map(|change| change.kind) {
            Some(DmlKind::Insert) => RowStatus::Inserted,
            Some(DmlKind::Update) => RowStatus::Updated,
            Some(DmlKind::Delete) => RowStatus::Deleted,
            None => RowStatus::Untouched,
        }
    }

    /// The pending cell for a column, for rendering edits before commit.
    pub fn pending_value(
        &self,
        database: &str,
        table: &str,
        row: &RowIdentity,
        column: &str,
    ) -> Option<&CellValue> {
        self.entry(database, table, row)?.value_for(column)
    }

    fn entry(&self, database: &str, table: &str, row: &RowIdentity) -> Option<&DmlChange> {
        let key = ChangeKey::new(database, table, row).ok()?;
        self.entries.get(&key)
    }

    fn push(&mut self, key: ChangeKey, change: DmlChange) {
        self.order.push(key.clone());
        self.entries.insert(key, change);
    }

    fn remove(&mut self, key: &ChangeKey) -> Option<DmlChange> {
        let removed = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(removed)
    }
}

/// Last write wins per column.
fn upsert_cell(values: &mut Vec<CellValue>, cell: CellValue) {
    match values.iter_mut().find(|v| v.column == cell.column) {
        Some(existing) => *existing = cell,
        None => values.push(cell),
    }
}
