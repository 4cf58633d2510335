//! Change scripts
//!
//! A change script is a JSON array of grid edits replayed into a
//! `ChangeSet`, so the same merge rules apply as for interactive edits.
//! Inserts may carry a `ref` label that later ops use instead of a key.
//!
//! ```json
//! [
//!   {"op": "insert", "table": "users", "ref": "new", "values": {"name": "Ada"}},
//!   {"op": "edit", "row": "new", "table": "users", "column": "email", "value": "ada@example.com"},
//!   {"op": "edit", "table": "users", "key": {"id": 7}, "column": "name", "value": "Bo", "original": "Bob"},
//!   {"op": "delete", "table": "users", "key": {"id": 9}}
//! ]
//! ```

use serde::Deserialize;
use serde_json::{Map, Value as Json};
use std::collections::{BTreeSet, HashMap};
use tessera_core::dml::{CellValue, ChangeSet, RowIdentity, primary_key_for_row};
use tessera_core::{Result, Row, TesseraError, Value};

/// Key columns per `(database, table)`, fetched from the catalog.
pub type KeyColumns = HashMap<(String, String), Vec<String>>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum ScriptOp {
    Edit {
        #[serde(default)]
        database: Option<String>,
        table: String,
        #[serde(default)]
        key: Option<Map<String, Json>>,
        #[serde(default)]
        row: Option<String>,
        column: String,
        value: Json,
        #[serde(default)]
        original: Json,
    },
    Delete {
        #[serde(default)]
        database: Option<String>,
        table: String,
        #[serde(default)]
        key: Option<Map<String, Json>>,
        #[serde(default)]
        row: Option<String>,
    },
    Insert {
        #[serde(default)]
        database: Option<String>,
        table: String,
        #[serde(default, rename = "ref")]
        label: Option<String>,
        values: Map<String, Json>,
    },
}

impl ScriptOp {
    fn target(&self) -> (Option<&str>, &str) {
        match self {
            ScriptOp::Edit { database, table, .. }
            | ScriptOp::Delete { database, table, .. }
            | ScriptOp::Insert { database, table, .. } => (database.as_deref(), table),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeScript {
    pub ops: Vec<ScriptOp>,
}

impl ChangeScript {
    pub fn parse(content: &str) -> Result<Self> {
        let ops: Vec<ScriptOp> = serde_json::from_str(content)?;
        Ok(Self { ops })
    }

    /// Tables addressed by key, which need their key columns looked up.
    pub fn keyed_tables(&self, default_database: &str) -> BTreeSet<(String, String)> {
        self.ops
            .iter()
            .filter(|op| match op {
                ScriptOp::Edit { key, .. } | ScriptOp::Delete { key, .. } => key.is_some(),
                ScriptOp::Insert { .. } => false,
            })
            .map(|op| {
                let (database, table) = op.target();
                (database.unwrap_or(default_database).to_string(), table.to_string())
            })
            .collect()
    }

    /// Replay every op, in order, into a fresh change set.
    pub fn replay(&self, default_database: &str, keys: &KeyColumns) -> Result<ChangeSet> {
        let mut changes = ChangeSet::new();
        let mut labels: HashMap<String, RowIdentity> = HashMap::new();

        for (index, op) in self.ops.iter().enumerate() {
            let (database, table) = op.target();
            let database = database.unwrap_or(default_database);
            let step = |err: TesseraError| match err {
                TesseraError::InvalidChange(msg) => {
                    TesseraError::InvalidChange(format!("op {}: {}", index + 1, msg))
                }
                other => other,
            };

            match op {
                ScriptOp::Insert { label, values, .. } => {
                    let cells = values
                        .iter()
                        .map(|(column, value)| cell(column, value))
                        .collect();
                    let identity = changes.record_insert(database, table, cells);
                    if let Some(label) = label
                        && labels.insert(label.clone(), identity).is_some()
                    {
                        return Err(step(TesseraError::InvalidChange(format!(
                            "row label '{}' used twice",
                            label
                        ))));
                    }
                }
                ScriptOp::Edit {
                    key,
                    row,
                    column,
                    value,
                    original,
                    ..
                } => {
                    let identity =
                        identify(database, table, key.as_ref(), row.as_deref(), keys, &labels)
                            .map_err(step)?;
                    changes
                        .record_edit(
                            database,
                            table,
                            &identity,
                            cell(column, value),
                            &json_to_value(original),
                        )
                        .map_err(step)?;
                }
                ScriptOp::Delete { key, row, .. } => {
                    let identity =
                        identify(database, table, key.as_ref(), row.as_deref(), keys, &labels)
                            .map_err(step)?;
                    changes
                        .record_delete(database, table, &identity)
                        .map_err(step)?;
                }
            }
        }

        Ok(changes)
    }
}

fn identify(
    database: &str,
    table: &str,
    key: Option<&Map<String, Json>>,
    label: Option<&str>,
    keys: &KeyColumns,
    labels: &HashMap<String, RowIdentity>,
) -> Result<RowIdentity> {
    match (key, label) {
        (Some(_), Some(_)) => Err(TesseraError::InvalidChange(
            "give either 'key' or 'row', not both".into(),
        )),
        (None, None) => Err(TesseraError::InvalidChange(
            "'key' or 'row' is required".into(),
        )),
        (None, Some(label)) => labels.get(label).cloned().ok_or_else(|| {
            TesseraError::InvalidChange(format!("unknown row label '{}'", label))
        }),
        (Some(key), None) => {
            let key_columns = keys
                .get(&(database.to_string(), table.to_string()))
                .map(Vec::as_slice)
                .unwrap_or_default();
            let (columns, values) = key
                .iter()
                .map(|(column, value)| (column.clone(), json_to_value(value)))
                .unzip();
            let row = Row::new(columns, values);
            Ok(RowIdentity::key(primary_key_for_row(table, key_columns, &row)?))
        }
    }
}

fn cell(column: &str, value: &Json) -> CellValue {
    match value {
        Json::Null => CellValue::null(column),
        Json::String(s) if s.is_empty() => CellValue::empty(column),
        other => CellValue::new(column, json_to_value(other)),
    }
}

/// Scalars map onto the matching value; arrays and objects stay JSON.
pub fn json_to_value(value: &Json) -> Value {
    match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int64(i),
            None => n
                .as_f64()
                .map(Value::Float64)
                .unwrap_or_else(|| Value::Decimal(n.to_string())),
        },
        Json::String(s) => Value::String(s.clone()),
        other => Value::Json(other.clone()),
    }
}
