use super::{CellValue, DmlChange, DmlKind, PrimaryKeyInfo};
use crate::{Result, SqlDialect, TesseraError, Value};

/// A statement ready to run: SQL with placeholders plus its bound values
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Right-hand side of an assignment or key comparison
enum Operand {
    Bind(Value),
    Keyword(&'static str),
}

impl Operand {
    fn for_cell(cell: &CellValue) -> Self {
        match cell.effective_value() {
            None => Operand::Keyword("DEFAULT"),
            Some(Value::Null) => Operand::Keyword("NULL"),
            Some(value) => Operand::Bind(value),
        }
    }
}

/// Shape of a statement, rendered either with placeholders or literals
enum Plan {
    EmptyInsert {
        table: String,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<Operand>,
    },
    Update {
        table: String,
        assignments: Vec<(String, Operand)>,
        key: Vec<(String, Value)>,
    },
    Delete {
        table: String,
        key: Vec<(String, Value)>,
    },
}

/// Writes operands in one of the two output modes
struct Renderer<'a> {
    dialect: &'a dyn SqlDialect,
    params: Option<Vec<Value>>,
}

impl Renderer<'_> {
    fn operand(&mut self, operand: &Operand) -> String {
        match operand {
            Operand::Keyword(word) => (*word).to_string(),
            Operand::Bind(value) => self.value(value),
        }
    }

    fn value(&mut self, value: &Value) -> String {
        match &mut self.params {
            Some(params) => {
                params.push(value.clone());
                self.dialect.placeholder(params.len())
            }
            None => self.dialect.literal(value),
        }
    }

    fn predicate(&mut self, key: &[(String, Value)]) -> String {
        key.iter()
            .map(|(column, value)| {
                if value.is_null() {
                    format!("{} IS NULL", column)
                } else {
                    format!("{} = {}", column, self.value(value))
                }
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn render(&mut self, plan: &Plan) -> String {
        match plan {
            Plan::EmptyInsert { table } => self.dialect.empty_insert(table),
            Plan::Insert {
                table,
                columns,
                values,
            } => {
                let values = values
                    .iter()
                    .map(|v| self.operand(v))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    table,
                    columns.join(", "),
                    values
                )
            }
            Plan::Update {
                table,
                assignments,
                key,
            } => {
                let set = assignments
                    .iter()
                    .map(|(column, v)| format!("{} = {}", column, self.operand(v)))
                    .collect::<Vec<_>>()
                    .join(", ");
                let predicate = self.predicate(key);
                format!("UPDATE {} SET {} WHERE {}", table, set, predicate)
            }
            Plan::Delete { table, key } => {
                format!("DELETE FROM {} WHERE {}", table, self.predicate(key))
            }
        }
    }
}

/// Turns pending changes into SQL for one dialect.
///
/// `build` binds every value for execution; `preview` inlines the same
/// values as literals. Both render from one plan so they always describe
/// the same statement.
pub struct QueryBuilder<'a> {
    dialect: &'a dyn SqlDialect,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(dialect: &'a dyn SqlDialect) -> Self {
        Self { dialect }
    }

    /// Parameterized statement for execution
    pub fn build(&self, change: &DmlChange) -> Result<Statement> {
        let plan = self.plan(change)?;
        let mut renderer = Renderer {
            dialect: self.dialect,
            params: Some(Vec::new()),
        };
        let sql = renderer.render(&plan);
        Ok(Statement {
            sql,
            params: renderer.params.unwrap_or_default(),
        })
    }

    /// Fully literal SQL for display
    pub fn preview(&self, change: &DmlChange) -> Result<String> {
        let plan = self.plan(change)?;
        let mut renderer = Renderer {
            dialect: self.dialect,
            params: None,
        };
        Ok(renderer.render(&plan))
    }

    fn plan(&self, change: &DmlChange) -> Result<Plan> {
        let d = self.dialect;
        let table = d.qualify(&change.database, &change.table);

        match change.kind {
            DmlKind::Insert if change.values.is_empty() => Ok(Plan::EmptyInsert { table }),
            DmlKind::Insert => Ok(Plan::Insert {
                table,
                columns: change
                    .values
                    .iter()
                    .map(|cell| d.quote_identifier(&cell.column))
                    .collect(),
                values: change.values.iter().map(Operand::for_cell).collect(),
            }),
            DmlKind::Update => {
                let key = self.key_predicate(change)?;
                if change.values.is_empty() {
                    return Err(TesseraError::InvalidChange(format!(
                        "update of '{}' has no column values",
                        change.table
                    )));
                }
                Ok(Plan::Update {
                    table,
                    assignments: change
                        .values
                        .iter()
                        .map(|cell| (d.quote_identifier(&cell.column), Operand::for_cell(cell)))
                        .collect(),
                    key,
                })
            }
            DmlKind::Delete => Ok(Plan::Delete {
                table,
                key: self.key_predicate(change)?,
            }),
        }
    }

    /// Every key column, never a subset.
    fn key_predicate(&self, change: &DmlChange) -> Result<Vec<(String, Value)>> {
        if change.primary_key_info.is_empty() {
            return Err(TesseraError::MissingPrimaryKey {
                table: change.table.clone(),
            });
        }
        Ok(change
            .primary_key_info
            .iter()
            .map(|PrimaryKeyInfo { name, value }| (self.dialect.quote_identifier(name), value.clone()))
            .collect())
    }
}
