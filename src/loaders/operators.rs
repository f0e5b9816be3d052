//! Derived-column operators applied to every snapshot after it is loaded

use super::SnapshotLoader;
use crate::error::{Result, TabsyncError};
use crate::model::{Cell, CellValue, Column, ColumnKind, Row, Schema, Snapshot};
use crate::watcher::WatchTarget;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One configured operator, as written in a source config:
///
/// ```json
/// { "op": "divide", "first_column": "bytes", "second_column": "seconds",
///   "column_name": "rate", "modifier": 8 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ColumnOperator {
    Divide(Divide),
}

impl ColumnOperator {
    pub fn apply(&self, snapshot: Snapshot) -> Result<Snapshot> {
        match self {
            ColumnOperator::Divide(divide) => divide.apply(snapshot),
        }
    }
}

/// Appends a double column holding `modifier * first / second`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Divide {
    pub first_column: String,
    pub second_column: String,
    pub column_name: String,
    /// Zero means 1
    #[serde(default)]
    pub modifier: f64,
}

impl Divide {
    pub fn new(
        first_column: impl Into<String>,
        second_column: impl Into<String>,
        column_name: impl Into<String>,
    ) -> Self {
        Self {
            first_column: first_column.into(),
            second_column: second_column.into(),
            column_name: column_name.into(),
            modifier: 0.0,
        }
    }

    pub fn with_modifier(mut self, modifier: f64) -> Self {
        self.modifier = modifier;
        self
    }

    /// NaN for a zero divisor
    pub fn compute(&self, first: f64, second: f64) -> f64 {
        let modifier = if self.modifier == 0.0 {
            1.0
        } else {
            self.modifier
        };

        if second == 0.0 {
            f64::NAN
        } else {
            modifier * first / second
        }
    }

    fn double_column(&self, schema: &Schema, name: &str) -> Result<usize> {
        let index = schema.index_of(name).ok_or_else(|| {
            TabsyncError::config(format!("Divide: unknown column '{}'", name))
        })?;
        let kind = schema.columns()[index].kind;
        if kind != ColumnKind::Double {
            return Err(TabsyncError::config(format!(
                "Divide: column '{}' is {}, expected double",
                name, kind
            )));
        }
        Ok(index)
    }

    pub fn apply(&self, snapshot: Snapshot) -> Result<Snapshot> {
        let schema = snapshot.schema();
        let first = self.double_column(schema, &self.first_column)?;
        let second = self.double_column(schema, &self.second_column)?;
        if schema.index_of(&self.column_name).is_some() {
            return Err(TabsyncError::config(format!(
                "Divide: column '{}' already exists",
                self.column_name
            )));
        }

        let mut columns = schema.columns().to_vec();
        columns.push(Column::new(self.column_name.clone(), ColumnKind::Double));

        let rows = snapshot
            .rows()
            .iter()
            .map(|row| {
                let operands = (
                    row.cell(first).map(Cell::value),
                    row.cell(second).map(Cell::value),
                );
                let (Some(CellValue::Double(a)), Some(CellValue::Double(b))) = operands else {
                    return Err(TabsyncError::invalid_input(format!(
                        "Divide: row '{}' holds a non-double operand",
                        row.key()
                    )));
                };

                let result = self.compute(*a, *b);
                let mut cells = row.cells().to_vec();
                cells.push(Cell::with_display(result, Some(result.to_string())));
                Ok(Row::new(row.key(), cells))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Snapshot::new(Schema::new(columns), rows))
    }
}

/// Runs the configured operators over whatever the wrapped loader produces
pub struct DerivedColumnsLoader {
    inner: Box<dyn SnapshotLoader>,
    operators: Vec<ColumnOperator>,
}

impl DerivedColumnsLoader {
    pub fn new(inner: Box<dyn SnapshotLoader>, operators: Vec<ColumnOperator>) -> Self {
        Self { inner, operators }
    }
}

impl SnapshotLoader for DerivedColumnsLoader {
    fn load(&self) -> Result<Snapshot> {
        self.operators
            .iter()
            .try_fold(self.inner.load()?, |snapshot, operator| {
                operator.apply(snapshot)
            })
    }

    fn watch_target(&self) -> WatchTarget {
        self.inner.watch_target()
    }

    fn source_path(&self) -> &Path {
        self.inner.source_path()
    }
}
