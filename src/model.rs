//! Row, cell and schema value types shared by every tabsync component

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared kind of a column. Every cell in the column carries a value of this kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    String,
    Int,
    Double,
    Boolean,
    DateTime,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::String => "string",
            ColumnKind::Int => "int",
            ColumnKind::Double => "double",
            ColumnKind::Boolean => "boolean",
            ColumnKind::DateTime => "datetime",
        };
        f.write_str(name)
    }
}

/// Semantic value held by a cell
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    String(String),
    Int(i64),
    Double(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
}

impl CellValue {
    pub fn kind(&self) -> ColumnKind {
        match self {
            CellValue::String(_) => ColumnKind::String,
            CellValue::Int(_) => ColumnKind::Int,
            CellValue::Double(_) => ColumnKind::Double,
            CellValue::Boolean(_) => ColumnKind::Boolean,
            CellValue::DateTime(_) => ColumnKind::DateTime,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }
}

// Doubles compare by bit pattern so a value always equals itself, NaN included.
impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::String(a), CellValue::String(b)) => a == b,
            (CellValue::Int(a), CellValue::Int(b)) => a == b,
            (CellValue::Double(a), CellValue::Double(b)) => a.to_bits() == b.to_bits(),
            (CellValue::Boolean(a), CellValue::Boolean(b)) => a == b,
            (CellValue::DateTime(a), CellValue::DateTime(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CellValue {}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => f.write_str(s),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Double(d) => write!(f, "{}", d),
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::DateTime(dt) => {
                f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Double(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for CellValue {
    fn from(value: DateTime<Utc>) -> Self {
        CellValue::DateTime(value)
    }
}

/// A value plus an optional human-readable rendering of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    value: CellValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display: Option<String>,
}

impl Cell {
    pub fn new(value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            display: None,
        }
    }

    pub fn with_display(value: impl Into<CellValue>, display: Option<String>) -> Self {
        Self {
            value: value.into(),
            display,
        }
    }

    pub fn value(&self) -> &CellValue {
        &self.value
    }

    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }

    /// Display string when present, otherwise the formatted value
    pub fn display_text(&self) -> String {
        match &self.display {
            Some(display) => display.clone(),
            None => self.value.to_string(),
        }
    }
}

/// How two rows with the same key are judged equal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowComparison {
    /// Values and display strings must both match
    #[default]
    ValuesAndDisplay,
    /// Only the underlying values are compared; display-only edits are ignored
    ValuesOnly,
}

/// A keyed, ordered list of cells. Rows never change after construction;
/// an edited record is a new `Row` with the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    key: String,
    cells: Vec<Cell>,
}

impl Row {
    pub fn new(key: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            key: key.into(),
            cells,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Compare cell content position by position under the given policy.
    /// Keys are not compared.
    pub fn content_eq(&self, other: &Row, comparison: RowComparison) -> bool {
        if self.cells.len() != other.cells.len() {
            return false;
        }

        match comparison {
            RowComparison::ValuesAndDisplay => self.cells == other.cells,
            RowComparison::ValuesOnly => self
                .cells
                .iter()
                .zip(&other.cells)
                .all(|(a, b)| a.value == b.value),
        }
    }
}

/// Column name and kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered column list of one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// The materialized `(schema, rows)` pair of one load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    schema: Schema,
    rows: Vec<Row>,
}

impl Snapshot {
    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        Self { schema, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Linear lookup by key
    pub fn find(&self, key: &str) -> Option<&Row> {
        self.rows.iter().find(|row| row.key() == key)
    }
}
