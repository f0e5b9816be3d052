//! JSON document loader: `{ "Columns": [...], "Rows": [...] }`

use super::convert::CellConverters;
use super::header::document_schema;
use super::{finish_snapshot, SnapshotLoader};
use crate::config::HeaderCapitalization;
use crate::error::{Result, TabsyncError};
use crate::model::{Cell, Row, Snapshot};
use crate::watcher::WatchTarget;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct JsonDocument {
    #[serde(rename = "Columns", alias = "columns")]
    columns: Option<Vec<JsonColumn>>,
    #[serde(rename = "Rows", alias = "rows")]
    rows: Option<Vec<JsonRow>>,
}

#[derive(Debug, Deserialize)]
struct JsonColumn {
    #[serde(rename = "Name", alias = "name")]
    name: String,
    #[serde(rename = "Type", alias = "type", default)]
    type_name: String,
}

#[derive(Debug, Deserialize)]
struct JsonRow {
    #[serde(rename = "Cells", alias = "cells", default)]
    cells: Vec<JsonCell>,
}

#[derive(Debug, Deserialize)]
struct JsonCell {
    #[serde(rename = "Value", alias = "value", default)]
    value: Value,
    #[serde(rename = "DisplayValue", alias = "displayValue", default)]
    display_value: Option<String>,
}

pub struct JsonLoader {
    path: PathBuf,
    capitalization: HeaderCapitalization,
}

impl JsonLoader {
    pub fn new(path: impl Into<PathBuf>, capitalization: HeaderCapitalization) -> Self {
        Self {
            path: path.into(),
            capitalization,
        }
    }

    /// Parse a document that is already in memory
    pub fn parse_str(&self, content: &str) -> Result<Snapshot> {
        let document: JsonDocument = serde_json::from_str(content)
            .map_err(|e| TabsyncError::parse(&self.path, format!("Invalid JSON: {}", e)))?;

        let (columns, json_rows) = match (document.columns, document.rows) {
            (Some(columns), Some(rows)) => (columns, rows),
            _ => return Err(TabsyncError::parse(&self.path, "Invalid JSON structure")),
        };

        let schema = document_schema(
            columns
                .iter()
                .map(|c| (c.name.as_str(), c.type_name.as_str())),
            self.capitalization,
        );
        let converters = CellConverters::for_schema(&schema);

        let mut rows = Vec::with_capacity(json_rows.len());
        for (index, json_row) in json_rows.iter().enumerate() {
            if json_row.cells.len() < schema.len() {
                return Err(TabsyncError::parse(
                    &self.path,
                    format!(
                        "Row {} has {} cells, expected {}",
                        index,
                        json_row.cells.len(),
                        schema.len()
                    ),
                ));
            }

            let mut cells = Vec::with_capacity(schema.len());
            for (column, cell) in json_row.cells.iter().take(schema.len()).enumerate() {
                let value = converters.from_json(column, &cell.value).map_err(|message| {
                    TabsyncError::parse(
                        &self.path,
                        format!("Row {}, column {}: {}", index, column, message),
                    )
                })?;
                cells.push(Cell::with_display(value, cell.display_value.clone()));
            }
            rows.push(Row::new(index.to_string(), cells));
        }

        finish_snapshot(&self.path, schema, rows)
    }
}

impl SnapshotLoader for JsonLoader {
    fn load(&self) -> Result<Snapshot> {
        let content = fs::read_to_string(&self.path)?;
        self.parse_str(&content)
    }

    fn watch_target(&self) -> WatchTarget {
        WatchTarget::file(&self.path)
    }

    fn source_path(&self) -> &Path {
        &self.path
    }
}
