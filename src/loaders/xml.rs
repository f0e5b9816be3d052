//! XML document loader
//!
//! Expected layout:
//!
//! ```xml
//! <Table>
//!   <Columns><Column><Name>Id</Name><Type>int</Type></Column></Columns>
//!   <Rows><Row><Cells><Cell><Value>1</Value><DisplayValue>one</DisplayValue></Cell></Cells></Row></Rows>
//! </Table>
//! ```

use super::convert::CellConverters;
use super::header::document_schema;
use super::{finish_snapshot, SnapshotLoader};
use crate::config::HeaderCapitalization;
use crate::error::{Result, TabsyncError};
use crate::model::{Cell, Row, Snapshot};
use crate::watcher::WatchTarget;
use roxmltree::{Document, Node};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub struct XmlLoader {
    path: PathBuf,
    capitalization: HeaderCapitalization,
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn children<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Vec<Node<'a, 'input>> {
    node.children()
        .filter(|n| n.is_element() && n.tag_name().name() == name)
        .collect()
}

/// Text of a child element; an empty element yields an empty string
fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name).map(|n| n.text().unwrap_or_default().to_string())
}

impl XmlLoader {
    pub fn new(path: impl Into<PathBuf>, capitalization: HeaderCapitalization) -> Self {
        Self {
            path: path.into(),
            capitalization,
        }
    }

    pub fn parse_str(&self, content: &str) -> Result<Snapshot> {
        let document = Document::parse(content)?;
        let root = document.root_element();

        let columns_node = child(root, "Columns").ok_or_else(|| {
            TabsyncError::parse(&self.path, "Invalid XML structure: missing Columns")
        })?;
        let columns: Vec<(String, String)> = children(columns_node, "Column")
            .into_iter()
            .map(|column| {
                (
                    child_text(column, "Name").unwrap_or_default(),
                    child_text(column, "Type").unwrap_or_default(),
                )
            })
            .collect();

        let schema = document_schema(
            columns.iter().map(|(n, t)| (n.as_str(), t.as_str())),
            self.capitalization,
        );
        let converters = CellConverters::for_schema(&schema);

        let row_nodes: Vec<Node> = child(root, "Rows")
            .map(|rows| children(rows, "Row"))
            .unwrap_or_default();

        let mut rows = Vec::with_capacity(row_nodes.len());
        for (index, row_node) in row_nodes.into_iter().enumerate() {
            let cell_nodes: Vec<Node> = child(row_node, "Cells")
                .map(|cells| children(cells, "Cell"))
                .unwrap_or_default();

            if cell_nodes.len() != schema.len() {
                return Err(TabsyncError::parse(
                    &self.path,
                    format!(
                        "Row {} has {} cells, expected {}",
                        index,
                        cell_nodes.len(),
                        schema.len()
                    ),
                ));
            }

            let mut cells = Vec::with_capacity(cell_nodes.len());
            for (column, cell_node) in cell_nodes.into_iter().enumerate() {
                let raw = child_text(cell_node, "Value");
                let json = raw.clone().map(Value::String).unwrap_or(Value::Null);
                let value = converters.from_json(column, &json).map_err(|message| {
                    TabsyncError::parse(
                        &self.path,
                        format!("Row {}, column {}: {}", index, column, message),
                    )
                })?;
                let display = child_text(cell_node, "DisplayValue").or(raw);
                cells.push(Cell::with_display(value, display));
            }
            rows.push(Row::new(index.to_string(), cells));
        }

        finish_snapshot(&self.path, schema, rows)
    }
}

impl SnapshotLoader for XmlLoader {
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
