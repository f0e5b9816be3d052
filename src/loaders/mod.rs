//! Parser collaborators that turn a backing file into a snapshot

pub mod convert;
pub mod csv;
pub mod directory;
pub mod header;
pub mod json;
pub mod operators;
pub mod xml;

use crate::config::{SourceConfig, SourceFormat};
use crate::error::{Result, TabsyncError};
use crate::model::{Row, Schema, Snapshot};
use crate::watcher::WatchTarget;
use std::collections::HashSet;
use std::path::Path;

pub use self::csv::CsvLoader;
pub use directory::DirectoryLoader;
pub use json::JsonLoader;
pub use operators::{ColumnOperator, DerivedColumnsLoader, Divide};
pub use xml::XmlLoader;

/// Produces a full snapshot of one source on demand
pub trait SnapshotLoader: Send + Sync {
    fn load(&self) -> Result<Snapshot>;

    /// What the notification source should watch to see this source change
    fn watch_target(&self) -> WatchTarget;

    fn source_path(&self) -> &Path;
}

/// Build the loader a config asks for
pub fn from_config(config: &SourceConfig) -> Result<Box<dyn SnapshotLoader>> {
    let resolved = config.resolve()?;
    let capitalization = config.header_capitalization;

    let loader: Box<dyn SnapshotLoader> = match resolved.format {
        SourceFormat::Csv => Box::new(
            CsvLoader::new(resolved.path, capitalization)
                .with_delimiter(config.delimiter_char()?),
        ),
        SourceFormat::Json => Box::new(JsonLoader::new(resolved.path, capitalization)),
        SourceFormat::Xml => Box::new(XmlLoader::new(resolved.path, capitalization)),
        SourceFormat::Directory => Box::new(DirectoryLoader::new(resolved.path, config.recursive)),
    };

    if config.operators.is_empty() {
        return Ok(loader);
    }
    Ok(Box::new(DerivedColumnsLoader::new(
        loader,
        config.operators.clone(),
    )))
}

/// Check the rows against the schema and key uniqueness before building the snapshot
pub(crate) fn finish_snapshot(path: &Path, schema: Schema, rows: Vec<Row>) -> Result<Snapshot> {
    let mut seen = HashSet::with_capacity(rows.len());
    for row in &rows {
        if row.len() != schema.len() {
            return Err(TabsyncError::parse(
                path,
                format!(
                    "Row '{}' has {} cells, expected {}",
                    row.key(),
                    row.len(),
                    schema.len()
                ),
            ));
        }
        if !seen.insert(row.key()) {
            return Err(TabsyncError::parse(
                path,
                format!("Duplicate row key '{}'", row.key()),
            ));
        }
    }

    Ok(Snapshot::new(schema, rows))
}
