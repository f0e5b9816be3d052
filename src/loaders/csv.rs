//! Delimited-text loader backed by DuckDB's CSV reader

use super::convert::CellConverters;
use super::header::HeaderInfo;
use super::{finish_snapshot, SnapshotLoader};
use crate::config::HeaderCapitalization;
use crate::error::{Result, TabsyncError};
use crate::model::{Cell, Row, Snapshot};
use crate::watcher::WatchTarget;
use duckdb::types::ValueRef;
use duckdb::Connection;
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Delimiters considered by detection, in tie-break order
pub const CANDIDATE_DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// Pick the most frequent candidate delimiter in `line`; the earliest candidate wins ties
pub fn detect_delimiter(line: &str) -> Option<char> {
    let mut best: Option<(char, usize)> = None;
    for candidate in CANDIDATE_DELIMITERS {
        let count = line.matches(candidate).count();
        if count > 0 && best.map_or(true, |(_, top)| count > top) {
            best = Some((candidate, count));
        }
    }
    best.map(|(c, _)| c)
}

pub struct CsvLoader {
    path: PathBuf,
    capitalization: HeaderCapitalization,
    delimiter: Option<char>,
}

impl CsvLoader {
    pub fn new(path: impl Into<PathBuf>, capitalization: HeaderCapitalization) -> Self {
        Self {
            path: path.into(),
            capitalization,
            delimiter: None,
        }
    }

    /// Use a fixed delimiter instead of detecting one per load
    pub fn with_delimiter(mut self, delimiter: Option<char>) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn resolve_delimiter(&self) -> Result<char> {
        if let Some(delimiter) = self.delimiter {
            return Ok(delimiter);
        }

        let file = File::open(&self.path)?;
        let mut first_line = String::new();
        BufReader::new(file).read_line(&mut first_line)?;

        detect_delimiter(&first_line).ok_or_else(|| {
            TabsyncError::parse(
                &self.path,
                "Could not determine the delimiter from the header line",
            )
        })
    }

    /// Read header names and every record as text
    fn read_records(&self, delimiter: char) -> Result<(Vec<String>, Vec<Vec<String>>)> {
        let connection = Connection::open_in_memory()?;

        let path_str = self.path.to_string_lossy().replace('\'', "''");
        let delim = match delimiter {
            '\t' => "\\t".to_string(),
            '\'' => "''".to_string(),
            other => other.to_string(),
        };
        let create_view_sql = format!(
            "CREATE OR REPLACE VIEW csv_view AS SELECT * FROM read_csv('{}', delim='{}', header=true, all_varchar=true)",
            path_str, delim
        );
        connection
            .execute(&create_view_sql, [])
            .map_err(|e| self.convert_duckdb_error(e))?;

        let mut describe = connection.prepare("DESCRIBE csv_view")?;
        let names = describe
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let column_count = names.len();
        let mut select = connection.prepare("SELECT * FROM csv_view")?;
        let records = select
            .query_map([], |row| {
                let mut record = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    let value = match row.get_ref(i)? {
                        ValueRef::Null => String::new(),
                        ValueRef::Text(s) => String::from_utf8_lossy(s).to_string(),
                        other => format!("{:?}", other),
                    };
                    record.push(value);
                }
                Ok(record)
            })
            .map_err(|e| self.convert_duckdb_error(e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| self.convert_duckdb_error(e))?;

        Ok((names, records))
    }

    fn convert_duckdb_error(&self, error: duckdb::Error) -> TabsyncError {
        let error_msg = error.to_string();

        if error_msg.contains("CSV Error")
            || error_msg.contains("Invalid CSV")
            || error_msg.contains("Unterminated quoted field")
            || error_msg.contains("Could not convert")
        {
            TabsyncError::parse(&self.path, format!("Malformed CSV file: {}", error_msg))
        } else if error_msg.contains("UTF-8") || error_msg.contains("encoding") {
            TabsyncError::parse(&self.path, format!("File encoding error: {}", error_msg))
        } else if error_msg.contains("No files found") || error_msg.contains("does not exist") {
            TabsyncError::SourceNotFound {
                path: self.path.clone(),
            }
        } else {
            TabsyncError::DuckDb(error)
        }
    }
}

impl SnapshotLoader for CsvLoader {
    fn load(&self) -> Result<Snapshot> {
        let delimiter = self.resolve_delimiter()?;
        let (names, records) = self.read_records(delimiter)?;

        let header = HeaderInfo::from_header(&names, self.capitalization)
            .map_err(|message| TabsyncError::parse(&self.path, message))?;
        let converters = CellConverters::for_schema(&header.schema);

        let mut rows = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let mut cells = Vec::with_capacity(record.len());
            for (column, raw) in record.iter().enumerate() {
                let value = converters.from_text(column, raw).map_err(|message| {
                    TabsyncError::parse(
                        &self.path,
                        format!(
                            "Row {}, column '{}': {}",
                            index + 1,
                            names[column],
                            message
                        ),
                    )
                })?;
                cells.push(Cell::new(value));
            }

            let key = match header.key_index {
                Some(key_column) => record[key_column].clone(),
                None => index.to_string(),
            };
            rows.push(Row::new(key, cells));
        }

        debug!(
            "Read {} rows from {} (delimiter {:?})",
            rows.len(),
            self.path.display(),
            delimiter
        );
        finish_snapshot(&self.path, header.schema, rows)
    }

    fn watch_target(&self) -> WatchTarget {
        WatchTarget::file(&self.path)
    }

    fn source_path(&self) -> &Path {
        &self.path
    }
}
