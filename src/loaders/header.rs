//! Header conventions shared by the file loaders

use crate::config::HeaderCapitalization;
use crate::model::{Column, ColumnKind, Schema};

/// Schema derived from a delimited-text header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInfo {
    /// Position of the column declared as `name::key`, if any
    pub key_index: Option<usize>,
    pub schema: Schema,
}

impl HeaderInfo {
    /// Build the schema from raw header cells of the form `name` or `name::type`.
    /// Errors on a second `key` column.
    pub fn from_header<S: AsRef<str>>(
        header: &[S],
        capitalization: HeaderCapitalization,
    ) -> Result<Self, String> {
        let mut key_index = None;
        let mut columns = Vec::with_capacity(header.len());

        for (i, raw) in header.iter().enumerate() {
            let (name, declared) = split_declared_type(raw.as_ref());

            if declared == Some("key") {
                if let Some(first) = key_index {
                    return Err(format!(
                        "Duplicate key definition at column {} and column {}",
                        first, i
                    ));
                }
                key_index = Some(i);
            }

            columns.push(Column::new(
                capitalization.apply(name),
                csv_column_kind(declared),
            ));
        }

        Ok(Self {
            key_index,
            schema: Schema::new(columns),
        })
    }
}

/// Split `name::type` at the first `::`
pub fn split_declared_type(raw: &str) -> (&str, Option<&str>) {
    match raw.find("::") {
        Some(idx) => (&raw[..idx], Some(&raw[idx + 2..])),
        None => (raw, None),
    }
}

/// Kind for a delimited-text type tag. Unknown, missing and `key` map to string.
pub fn csv_column_kind(declared: Option<&str>) -> ColumnKind {
    match declared {
        Some("bool") => ColumnKind::Boolean,
        Some("datetime") => ColumnKind::DateTime,
        Some("double") => ColumnKind::Double,
        Some("int") => ColumnKind::Int,
        _ => ColumnKind::String,
    }
}

/// Kind for a JSON/XML column type name, case-insensitive
pub fn document_column_kind(type_name: &str) -> ColumnKind {
    match type_name.trim().to_lowercase().as_str() {
        "int" => ColumnKind::Int,
        "datetime" => ColumnKind::DateTime,
        "double" => ColumnKind::Double,
        "boolean" => ColumnKind::Boolean,
        _ => ColumnKind::String,
    }
}

/// Build a schema from `(name, type name)` pairs of a JSON or XML document
pub fn document_schema<'a, I>(columns: I, capitalization: HeaderCapitalization) -> Schema
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    Schema::new(
        columns
            .into_iter()
            .map(|(name, type_name)| {
                Column::new(capitalization.apply(name), document_column_kind(type_name))
            })
            .collect(),
    )
}
