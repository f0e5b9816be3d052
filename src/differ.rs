//! Snapshot differ: keyed row deltas and schema change classification

use crate::model::{Column, ColumnKind, Row, RowComparison, Schema};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;

/// Rows that differ between two loads of the same dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Delta {
    /// Rows whose key only exists on the new side, in new-side order
    pub added: Vec<Row>,
    /// New version of rows whose content changed, in new-side order
    pub updated: Vec<Row>,
    /// Rows whose key only exists on the old side, in old-side order
    pub removed: Vec<Row>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    pub fn total_changes(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} updated, {} removed",
            self.added.len(),
            self.updated.len(),
            self.removed.len()
        )
    }
}

/// Compute the keyed delta between two row collections.
///
/// Both inputs are assumed to have unique keys. Neither input is modified.
pub fn diff(old: &[Row], new: &[Row], comparison: RowComparison) -> Delta {
    let old_index: IndexMap<&str, &Row> = old.iter().map(|row| (row.key(), row)).collect();
    let new_index: IndexMap<&str, &Row> = new.iter().map(|row| (row.key(), row)).collect();

    let added = new
        .iter()
        .filter(|row| !old_index.contains_key(row.key()))
        .cloned()
        .collect();

    let removed = old
        .iter()
        .filter(|row| !new_index.contains_key(row.key()))
        .cloned()
        .collect();

    let updated = new
        .par_iter()
        .filter_map(|row| {
            let before = old_index.get(row.key())?;
            if before.content_eq(row, comparison) {
                None
            } else {
                Some(row.clone())
            }
        })
        .collect();

    Delta {
        added,
        updated,
        removed,
    }
}

/// Column appended at the end of the schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnAddition {
    pub name: String,
    pub kind: ColumnKind,
    pub position: usize,
}

/// Column dropped from the end of the schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRemoval {
    pub name: String,
    pub kind: ColumnKind,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRename {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindChange {
    pub column: String,
    pub from: ColumnKind,
    pub to: ColumnKind,
}

/// Same columns in a different order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnOrderChange {
    pub before: Vec<String>,
    pub after: Vec<String>,
}

/// Positional classification of how a schema changed between two loads.
///
/// Purely descriptive: any schema change still forces a full replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaChanges {
    pub column_order: Option<ColumnOrderChange>,
    pub columns_added: Vec<ColumnAddition>,
    pub columns_removed: Vec<ColumnRemoval>,
    pub columns_renamed: Vec<ColumnRename>,
    pub kind_changes: Vec<KindChange>,
}

impl SchemaChanges {
    pub fn between(old: &Schema, new: &Schema) -> Self {
        let old = old.columns();
        let new = new.columns();
        let mut changes = SchemaChanges::default();

        let old_names: Vec<String> = old.iter().map(|c| c.name.clone()).collect();
        let new_names: Vec<String> = new.iter().map(|c| c.name.clone()).collect();

        if old_names != new_names && old.len() == new.len() {
            let mut old_sorted = old_names.clone();
            let mut new_sorted = new_names.clone();
            old_sorted.sort();
            new_sorted.sort();

            if old_sorted == new_sorted {
                changes.column_order = Some(ColumnOrderChange {
                    before: old_names,
                    after: new_names,
                });
                changes.kind_changes = Self::kind_changes_by_name(old, new);
                return changes;
            }
        }

        if new.len() > old.len() {
            for (position, col) in new.iter().enumerate().skip(old.len()) {
                changes.columns_added.push(ColumnAddition {
                    name: col.name.clone(),
                    kind: col.kind,
                    position,
                });
            }
        } else {
            for (position, col) in old.iter().enumerate().skip(new.len()) {
                changes.columns_removed.push(ColumnRemoval {
                    name: col.name.clone(),
                    kind: col.kind,
                    position,
                });
            }
        }

        for (before, after) in old.iter().zip(new) {
            if before.name != after.name {
                changes.columns_renamed.push(ColumnRename {
                    from: before.name.clone(),
                    to: after.name.clone(),
                });
            }
            if before.kind != after.kind {
                changes.kind_changes.push(KindChange {
                    column: after.name.clone(),
                    from: before.kind,
                    to: after.kind,
                });
            }
        }

        changes
    }

    fn kind_changes_by_name(old: &[Column], new: &[Column]) -> Vec<KindChange> {
        new.iter()
            .filter_map(|after| {
                let before = old.iter().find(|c| c.name == after.name)?;
                (before.kind != after.kind).then(|| KindChange {
                    column: after.name.clone(),
                    from: before.kind,
                    to: after.kind,
                })
            })
            .collect()
    }

    pub fn has_changes(&self) -> bool {
        self.column_order.is_some()
            || !self.columns_added.is_empty()
            || !self.columns_removed.is_empty()
            || !self.columns_renamed.is_empty()
            || !self.kind_changes.is_empty()
    }
}

impl fmt::Display for SchemaChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_changes() {
            return f.write_str("no schema changes");
        }

        let mut parts = Vec::new();
        if self.column_order.is_some() {
            parts.push("columns reordered".to_string());
        }
        if !self.columns_added.is_empty() {
            parts.push(format!("{} column(s) added", self.columns_added.len()));
        }
        if !self.columns_removed.is_empty() {
            parts.push(format!("{} column(s) removed", self.columns_removed.len()));
        }
        if !self.columns_renamed.is_empty() {
            parts.push(format!("{} column(s) renamed", self.columns_renamed.len()));
        }
        if !self.kind_changes.is_empty() {
            parts.push(format!("{} type change(s)", self.kind_changes.len()));
        }
        f.write_str(&parts.join(", "))
    }
}
