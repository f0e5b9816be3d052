//! Directory listing as a table of files

use super::{finish_snapshot, SnapshotLoader};
use crate::error::{Result, TabsyncError};
use crate::model::{Cell, Column, ColumnKind, Row, Schema, Snapshot};
use crate::watcher::WatchTarget;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub struct DirectoryLoader {
    path: PathBuf,
    recursive: bool,
}

impl DirectoryLoader {
    pub fn new(path: impl Into<PathBuf>, recursive: bool) -> Self {
        Self {
            path: path.into(),
            recursive,
        }
    }

    pub fn schema() -> Schema {
        Schema::new(vec![
            Column::new("Path", ColumnKind::String),
            Column::new("File", ColumnKind::String),
            Column::new("Type", ColumnKind::String),
        ])
    }
}

impl SnapshotLoader for DirectoryLoader {
    fn load(&self) -> Result<Snapshot> {
        if !self.path.is_dir() {
            return Err(TabsyncError::SourceNotFound {
                path: self.path.clone(),
            });
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut rows = Vec::new();

        for entry in WalkDir::new(&self.path)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.path)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            let file = entry.file_name().to_string_lossy().to_string();
            // Name of the directory holding the file
            let parent = entry
                .path()
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            rows.push(Row::new(
                relative.clone(),
                vec![Cell::new(relative), Cell::new(file), Cell::new(parent)],
            ));
        }

        rows.sort_by(|a, b| a.key().cmp(b.key()));
        finish_snapshot(&self.path, Self::schema(), rows)
    }

    fn watch_target(&self) -> WatchTarget {
        WatchTarget::directory(&self.path, self.recursive)
    }

    fn source_path(&self) -> &Path {
        &self.path
    }
}
