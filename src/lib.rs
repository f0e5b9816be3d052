//! # tabsync
//!
//! Keeps a flat-file dataset available as a paged, key-addressable row table
//! and pushes minimal add/replace/remove operations to a live-update sink
//! whenever the backing file changes on disk.

pub mod cli;
pub mod commands;
pub mod config;
pub mod differ;
pub mod error;
pub mod loaders;
pub mod model;
pub mod output;
pub mod pager;
pub mod sink;
pub mod source;
pub mod sync;
pub mod watcher;

pub use config::{SourceConfig, SourceFormat};
pub use differ::{diff, Delta, SchemaChanges};
pub use error::{Result, TabsyncError};
pub use model::{Cell, CellValue, Column, ColumnKind, Row, RowComparison, Schema, Snapshot};
pub use pager::{Page, PageEnumerator};
pub use sink::{RecordingSink, SinkOperation, UpdateSink};
pub use source::DataSource;
pub use sync::{ChangeNotification, ChangeSynchronizer, PassOutcome, PassReport, SyncOptions};

/// Rows per page when the host gives no size hint
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Minimum gap between two applied change notifications
pub const DEFAULT_SUPPRESSION_WINDOW_MS: u64 = 500;
