//! Change synchronizer: debounces notifications and turns reloads into sink operations

use crate::differ::{diff, SchemaChanges};
use crate::error::Result;
use crate::loaders::SnapshotLoader;
use crate::model::{RowComparison, Schema, Snapshot};
use crate::sink::UpdateSink;
use crate::watcher::WatchTarget;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// A raw "this path may have changed" event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotification {
    pub path: PathBuf,
    pub observed_write_time: DateTime<Utc>,
}

impl ChangeNotification {
    pub fn new(path: impl Into<PathBuf>, observed_write_time: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            observed_write_time,
        }
    }

    /// Build a notification stamped with the path's modification time,
    /// or the current time when the path cannot be stat'ed.
    pub fn observe(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let observed_write_time = std::fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        Self {
            path,
            observed_write_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub suppression_window: Duration,
    /// Run one follow-up pass for a suppressed notification once the window elapses
    pub trailing_pass: bool,
    pub row_comparison: RowComparison,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            suppression_window: Duration::from_millis(crate::DEFAULT_SUPPRESSION_WINDOW_MS),
            trailing_pass: false,
            row_comparison: RowComparison::default(),
        }
    }
}

/// Suppression window keyed on the last applied write time
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: chrono::Duration,
    last_applied: Option<DateTime<Utc>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        let millis = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        Self {
            window: chrono::Duration::milliseconds(millis),
            last_applied: None,
        }
    }

    /// Negative differences (out-of-order events) are suppressed as well
    pub fn should_accept(&self, observed: DateTime<Utc>) -> bool {
        match self.last_applied {
            None => true,
            Some(last) => observed.signed_duration_since(last) >= self.window,
        }
    }

    /// Record `observed` as applied if it falls outside the window
    pub fn accept(&mut self, observed: DateTime<Utc>) -> bool {
        if self.should_accept(observed) {
            self.last_applied = Some(observed);
            true
        } else {
            false
        }
    }

    pub fn last_applied(&self) -> Option<DateTime<Utc>> {
        self.last_applied
    }
}

/// Counts of what one resynchronization pass sent to the sink
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub schema_changes: Option<SchemaChanges>,
    pub sink_failures: usize,
}

impl PassReport {
    pub fn schema_changed(&self) -> bool {
        self.schema_changes.is_some()
    }

    pub fn total_changes(&self) -> usize {
        self.added + self.updated + self.removed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Suppressed,
    LoadFailed { message: String },
    Applied(PassReport),
}

impl PassOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, PassOutcome::Applied(_))
    }
}

#[derive(Debug)]
struct SyncState {
    snapshot: Arc<Snapshot>,
    debouncer: Debouncer,
    deferred: Option<ChangeNotification>,
}

/// Owns the live snapshot of one source. Every pass runs under a single mutex.
pub struct ChangeSynchronizer {
    loader: Box<dyn SnapshotLoader>,
    options: SyncOptions,
    state: Mutex<SyncState>,
}

impl ChangeSynchronizer {
    pub fn new(loader: Box<dyn SnapshotLoader>, options: SyncOptions) -> Self {
        Self::with_snapshot(loader, options, Snapshot::empty())
    }

    pub fn with_snapshot(
        loader: Box<dyn SnapshotLoader>,
        options: SyncOptions,
        snapshot: Snapshot,
    ) -> Self {
        Self {
            loader,
            options,
            state: Mutex::new(SyncState {
                snapshot: Arc::new(snapshot),
                debouncer: Debouncer::new(options.suppression_window),
                deferred: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Load the first snapshot. Errors propagate; nothing is installed on failure.
    pub fn initial_load(&self) -> Result<Arc<Snapshot>> {
        let mut state = self.lock();
        let snapshot = Arc::new(self.loader.load()?);
        info!(
            "Loaded {} rows with {} columns from {}",
            snapshot.len(),
            snapshot.schema().len(),
            self.loader.source_path().display()
        );
        state.snapshot = Arc::clone(&snapshot);
        Ok(snapshot)
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.lock().snapshot)
    }

    pub fn columns(&self) -> Schema {
        self.lock().snapshot.schema().clone()
    }

    pub fn options(&self) -> SyncOptions {
        self.options
    }

    pub fn watch_target(&self) -> WatchTarget {
        self.loader.watch_target()
    }

    pub fn source_path(&self) -> &Path {
        self.loader.source_path()
    }

    pub fn has_deferred(&self) -> bool {
        self.lock().deferred.is_some()
    }

    pub fn handle_notification(
        &self,
        notification: &ChangeNotification,
        sink: &mut dyn UpdateSink,
    ) -> PassOutcome {
        let mut state = self.lock();

        if !state.debouncer.accept(notification.observed_write_time) {
            debug!(
                "Suppressed change notification for {} at {}",
                notification.path.display(),
                notification.observed_write_time
            );
            if self.options.trailing_pass {
                state.deferred = Some(notification.clone());
            }
            return PassOutcome::Suppressed;
        }

        state.deferred = None;
        self.run_pass(&mut state, sink)
    }

    /// Run a pass for a suppressed notification once the window has elapsed.
    /// Returns `None` when nothing was deferred or the window is still open.
    pub fn flush_deferred(
        &self,
        now: DateTime<Utc>,
        sink: &mut dyn UpdateSink,
    ) -> Option<PassOutcome> {
        if !self.options.trailing_pass {
            return None;
        }

        let mut state = self.lock();
        state.deferred.as_ref()?;
        if !state.debouncer.accept(now) {
            return None;
        }

        if let Some(deferred) = state.deferred.take() {
            debug!("Running trailing pass for {}", deferred.path.display());
        }
        Some(self.run_pass(&mut state, sink))
    }

    /// Force a pass regardless of the suppression window
    pub fn resync(&self, sink: &mut dyn UpdateSink) -> PassOutcome {
        let mut state = self.lock();
        self.run_pass(&mut state, sink)
    }

    fn run_pass(&self, state: &mut SyncState, sink: &mut dyn UpdateSink) -> PassOutcome {
        let new_snapshot = match self.loader.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    "Reload of {} failed, keeping previous snapshot: {}",
                    self.loader.source_path().display(),
                    e
                );
                return PassOutcome::LoadFailed {
                    message: e.to_string(),
                };
            }
        };

        let old_snapshot = Arc::clone(&state.snapshot);
        let mut report = PassReport::default();

        if old_snapshot.schema() != new_snapshot.schema() {
            let changes = SchemaChanges::between(old_snapshot.schema(), new_snapshot.schema());
            info!("Schema changed ({}), replacing all rows", changes);

            for row in old_snapshot.rows() {
                apply(&mut report, row.key(), || sink.remove_row(row.key()));
            }
            for row in new_snapshot.rows() {
                apply(&mut report, row.key(), || sink.add_row(row));
            }

            report.removed = old_snapshot.len();
            report.added = new_snapshot.len();
            report.schema_changes = Some(changes);
        } else {
            let delta = diff(
                old_snapshot.rows(),
                new_snapshot.rows(),
                self.options.row_comparison,
            );

            for row in &delta.removed {
                apply(&mut report, row.key(), || sink.remove_row(row.key()));
            }
            for row in &delta.updated {
                apply(&mut report, row.key(), || sink.replace_row(row));
            }
            for row in &delta.added {
                apply(&mut report, row.key(), || sink.add_row(row));
            }

            report.removed = delta.removed.len();
            report.updated = delta.updated.len();
            report.added = delta.added.len();
        }

        state.snapshot = Arc::new(new_snapshot);

        info!(
            "{}: {} added, {} updated, {} removed",
            self.loader.source_path().display(),
            report.added,
            report.updated,
            report.removed
        );
        if report.sink_failures > 0 {
            warn!(
                "{} sink operation(s) failed during pass; snapshot was still replaced",
                report.sink_failures
            );
        }

        PassOutcome::Applied(report)
    }
}

fn apply(report: &mut PassReport, key: &str, op: impl FnOnce() -> Result<()>) {
    if let Err(e) = op() {
        error!("Sink operation for row {} failed: {}", key, e);
        report.sink_failures += 1;
    }
}
