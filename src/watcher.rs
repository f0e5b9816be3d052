//! Filesystem notification source and the worker that drains it

use crate::error::{Result, TabsyncError};
use crate::sink::UpdateSink;
use crate::sync::{ChangeNotification, ChangeSynchronizer, PassOutcome};
use chrono::Utc;
use log::{debug, info, warn};
use notify::event::EventKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    File,
    Directory { recursive: bool },
}

/// Path the notification source should observe for a given loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub path: PathBuf,
    pub kind: WatchKind,
}

impl WatchTarget {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: WatchKind::File,
        }
    }

    pub fn directory(path: impl Into<PathBuf>, recursive: bool) -> Self {
        Self {
            path: path.into(),
            kind: WatchKind::Directory { recursive },
        }
    }

    /// Directory registered with the OS watcher and its recursion mode
    fn registration(&self) -> (PathBuf, RecursiveMode) {
        match self.kind {
            WatchKind::File => {
                let parent = self
                    .path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                (parent.to_path_buf(), RecursiveMode::NonRecursive)
            }
            WatchKind::Directory { recursive: true } => {
                (self.path.clone(), RecursiveMode::Recursive)
            }
            WatchKind::Directory { recursive: false } => {
                (self.path.clone(), RecursiveMode::NonRecursive)
            }
        }
    }
}

/// Map one raw watcher event onto change notifications for `target`.
///
/// Access events are ignored. A file target only reacts to create or modify
/// events naming its own file. A directory target also reacts to removals and
/// emits one notification per event.
pub fn notifications_for(target: &WatchTarget, event: &Event) -> Vec<ChangeNotification> {
    let changed = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any | EventKind::Other
    );

    match target.kind {
        WatchKind::File => {
            let wanted = target.path.file_name();
            if changed && event.paths.iter().any(|p| p.file_name() == wanted) {
                vec![ChangeNotification::observe(&target.path)]
            } else {
                Vec::new()
            }
        }
        WatchKind::Directory { .. } => {
            if !changed && !matches!(event.kind, EventKind::Remove(_)) {
                return Vec::new();
            }
            let path = event
                .paths
                .first()
                .cloned()
                .unwrap_or_else(|| target.path.clone());
            // Entries keep their own mtime when moved in, so stamp with arrival time
            vec![ChangeNotification::new(path, Utc::now())]
        }
    }
}

/// Send the notifications for `event`, returning how many were delivered
fn forward_event(
    target: &WatchTarget,
    event: &Event,
    sender: &Sender<ChangeNotification>,
) -> usize {
    let mut delivered = 0;
    for notification in notifications_for(target, event) {
        match sender.send(notification) {
            Ok(()) => delivered += 1,
            Err(e) => debug!(
                "Dropped notification for {}: updates stopped",
                e.0.path.display()
            ),
        }
    }
    delivered
}

/// OS watcher that pushes notifications for one target onto a channel.
/// Dropping it unregisters the watch.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    pub fn start(target: WatchTarget, sender: Sender<ChangeNotification>) -> Result<Self> {
        let event_target = target.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => {
                    forward_event(&event_target, &event, &sender);
                }
                Err(e) => warn!("Watch error: {}", e),
            },
            Config::default(),
        )?;

        let (path, mode) = target.registration();
        watcher.watch(&path, mode)?;
        debug!("Watching {} ({:?})", path.display(), mode);

        Ok(Self { _watcher: watcher })
    }
}

/// Single consumer of the notification channel for one synchronizer
pub struct UpdateWorker {
    running: Arc<AtomicBool>,
    watcher: Option<FileWatcher>,
    handle: Option<JoinHandle<()>>,
}

impl UpdateWorker {
    /// Start draining `receiver` on a worker thread. With `catch_up`, the worker
    /// first runs one pass so writes that landed before the watch was registered
    /// still reach the sink.
    pub fn spawn(
        synchronizer: Arc<ChangeSynchronizer>,
        watcher: Option<FileWatcher>,
        receiver: Receiver<ChangeNotification>,
        mut sink: Box<dyn UpdateSink>,
        catch_up: bool,
    ) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = std::thread::Builder::new()
            .name("tabsync-updates".to_string())
            .spawn(move || {
                if catch_up {
                    let outcome = synchronizer.resync(sink.as_mut());
                    report_outcome(outcome, sink.as_mut());
                }
                drain_notifications(&synchronizer, &receiver, sink.as_mut(), &flag);
            })
            .map_err(TabsyncError::Io)?;

        info!("Live updates started");
        Ok(Self {
            running,
            watcher,
            handle: Some(handle),
        })
    }

    /// Stop the worker. Notifications still queued are discarded.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.watcher.take();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Update worker panicked");
            }
            info!("Live updates stopped");
        }
    }
}

impl Drop for UpdateWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run until `running` is cleared or every sender is gone
fn drain_notifications(
    synchronizer: &ChangeSynchronizer,
    receiver: &Receiver<ChangeNotification>,
    sink: &mut dyn UpdateSink,
    running: &AtomicBool,
) {
    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(POLL_INTERVAL) {
            Ok(notification) => {
                let outcome = synchronizer.handle_notification(&notification, sink);
                report_outcome(outcome, sink);
            }
            Err(RecvTimeoutError::Timeout) => {
                if let Some(outcome) = synchronizer.flush_deferred(Utc::now(), sink) {
                    report_outcome(outcome, sink);
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Notification channel closed");
                break;
            }
        }
    }
}

fn report_outcome(outcome: PassOutcome, sink: &mut dyn UpdateSink) {
    match outcome {
        PassOutcome::Applied(report) => sink.pass_completed(&report),
        PassOutcome::LoadFailed { message } => debug!("Pass skipped: {}", message),
        PassOutcome::Suppressed => {}
    }
}
