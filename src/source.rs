//! Data-source shell: what a host talks to

use crate::config::SourceConfig;
use crate::error::{Result, TabsyncError};
use crate::loaders::{self, SnapshotLoader};
use crate::model::{Schema, Snapshot};
use crate::pager::{Page, PageEnumerator};
use crate::sink::UpdateSink;
use crate::sync::{ChangeNotification, ChangeSynchronizer};
use crate::watcher::{FileWatcher, UpdateWorker};
use log::debug;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

/// One opened source: a synchronizer plus an optional fetch cursor and update worker
pub struct DataSource {
    config: SourceConfig,
    synchronizer: Arc<ChangeSynchronizer>,
    enumerator: Option<PageEnumerator>,
    worker: Option<UpdateWorker>,
}

impl std::fmt::Debug for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSource")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DataSource {
    /// Resolve the config, build its loader and run the initial load
    pub fn open(config: SourceConfig) -> Result<Self> {
        let loader = loaders::from_config(&config)?;
        Self::with_loader(config, loader)
    }

    /// Open with a caller-supplied loader. Path settings in `config` are not used.
    pub fn with_loader(config: SourceConfig, loader: Box<dyn SnapshotLoader>) -> Result<Self> {
        let synchronizer = Arc::new(ChangeSynchronizer::new(loader, config.sync_options()));
        synchronizer.initial_load()?;

        Ok(Self {
            config,
            synchronizer,
            enumerator: None,
            worker: None,
        })
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn columns(&self) -> Schema {
        self.synchronizer.columns()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.synchronizer.snapshot()
    }

    pub fn synchronizer(&self) -> &Arc<ChangeSynchronizer> {
        &self.synchronizer
    }

    /// Start a new fetch over the current snapshot
    pub fn prepare_fetch(&mut self) {
        self.enumerator = Some(PageEnumerator::new(self.synchronizer.snapshot()));
    }

    /// Next page of the current fetch. A zero hint falls back to the configured page size.
    pub fn next_page(&mut self, page_size_hint: usize) -> Page {
        let size = if page_size_hint == 0 {
            self.config.page_size
        } else {
            page_size_hint
        };

        let synchronizer = &self.synchronizer;
        self.enumerator
            .get_or_insert_with(|| PageEnumerator::new(synchronizer.snapshot()))
            .next_page(size)
    }

    /// Watch the backing file and push changes into `sink` until stopped.
    /// Changes written since `open` are caught up by one pass at start.
    pub fn start_updates(&mut self, sink: Box<dyn UpdateSink>) -> Result<()> {
        self.ensure_idle()?;

        let (sender, receiver) = mpsc::channel();
        let watcher = FileWatcher::start(self.synchronizer.watch_target(), sender)?;
        self.spawn_worker(Some(watcher), receiver, sink, true)
    }

    /// Drive updates from notifications produced by the host instead of the OS watcher
    pub fn start_updates_from(
        &mut self,
        receiver: Receiver<ChangeNotification>,
        sink: Box<dyn UpdateSink>,
    ) -> Result<()> {
        self.ensure_idle()?;
        self.spawn_worker(None, receiver, sink, false)
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.worker.is_some() {
            return Err(TabsyncError::invalid_input("Updates are already running"));
        }
        Ok(())
    }

    fn spawn_worker(
        &mut self,
        watcher: Option<FileWatcher>,
        receiver: Receiver<ChangeNotification>,
        sink: Box<dyn UpdateSink>,
        catch_up: bool,
    ) -> Result<()> {
        let worker = UpdateWorker::spawn(
            Arc::clone(&self.synchronizer),
            watcher,
            receiver,
            sink,
            catch_up,
        )?;
        self.worker = Some(worker);
        debug!(
            "Updates running for {}",
            self.synchronizer.source_path().display()
        );
        Ok(())
    }

    pub fn stop_updates(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }
    }

    pub fn is_updating(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for DataSource {
    fn drop(&mut self) {
        self.stop_updates();
    }
}
