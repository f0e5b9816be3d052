//! Live-update sink: where a synchronization pass sends its row operations

use crate::error::Result;
use crate::model::Row;
use crate::sync::PassReport;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// Receiver of incremental row operations.
///
/// A pass keeps calling the sink after an error, so implementations should
/// tolerate an `add_row` for a key they already hold.
pub trait UpdateSink: Send {
    fn add_row(&mut self, row: &Row) -> Result<()>;
    fn replace_row(&mut self, row: &Row) -> Result<()>;
    fn remove_row(&mut self, key: &str) -> Result<()>;

    /// Called once after each applied pass
    fn pass_completed(&mut self, _report: &PassReport) {}
}

/// A single sink call, in a form that can be recorded or printed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SinkOperation {
    Add { row: Row },
    Replace { row: Row },
    Remove { key: String },
}

impl SinkOperation {
    pub fn key(&self) -> &str {
        match self {
            SinkOperation::Add { row } | SinkOperation::Replace { row } => row.key(),
            SinkOperation::Remove { key } => key,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Sink that stores every operation and pass report it receives. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    operations: Arc<Mutex<Vec<SinkOperation>>>,
    reports: Arc<Mutex<Vec<PassReport>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self) -> MutexGuard<'_, Vec<SinkOperation>> {
        self.operations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn operations(&self) -> Vec<SinkOperation> {
        self.log().clone()
    }

    /// Drain the recorded operations
    pub fn take(&self) -> Vec<SinkOperation> {
        std::mem::take(&mut *self.log())
    }

    pub fn len(&self) -> usize {
        self.log().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log().is_empty()
    }

    pub fn reports(&self) -> Vec<PassReport> {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl UpdateSink for RecordingSink {
    fn add_row(&mut self, row: &Row) -> Result<()> {
        self.log().push(SinkOperation::Add { row: row.clone() });
        Ok(())
    }

    fn replace_row(&mut self, row: &Row) -> Result<()> {
        self.log().push(SinkOperation::Replace { row: row.clone() });
        Ok(())
    }

    fn remove_row(&mut self, key: &str) -> Result<()> {
        self.log().push(SinkOperation::Remove {
            key: key.to_string(),
        });
        Ok(())
    }

    fn pass_completed(&mut self, report: &PassReport) {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(report.clone());
    }
}

type PassCallback = Box<dyn FnMut(&PassReport) + Send>;

/// Adapts a closure into an `UpdateSink`
pub struct CallbackSink<F>
where
    F: FnMut(SinkOperation) -> Result<()> + Send,
{
    callback: F,
    on_pass: Option<PassCallback>,
}

impl<F> CallbackSink<F>
where
    F: FnMut(SinkOperation) -> Result<()> + Send,
{
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            on_pass: None,
        }
    }

    /// Also receive the report of every applied pass
    pub fn on_pass(mut self, callback: impl FnMut(&PassReport) + Send + 'static) -> Self {
        self.on_pass = Some(Box::new(callback));
        self
    }
}

impl<F> UpdateSink for CallbackSink<F>
where
    F: FnMut(SinkOperation) -> Result<()> + Send,
{
    fn add_row(&mut self, row: &Row) -> Result<()> {
        (self.callback)(SinkOperation::Add { row: row.clone() })
    }

    fn replace_row(&mut self, row: &Row) -> Result<()> {
        (self.callback)(SinkOperation::Replace { row: row.clone() })
    }

    fn remove_row(&mut self, key: &str) -> Result<()> {
        (self.callback)(SinkOperation::Remove {
            key: key.to_string(),
        })
    }

    fn pass_completed(&mut self, report: &PassReport) {
        if let Some(on_pass) = self.on_pass.as_mut() {
            on_pass(report);
        }
    }
}
