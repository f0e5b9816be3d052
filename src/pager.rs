//! Cursor over a materialized snapshot that serves bounded pages

use crate::model::{Row, Snapshot};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumeratorState {
    NotStarted,
    InProgress,
    Exhausted,
}

/// One bounded batch of rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub rows: Vec<Row>,
    pub has_more: bool,
}

impl Page {
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            has_more: false,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Serves the snapshot it was created from, even after the source installs
/// a newer one.
#[derive(Debug)]
pub struct PageEnumerator {
    snapshot: Arc<Snapshot>,
    position: usize,
    state: EnumeratorState,
}

impl PageEnumerator {
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        Self {
            snapshot,
            position: 0,
            state: EnumeratorState::NotStarted,
        }
    }

    /// Return up to `max_size` rows from the cursor. A size of 0 is treated as 1.
    pub fn next_page(&mut self, max_size: usize) -> Page {
        if self.state == EnumeratorState::Exhausted {
            return Page::empty();
        }

        let rows = self.snapshot.rows();
        let end = self.position.saturating_add(max_size.max(1)).min(rows.len());
        let page_rows = rows[self.position..end].to_vec();
        self.position = end;

        let has_more = self.position < rows.len();
        self.state = if has_more {
            EnumeratorState::InProgress
        } else {
            EnumeratorState::Exhausted
        };

        Page {
            rows: page_rows,
            has_more,
        }
    }

    pub fn state(&self) -> EnumeratorState {
        self.state
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.snapshot.len() - self.position
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }
}
