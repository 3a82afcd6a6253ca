//! Virtual view: windowed, non-blocking reads for the renderer
//!
//! The presentation layer renders only the visible window and re-queries
//! after each progress notification; nothing here ever waits on the
//! ingestion worker.

use crate::error::Result;
use crate::ingest::loader::LoadShared;
use crate::ingest::LoadState;
use crate::table::{Row, RowIndex, RowStore};
use std::sync::Arc;

/// Result of a windowed query
#[derive(Debug, Clone)]
pub struct RowWindow {
    /// Logical index of the first returned row
    pub first_row: RowIndex,
    pub rows: Vec<Row>,
    /// True when the requested range ran past the loaded extent and more
    /// rows may still arrive; the renderer should re-query on progress
    pub pending: bool,
}

/// Best current total row count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCountEstimate {
    pub rows: u64,
    /// Exact once the load has completed, otherwise a running count
    pub exact: bool,
}

/// Read-only windowed query surface over the row store
pub struct VirtualView {
    store: Arc<RowStore>,
    shared: Arc<LoadShared>,
}

impl VirtualView {
    pub(crate) fn new(store: Arc<RowStore>, shared: Arc<LoadShared>) -> Self {
        Self { store, shared }
    }

    /// Rows currently available for `[first, first + count)`. Ranges past
    /// the loaded extent return the available prefix with `pending` set.
    pub fn visible_rows(&self, first: RowIndex, count: usize) -> Result<RowWindow> {
        // Terminal state is read before the row count: a load finishing in
        // between makes `pending` spuriously true for one query, never
        // spuriously false.
        let may_grow = !self.shared.is_terminal();
        let loaded = self.store.row_count();

        let requested_end = first.saturating_add(count as u64);
        let start = first.min(loaded);
        let end = requested_end.min(loaded);
        let rows = self.store.get_rows(start, end)?;

        Ok(RowWindow {
            first_row: start,
            rows,
            pending: may_grow && requested_end > loaded,
        })
    }

    /// Best current total: exact once loading completed, running otherwise
    pub fn total_rows_estimate(&self) -> RowCountEstimate {
        match self.shared.state() {
            LoadState::Completed { total_rows, .. } => RowCountEstimate {
                rows: total_rows,
                exact: true,
            },
            _ => RowCountEstimate {
                rows: self.store.row_count(),
                exact: false,
            },
        }
    }
}
