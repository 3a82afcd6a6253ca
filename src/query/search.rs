//! Incremental cross-chunk search
//!
//! One scan at a time: a new search bumps the generation counter and the
//! superseded worker notices at chunk granularity. A scan that catches up
//! with the loader parks on its progress condvar and resumes as chunks
//! arrive; it never blocks the caller's thread.

use crate::ingest::loader::LoadShared;
use crate::table::{RowIndex, RowStore};
use memchr::memmem;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Which columns a search inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    AllColumns,
    /// A single column by index
    Column(usize),
}

/// A single hit, in ascending (row, column) order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub row: RowIndex,
    pub column: usize,
}

/// Streamed search notifications
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    Match(SearchMatch),
    /// The scan covered every row of the (finished) load
    Finished { matches: u64 },
    /// The scan was superseded by a new search or explicitly cancelled
    Cancelled,
    /// The scan could not continue (e.g. an eviction reload hit an I/O
    /// error); matches already emitted remain valid
    Failed { message: String },
}

/// Case-insensitive substring search over the row store
pub struct SearchEngine {
    store: Arc<RowStore>,
    shared: Arc<LoadShared>,
    /// Bumped on every new search or cancel; a worker holding a stale
    /// generation stops at its next chunk boundary
    generation: Arc<AtomicU64>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SearchEngine {
    pub(crate) fn new(store: Arc<RowStore>, shared: Arc<LoadShared>) -> Self {
        Self {
            store,
            shared,
            generation: Arc::new(AtomicU64::new(0)),
            worker: Mutex::new(None),
        }
    }

    /// Start an incremental scan from row 0, superseding any scan in
    /// progress. Matching is a case-insensitive substring test per field.
    pub fn search(&self, term: &str, scope: SearchScope) -> Receiver<SearchEvent> {
        let generation = Arc::clone(&self.generation);
        let my_generation = generation.fetch_add(1, Ordering::SeqCst) + 1;
        // Unpark a superseded scan waiting on load progress.
        self.shared.notify();

        let (tx, rx) = mpsc::channel();
        let store = Arc::clone(&self.store);
        let shared = Arc::clone(&self.shared);
        let needle = term.to_lowercase();

        tracing::debug!(term = %needle, ?scope, "search started");
        let handle = std::thread::spawn(move || {
            run_scan(store, shared, generation, my_generation, needle, scope, tx)
        });
        *self.worker.lock() = Some(handle);
        rx
    }

    /// Stop the in-flight scan promptly (checked at chunk granularity)
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.notify();
    }
}

fn run_scan(
    store: Arc<RowStore>,
    shared: Arc<LoadShared>,
    generation: Arc<AtomicU64>,
    my_generation: u64,
    needle: String,
    scope: SearchScope,
    tx: Sender<SearchEvent>,
) {
    let finder = memmem::Finder::new(needle.as_bytes());
    let mut next_ordinal = 0;
    let mut matches = 0u64;

    loop {
        if generation.load(Ordering::SeqCst) != my_generation {
            let _ = tx.send(SearchEvent::Cancelled);
            return;
        }

        if next_ordinal < store.chunk_count() {
            let Some(meta) = store.chunk_meta(next_ordinal) else {
                break;
            };
            let rows = match store.chunk_rows(next_ordinal) {
                Ok(rows) => rows,
                Err(err) => {
                    let _ = tx.send(SearchEvent::Failed {
                        message: err.to_string(),
                    });
                    return;
                }
            };

            for (offset, row) in rows.iter().enumerate() {
                let row_index = meta.first_row + offset as u64;
                let mut emit = |column: usize, matches: &mut u64| {
                    *matches += 1;
                    tx.send(SearchEvent::Match(SearchMatch {
                        row: row_index,
                        column,
                    }))
                    .is_ok()
                };

                match scope {
                    SearchScope::AllColumns => {
                        for (column, field) in row.fields().iter().enumerate() {
                            if field_matches(&finder, field) && !emit(column, &mut matches) {
                                // Collaborator dropped the receiver; stop quietly.
                                return;
                            }
                        }
                    }
                    SearchScope::Column(column) => {
                        if let Some(field) = row.field(column)
                            && field_matches(&finder, field)
                            && !emit(column, &mut matches)
                        {
                            return;
                        }
                    }
                }
            }
            next_ordinal += 1;
        } else if shared.is_terminal() {
            break;
        } else {
            // Caught up with the loader: register interest and resume when
            // the next chunk lands (or the load reaches a terminal state).
            shared.wait_for_wakeup(Duration::from_millis(100));
        }
    }

    tracing::debug!(matches, "search finished");
    let _ = tx.send(SearchEvent::Finished { matches });
}

/// Case-insensitive substring test for one field
fn field_matches(finder: &memmem::Finder<'_>, field: &str) -> bool {
    finder.find(field.to_lowercase().as_bytes()).is_some()
}
