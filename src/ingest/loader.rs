//! Background load coordinator
//!
//! Runs the chunk reader on a worker thread, appends completed chunks to
//! the row store in file order, and publishes progress over an mpsc
//! channel. All file I/O happens on the worker; errors are captured into
//! [`LoadState`] instead of crossing the thread boundary. Cancellation is
//! cooperative, checked between chunks.

use crate::config::TableConfig;
use crate::error::Result;
use crate::ingest::ChunkReader;
use crate::table::{RowStore, Schema};
use parking_lot::{Condvar, Mutex, RwLock};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Authoritative progress/status record for one background load
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LoadState {
    NotStarted,
    Loading {
        bytes_read: u64,
        total_bytes: u64,
        rows_loaded: u64,
    },
    Completed {
        total_rows: u64,
        malformed_rows: u64,
    },
    Failed {
        message: String,
    },
    Cancelled {
        rows_loaded: u64,
    },
}

impl LoadState {
    /// True once the load can no longer make progress
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoadState::Completed { .. } | LoadState::Failed { .. } | LoadState::Cancelled { .. }
        )
    }

    /// Fraction of the file consumed, when known
    pub fn progress_fraction(&self) -> Option<f64> {
        match self {
            LoadState::Loading {
                bytes_read,
                total_bytes,
                ..
            } if *total_bytes > 0 => Some(*bytes_read as f64 / *total_bytes as f64),
            LoadState::Completed { .. } => Some(1.0),
            _ => None,
        }
    }
}

/// Notifications pushed to the UI collaborator while a load runs
#[derive(Debug, Clone)]
pub enum LoadEvent {
    Started {
        total_bytes: u64,
    },
    /// Column schema, sent once as soon as the file head has been read
    Schema(Arc<Schema>),
    Progress {
        bytes_read: u64,
        total_bytes: u64,
        rows_loaded: u64,
    },
    Completed {
        total_rows: u64,
        malformed_rows: u64,
    },
    Failed {
        message: String,
    },
    Cancelled {
        rows_loaded: u64,
    },
}

/// State shared between the loader worker and its consumers
pub(crate) struct LoadShared {
    state: RwLock<LoadState>,
    cancel: AtomicBool,
    progress: Mutex<()>,
    wakeup: Condvar,
}

impl LoadShared {
    fn new() -> Self {
        Self {
            state: RwLock::new(LoadState::NotStarted),
            cancel: AtomicBool::new(false),
            progress: Mutex::new(()),
            wakeup: Condvar::new(),
        }
    }

    pub(crate) fn state(&self) -> LoadState {
        self.state.read().clone()
    }

    pub(crate) fn is_terminal(&self) -> bool {
        self.state.read().is_terminal()
    }

    fn set_state(&self, state: LoadState) {
        *self.state.write() = state;
    }

    /// Wake anything parked on load progress (search scans that caught up
    /// to the loaded extent register interest here instead of polling)
    pub(crate) fn notify(&self) {
        let _guard = self.progress.lock();
        self.wakeup.notify_all();
    }

    /// Park until the next progress notification or `timeout`. Only worker
    /// threads wait here; the consumer-facing surface never blocks.
    pub(crate) fn wait_for_wakeup(&self, timeout: Duration) {
        let mut guard = self.progress.lock();
        self.wakeup.wait_for(&mut guard, timeout);
    }
}

enum IngestEnd {
    Completed { total_rows: u64, malformed_rows: u64 },
    Cancelled { rows_loaded: u64 },
}

/// Handle to a background load: owns the worker thread, the shared load
/// state, and the row store chunks are materialized into.
///
/// Dropping the coordinator cancels the load and joins the worker.
pub struct LoadCoordinator {
    store: Arc<RowStore>,
    shared: Arc<LoadShared>,
    worker: Option<JoinHandle<()>>,
}

impl LoadCoordinator {
    /// Transition to Loading and spawn the ingestion worker. The returned
    /// receiver delivers progress and terminal events; dropping it only
    /// stops notifications, never the load.
    pub fn start(path: PathBuf, config: TableConfig) -> (Self, Receiver<LoadEvent>) {
        let store = Arc::new(RowStore::new(path.clone(), config.clone()));
        let shared = Arc::new(LoadShared::new());
        shared.set_state(LoadState::Loading {
            bytes_read: 0,
            total_bytes: 0,
            rows_loaded: 0,
        });

        let (tx, rx) = mpsc::channel();
        let worker = {
            let store = Arc::clone(&store);
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || run_loader(store, shared, tx, path, config))
        };

        (
            Self {
                store,
                shared,
                worker: Some(worker),
            },
            rx,
        )
    }

    /// Current load state (non-blocking)
    pub fn state(&self) -> LoadState {
        self.shared.state()
    }

    /// The row store chunks are appended into
    pub fn store(&self) -> Arc<RowStore> {
        Arc::clone(&self.store)
    }

    pub(crate) fn shared(&self) -> Arc<LoadShared> {
        Arc::clone(&self.shared)
    }

    /// Request the worker stop after its current chunk. Partially loaded
    /// rows remain queryable.
    pub fn cancel(&self) {
        self.shared.cancel.store(true, Ordering::Release);
    }

    /// True while the worker is still ingesting
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Wait for the worker to exit (terminal state reached). Intended for
    /// tests and shutdown paths, not the rendering thread.
    pub fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for LoadCoordinator {
    fn drop(&mut self) {
        self.cancel();
        self.join();
    }
}

fn run_loader(
    store: Arc<RowStore>,
    shared: Arc<LoadShared>,
    tx: Sender<LoadEvent>,
    path: PathBuf,
    config: TableConfig,
) {
    match ingest(&store, &shared, &tx, &path, config) {
        Ok(IngestEnd::Completed {
            total_rows,
            malformed_rows,
        }) => {
            tracing::info!(total_rows, malformed_rows, path = %path.display(), "load completed");
            shared.set_state(LoadState::Completed {
                total_rows,
                malformed_rows,
            });
            let _ = tx.send(LoadEvent::Completed {
                total_rows,
                malformed_rows,
            });
        }
        Ok(IngestEnd::Cancelled { rows_loaded }) => {
            tracing::info!(rows_loaded, "load cancelled");
            shared.set_state(LoadState::Cancelled { rows_loaded });
            let _ = tx.send(LoadEvent::Cancelled { rows_loaded });
        }
        Err(err) => {
            let message = err.to_string();
            tracing::warn!(%message, path = %path.display(), "load failed");
            shared.set_state(LoadState::Failed {
                message: message.clone(),
            });
            let _ = tx.send(LoadEvent::Failed { message });
        }
    }
    // Final wakeup so parked search scans observe the terminal state.
    shared.notify();
}

fn ingest(
    store: &RowStore,
    shared: &LoadShared,
    tx: &Sender<LoadEvent>,
    path: &PathBuf,
    config: TableConfig,
) -> Result<IngestEnd> {
    let mut reader = ChunkReader::open(path, config)?;
    let total_bytes = reader.total_bytes();
    shared.set_state(LoadState::Loading {
        bytes_read: 0,
        total_bytes,
        rows_loaded: 0,
    });
    let _ = tx.send(LoadEvent::Started { total_bytes });

    let schema = reader.schema()?;
    store.set_schema(Arc::clone(&schema));
    let _ = tx.send(LoadEvent::Schema(schema));

    loop {
        if shared.cancel.load(Ordering::Acquire) {
            return Ok(IngestEnd::Cancelled {
                rows_loaded: store.row_count(),
            });
        }

        match reader.next_chunk()? {
            Some(chunk) => {
                store.append(chunk);
                let bytes_read = reader.bytes_read();
                let rows_loaded = store.row_count();
                shared.set_state(LoadState::Loading {
                    bytes_read,
                    total_bytes,
                    rows_loaded,
                });
                let _ = tx.send(LoadEvent::Progress {
                    bytes_read,
                    total_bytes,
                    rows_loaded,
                });
                shared.notify();
            }
            None => {
                return Ok(IngestEnd::Completed {
                    total_rows: store.row_count(),
                    malformed_rows: reader.malformed_rows(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn drain_to_terminal(rx: &Receiver<LoadEvent>) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.recv_timeout(Duration::from_secs(5)) {
            let terminal = matches!(
                event,
                LoadEvent::Completed { .. } | LoadEvent::Failed { .. } | LoadEvent::Cancelled { .. }
            );
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }

    #[test]
    fn test_load_to_completion() {
        let mut content = String::from("n,double\n");
        for i in 0..100 {
            content.push_str(&format!("{i},{}\n", i * 2));
        }
        let file = write_file(&content);

        let config = TableConfig {
            chunk_rows: 16,
            ..TableConfig::default()
        };
        let (mut coordinator, rx) = LoadCoordinator::start(file.path().to_path_buf(), config);
        let events = drain_to_terminal(&rx);
        coordinator.join();

        assert!(matches!(events.first(), Some(LoadEvent::Started { .. })));
        assert!(events.iter().any(|e| matches!(e, LoadEvent::Schema(_))));
        assert!(matches!(
            events.last(),
            Some(LoadEvent::Completed {
                total_rows: 100,
                malformed_rows: 0
            })
        ));
        assert!(matches!(
            coordinator.state(),
            LoadState::Completed { total_rows: 100, .. }
        ));
        assert_eq!(coordinator.store().row_count(), 100);
        assert_eq!(coordinator.store().get_row(42).unwrap().fields(), ["42", "84"]);
    }

    #[test]
    fn test_progress_monotonic_and_in_order() {
        let mut content = String::from("a\n");
        for i in 0..500 {
            content.push_str(&format!("{i}\n"));
        }
        let file = write_file(&content);

        let config = TableConfig {
            chunk_rows: 50,
            ..TableConfig::default()
        };
        let (_coordinator, rx) = LoadCoordinator::start(file.path().to_path_buf(), config);
        let events = drain_to_terminal(&rx);

        let mut last_rows = 0;
        for event in &events {
            if let LoadEvent::Progress { rows_loaded, .. } = event {
                assert!(*rows_loaded > last_rows);
                last_rows = *rows_loaded;
            }
        }
        assert_eq!(last_rows, 500);
    }

    #[test]
    fn test_missing_file_fails_without_panic() {
        let (mut coordinator, rx) =
            LoadCoordinator::start(PathBuf::from("/no/such/file.csv"), TableConfig::default());
        let events = drain_to_terminal(&rx);
        coordinator.join();

        assert!(matches!(events.last(), Some(LoadEvent::Failed { .. })));
        assert!(matches!(coordinator.state(), LoadState::Failed { .. }));
        assert_eq!(coordinator.store().row_count(), 0);
    }

    #[test]
    fn test_cancel_freezes_at_chunk_boundary() {
        let mut content = String::from("n,payload\n");
        for i in 0..200_000 {
            content.push_str(&format!("{i},payload-{i}\n"));
        }
        let file = write_file(&content);

        let config = TableConfig {
            chunk_rows: 1_000,
            ..TableConfig::default()
        };
        let (mut coordinator, rx) = LoadCoordinator::start(file.path().to_path_buf(), config);

        // Wait for the first chunk, then request a stop.
        loop {
            match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
                LoadEvent::Progress { .. } => break,
                _ => continue,
            }
        }
        coordinator.cancel();
        coordinator.join();

        let state = coordinator.state();
        let LoadState::Cancelled { rows_loaded } = state else {
            panic!("expected cancelled state, got {state:?}");
        };
        assert!(rows_loaded > 0);
        assert_eq!(rows_loaded % 1_000, 0, "frozen at a whole-chunk boundary");
        assert_eq!(coordinator.store().row_count(), rows_loaded);
        // Loaded rows remain queryable after cancellation.
        let row = coordinator.store().get_row(rows_loaded - 1).unwrap();
        assert_eq!(row.field(1), Some(format!("payload-{}", rows_loaded - 1).as_str()));
    }

    #[test]
    fn test_malformed_rows_counted_in_final_status() {
        let file = write_file("a,b\n1,2\nonly-one\n3,4,5,6\n7,8\n");
        let (mut coordinator, rx) =
            LoadCoordinator::start(file.path().to_path_buf(), TableConfig::default());
        let events = drain_to_terminal(&rx);
        coordinator.join();

        assert!(matches!(
            events.last(),
            Some(LoadEvent::Completed {
                total_rows: 4,
                malformed_rows: 2
            })
        ));
        let store = coordinator.store();
        assert!(store.get_row(1).unwrap().is_malformed());
        assert!(store.get_row(2).unwrap().is_malformed());
        assert!(!store.get_row(3).unwrap().is_malformed());
    }
}
