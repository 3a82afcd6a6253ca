//! Table session facade
//!
//! One session per open file: wires the load coordinator, row store,
//! virtual view, and search engine together for the UI collaborator.

use crate::config::TableConfig;
use crate::ingest::{LoadCoordinator, LoadEvent, LoadState};
use crate::query::{SearchEngine, SearchEvent, SearchScope, VirtualView};
use crate::table::{RowStore, Schema};
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// A browsing session over one delimited text file.
///
/// Dropping the session cancels any in-flight load and search and joins
/// the ingestion worker.
pub struct TableSession {
    coordinator: LoadCoordinator,
    view: VirtualView,
    search: SearchEngine,
}

impl TableSession {
    /// Open a file and start loading it in the background. The returned
    /// receiver delivers load progress and terminal events.
    pub fn open(path: impl Into<PathBuf>, config: TableConfig) -> (Self, Receiver<LoadEvent>) {
        let (coordinator, events) = LoadCoordinator::start(path.into(), config);
        let store = coordinator.store();
        let shared = coordinator.shared();
        let view = VirtualView::new(Arc::clone(&store), Arc::clone(&shared));
        let search = SearchEngine::new(store, shared);

        (
            Self {
                coordinator,
                view,
                search,
            },
            events,
        )
    }

    /// Windowed query surface for the renderer
    pub fn view(&self) -> &VirtualView {
        &self.view
    }

    /// Start an incremental search, superseding any scan in progress
    pub fn search(&self, term: &str, scope: SearchScope) -> Receiver<SearchEvent> {
        self.search.search(term, scope)
    }

    /// Stop the in-flight search scan
    pub fn cancel_search(&self) {
        self.search.cancel();
    }

    /// Request the background load stop after its current chunk
    pub fn cancel_load(&self) {
        self.coordinator.cancel();
    }

    /// Current load state (non-blocking)
    pub fn state(&self) -> LoadState {
        self.coordinator.state()
    }

    /// Column schema, available once the loader has read the file head
    pub fn schema(&self) -> Option<Arc<Schema>> {
        self.coordinator.store().schema()
    }

    /// Direct access to the underlying row store
    pub fn store(&self) -> Arc<RowStore> {
        self.coordinator.store()
    }

    /// Block until the load reaches a terminal state. For tests and
    /// shutdown paths, not the rendering thread.
    pub fn join_load(&mut self) {
        self.coordinator.join();
    }
}
