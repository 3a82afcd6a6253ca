//! # rowgrid - virtual-table engine for huge delimited text files
//!
//! rowgrid lets a caller browse multi-million-row CSV/TSV files without
//! loading the whole file into memory or blocking its own thread. A
//! background worker parses the file into fixed-size chunks of rows; an
//! in-memory chunk index gives random access to any logical row; evicted
//! chunks are transparently re-read from their recorded byte ranges.
//!
//! ## Architecture
//!
//! - [`ingest`] - streaming chunk reader and the background load coordinator
//! - [`table`] - row/chunk data model and the row store (index + residency cache)
//! - [`query`] - virtual view (windowed reads) and incremental search
//! - [`session`] - per-file facade wiring the pieces together
//! - [`config`] / [`error`] - tunables and the error taxonomy
//!
//! ## Quick start
//!
//! ```no_run
//! use rowgrid::config::TableConfig;
//! use rowgrid::ingest::LoadEvent;
//! use rowgrid::query::SearchScope;
//! use rowgrid::session::TableSession;
//!
//! let (session, events) = TableSession::open("huge.csv", TableConfig::default());
//!
//! // Render the visible window; re-query after each progress event.
//! let window = session.view().visible_rows(0, 50).unwrap();
//! for row in &window.rows {
//!     println!("{:?}", row.fields());
//! }
//!
//! // Incremental, cancellable search across all columns.
//! let matches = session.search("alice", SearchScope::AllColumns);
//! while let Ok(event) = events.recv() {
//!     if matches!(event, LoadEvent::Completed { .. }) {
//!         break;
//!     }
//! }
//! drop(matches);
//! ```
//!
//! The consumer-facing surface (view, state reads, search receivers) is
//! non-blocking by contract: it reads already-published state and never
//! waits on a worker.

pub mod config;
pub mod error;
pub mod ingest;
pub mod query;
pub mod session;
pub mod table;

pub use config::TableConfig;
pub use error::{EngineError, Result};
pub use ingest::{LoadEvent, LoadState};
pub use query::{SearchEvent, SearchMatch, SearchScope};
pub use session::TableSession;
pub use table::{Row, Schema};
