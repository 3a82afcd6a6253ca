//! Row store: append-only chunk index plus a bounded residency cache
//!
//! Appends happen only on the loader worker; reads come from any number of
//! callers. Locks guard index updates only, never I/O: an eviction reload
//! re-parses the chunk's byte range with no lock held and re-inserts it.

use crate::config::TableConfig;
use crate::error::{EngineError, Result};
use crate::ingest::read_range;
use crate::table::{Chunk, ChunkMeta, ChunkOrdinal, Row, RowIndex, Schema};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared ownership structure for all parsed chunks of one file session.
///
/// Chunk metadata is authoritative and append-only; chunk rows are a cache
/// bounded by `max_resident_chunks`. Evicting a chunk never loses data,
/// only the cost of re-reading its byte range on next access.
pub struct RowStore {
    path: PathBuf,
    config: TableConfig,
    schema: OnceLock<Arc<Schema>>,
    chunks: RwLock<Vec<ChunkMeta>>,
    resident: Mutex<LruCache<ChunkOrdinal, Arc<Vec<Row>>>>,
    /// Published after the chunk payload so readers never observe a chunk
    /// in a partially written state
    row_count: AtomicU64,
}

impl RowStore {
    pub fn new(path: PathBuf, config: TableConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_resident_chunks.max(1)).unwrap();
        Self {
            path,
            config,
            schema: OnceLock::new(),
            chunks: RwLock::new(Vec::new()),
            resident: Mutex::new(LruCache::new(capacity)),
            row_count: AtomicU64::new(0),
        }
    }

    /// Record the session schema once known (loader worker only)
    pub(crate) fn set_schema(&self, schema: Arc<Schema>) {
        let _ = self.schema.set(schema);
    }

    /// Column schema, available once the loader has read the file head
    pub fn schema(&self) -> Option<Arc<Schema>> {
        self.schema.get().cloned()
    }

    /// Append a completed chunk (loader worker only). Chunks arrive in file
    /// order; row ranges are contiguous and non-overlapping.
    pub(crate) fn append(&self, chunk: Chunk) {
        debug_assert_eq!(chunk.first_row, self.row_count.load(Ordering::Acquire));

        let meta = chunk.meta();
        let end = meta.row_range().end;
        let ordinal = {
            let mut chunks = self.chunks.write();
            chunks.push(meta);
            chunks.len() - 1
        };
        self.resident.lock().push(ordinal, Arc::new(chunk.rows));
        self.row_count.store(end, Ordering::Release);
    }

    /// Rows loaded so far (lock-free)
    pub fn row_count(&self) -> u64 {
        self.row_count.load(Ordering::Acquire)
    }

    /// Chunks appended so far
    pub fn chunk_count(&self) -> usize {
        self.chunks.read().len()
    }

    /// Metadata for one chunk
    pub fn chunk_meta(&self, ordinal: ChunkOrdinal) -> Option<ChunkMeta> {
        self.chunks.read().get(ordinal).cloned()
    }

    /// Number of chunks currently resident in memory (cache introspection)
    pub fn resident_chunks(&self) -> usize {
        self.resident.lock().len()
    }

    /// A single row by logical index
    pub fn get_row(&self, index: RowIndex) -> Result<Row> {
        let len = self.row_count();
        if index >= len {
            return Err(EngineError::OutOfRange { index, len });
        }
        let mut rows = self.get_rows(index, index + 1)?;
        Ok(rows.remove(0))
    }

    /// Rows in `[start, end)`. Fails with `OutOfRange` when the range
    /// extends past the loaded extent; callers that want the available
    /// prefix clamp first (see `VirtualView`).
    pub fn get_rows(&self, start: RowIndex, end: RowIndex) -> Result<Vec<Row>> {
        let len = self.row_count();
        if end > len || start > end {
            return Err(EngineError::OutOfRange {
                index: end.max(start),
                len,
            });
        }
        if start == end {
            return Ok(Vec::new());
        }

        // Snapshot the covering metadata in one lock acquisition.
        let metas: Vec<(ChunkOrdinal, ChunkMeta)> = {
            let chunks = self.chunks.read();
            let first = chunks.partition_point(|m| m.row_range().end <= start);
            chunks[first..]
                .iter()
                .take_while(|m| m.first_row < end)
                .cloned()
                .enumerate()
                .map(|(i, m)| (first + i, m))
                .collect()
        };

        let mut out = Vec::with_capacity((end - start) as usize);
        for (ordinal, meta) in metas {
            let rows = self.rows_for(ordinal, &meta)?;
            let range = meta.row_range();
            let local_start = start.saturating_sub(range.start) as usize;
            let local_end = (end.min(range.end) - range.start) as usize;
            out.extend_from_slice(&rows[local_start..local_end]);
        }
        Ok(out)
    }

    /// Full payload of one chunk, reloading it if evicted
    pub fn chunk_rows(&self, ordinal: ChunkOrdinal) -> Result<Arc<Vec<Row>>> {
        let meta = self
            .chunk_meta(ordinal)
            .ok_or_else(|| EngineError::OutOfRange {
                index: ordinal as u64,
                len: self.chunk_count() as u64,
            })?;
        self.rows_for(ordinal, &meta)
    }

    fn rows_for(&self, ordinal: ChunkOrdinal, meta: &ChunkMeta) -> Result<Arc<Vec<Row>>> {
        if let Some(rows) = self.resident.lock().get(&ordinal) {
            return Ok(Arc::clone(rows));
        }

        // Cache miss: re-read from the source outside any lock. Two racing
        // readers may both re-parse the same chunk; the result is identical.
        let schema = self.schema().ok_or_else(|| {
            EngineError::Io(std::io::Error::other("schema not yet established"))
        })?;
        tracing::debug!(ordinal, range = ?meta.byte_range, "reloading evicted chunk");
        let rows = Arc::new(read_range(&self.path, meta, &self.config, &schema)?);

        self.resident.lock().push(ordinal, Arc::clone(&rows));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::ChunkReader;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn store_from(content: &str, chunk_rows: usize, max_resident: usize) -> (RowStore, NamedTempFile) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = TableConfig {
            chunk_rows,
            max_resident_chunks: max_resident,
            ..TableConfig::default()
        };
        let store = RowStore::new(file.path().to_path_buf(), config.clone());
        let mut reader = ChunkReader::open(file.path(), config).unwrap();
        store.set_schema(reader.schema().unwrap());
        while let Some(chunk) = reader.next_chunk().unwrap() {
            store.append(chunk);
        }
        // The file must outlive the store for eviction reloads.
        (store, file)
    }

    fn numbers_csv(rows: usize) -> String {
        let mut out = String::from("n,double\n");
        for i in 0..rows {
            out.push_str(&format!("{i},{}\n", i * 2));
        }
        out
    }

    #[test]
    fn test_row_count_and_get_row() {
        let (store, _file) = store_from(&numbers_csv(10), 4, 8);
        assert_eq!(store.row_count(), 10);
        assert_eq!(store.get_row(7).unwrap().fields(), ["7", "14"]);
    }

    #[test]
    fn test_get_rows_spanning_chunks() {
        let (store, _file) = store_from(&numbers_csv(10), 3, 8);
        let rows = store.get_rows(2, 8).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].fields(), ["2", "4"]);
        assert_eq!(rows[5].fields(), ["7", "14"]);
    }

    #[test]
    fn test_get_rows_idempotent() {
        let (store, _file) = store_from(&numbers_csv(20), 5, 8);
        let first = store.get_rows(3, 12).unwrap();
        let second = store.get_rows(3, 12).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_out_of_range() {
        let (store, _file) = store_from(&numbers_csv(5), 5, 8);
        assert!(matches!(
            store.get_row(5),
            Err(EngineError::OutOfRange { index: 5, len: 5 })
        ));
        assert!(store.get_rows(0, 6).is_err());
    }

    #[test]
    fn test_eviction_transparency() {
        // Ceiling of one resident chunk forces constant eviction.
        let (store, _file) = store_from(&numbers_csv(30), 5, 1);
        assert_eq!(store.chunk_count(), 6);
        assert_eq!(store.resident_chunks(), 1);

        let before = store.get_rows(0, 30).unwrap();
        // Touch the tail so the head is evicted, then re-read the head.
        store.get_rows(25, 30).unwrap();
        let head = store.get_rows(0, 5).unwrap();
        assert_eq!(head, before[..5]);

        let again = store.get_rows(0, 30).unwrap();
        assert_eq!(before, again);
    }

    #[test]
    fn test_empty_range() {
        let (store, _file) = store_from(&numbers_csv(5), 5, 8);
        assert!(store.get_rows(3, 3).unwrap().is_empty());
    }
}
