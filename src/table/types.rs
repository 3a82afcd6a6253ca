//! Core data model: rows, chunks, and the column schema

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;

/// Logical 0-based row position in the full dataset, stable for the
/// session regardless of chunking or eviction
pub type RowIndex = u64;

/// Ordinal of a chunk within the store (0-based, file order)
pub type ChunkOrdinal = usize;

/// A single parsed record. Immutable once parsed; field count always
/// equals the schema width (mismatched records are padded or truncated
/// at parse time and flagged).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    fields: Arc<[String]>,
    malformed: bool,
}

impl Row {
    pub fn new(fields: Vec<String>, malformed: bool) -> Self {
        Self {
            fields: fields.into(),
            malformed,
        }
    }

    /// All field values in column order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Field value at a column index
    pub fn field(&self, column: usize) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub fn width(&self) -> usize {
        self.fields.len()
    }

    /// True when the source record did not match the schema width or had
    /// a quoting problem. Flagged rows are still browsable.
    pub fn is_malformed(&self) -> bool {
        self.malformed
    }
}

/// Ordered column names, established once per session from the header row
/// or synthesized for headerless files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<String>,
    synthesized: bool,
}

impl Schema {
    /// Schema from a parsed header record
    pub fn from_header(columns: Vec<String>) -> Self {
        Self {
            columns,
            synthesized: false,
        }
    }

    /// Synthesized schema ("Column 1", "Column 2", ...) for headerless files
    pub fn synthesized(width: usize) -> Self {
        Self {
            columns: (1..=width).map(|i| format!("Column {i}")).collect(),
            synthesized: true,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Look up a column index by name (exact match)
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }
}

/// A contiguous run of parsed rows plus the source byte range they were
/// parsed from. Owned by the row store after ingestion; never mutated.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub first_row: RowIndex,
    pub rows: Vec<Row>,
    /// Byte range `[start, end)` in the source file covering exactly the
    /// records of this chunk; enough to re-read the chunk after eviction
    pub byte_range: Range<u64>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn meta(&self) -> ChunkMeta {
        ChunkMeta {
            first_row: self.first_row,
            row_count: self.rows.len() as u32,
            byte_range: self.byte_range.clone(),
        }
    }
}

/// Chunk metadata retained even after the chunk's rows are evicted
#[derive(Debug, Clone)]
pub struct ChunkMeta {
    pub first_row: RowIndex,
    pub row_count: u32,
    pub byte_range: Range<u64>,
}

impl ChunkMeta {
    /// Logical row range `[first, end)` covered by this chunk
    pub fn row_range(&self) -> Range<RowIndex> {
        self.first_row..self.first_row + self.row_count as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_accessors() {
        let row = Row::new(vec!["a".into(), "b".into()], false);
        assert_eq!(row.width(), 2);
        assert_eq!(row.field(0), Some("a"));
        assert_eq!(row.field(2), None);
        assert!(!row.is_malformed());
    }

    #[test]
    fn test_schema_synthesized_names() {
        let schema = Schema::synthesized(3);
        assert_eq!(schema.columns(), ["Column 1", "Column 2", "Column 3"]);
        assert!(schema.is_synthesized());
        assert_eq!(schema.column_index("Column 2"), Some(1));
    }

    #[test]
    fn test_schema_from_header() {
        let schema = Schema::from_header(vec!["id".into(), "name".into()]);
        assert_eq!(schema.width(), 2);
        assert_eq!(schema.column_index("name"), Some(1));
        assert_eq!(schema.column_index("missing"), None);
        assert!(!schema.is_synthesized());
    }

    #[test]
    fn test_chunk_meta_row_range() {
        let chunk = Chunk {
            first_row: 100,
            rows: vec![Row::new(vec!["x".into()], false); 50],
            byte_range: 1000..2000,
        };
        let meta = chunk.meta();
        assert_eq!(meta.row_range(), 100..150);
        assert_eq!(meta.byte_range, 1000..2000);
    }
}
