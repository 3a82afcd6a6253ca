//! Streaming chunk reader
//!
//! Parses the source file incrementally into fixed-size batches of rows.
//! Quoting, escaped quotes, embedded newlines, and partial records across
//! buffered reads are handled by the RFC 4180 reader underneath; this layer
//! tracks byte ranges per chunk, establishes the column schema, and applies
//! the arity policy (pad short rows, truncate long rows, flag either case
//! as malformed) so every materialized row matches the schema width.

use crate::config::TableConfig;
use crate::error::{EngineError, Result};
use crate::table::{Chunk, ChunkMeta, Row, RowIndex, Schema};
use csv::ByteRecord;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

/// Incremental reader producing [`Chunk`]s in file order
pub struct ChunkReader {
    reader: csv::Reader<File>,
    config: TableConfig,
    schema: Option<Arc<Schema>>,
    /// First record of a headerless file, held back by schema synthesis and
    /// emitted at the front of the first chunk
    lookahead: Option<(u64, ByteRecord)>,
    next_row: RowIndex,
    total_bytes: u64,
    malformed_rows: u64,
    record: ByteRecord,
}

impl ChunkReader {
    /// Open the source file for streaming
    pub fn open(path: &Path, config: TableConfig) -> Result<Self> {
        let file = File::open(path)?;
        let total_bytes = file.metadata()?.len();
        let reader = byte_reader(&config, file);

        Ok(Self {
            reader,
            config,
            schema: None,
            lookahead: None,
            next_row: 0,
            total_bytes,
            malformed_rows: 0,
            record: ByteRecord::new(),
        })
    }

    /// Establish the column schema: the header record when the file has one,
    /// otherwise synthesized names from the first record's field count. An
    /// empty file yields an empty schema.
    pub fn schema(&mut self) -> Result<Arc<Schema>> {
        if let Some(schema) = &self.schema {
            return Ok(Arc::clone(schema));
        }

        let offset = self.reader.position().byte();
        let schema = if !self.reader.read_byte_record(&mut self.record).map_err(csv_err)? {
            Arc::new(Schema::from_header(Vec::new()))
        } else if self.config.has_headers {
            let columns = self
                .record
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect();
            Arc::new(Schema::from_header(columns))
        } else {
            let schema = Arc::new(Schema::synthesized(self.record.len()));
            self.lookahead = Some((offset, self.record.clone()));
            schema
        };

        tracing::debug!(width = schema.width(), synthesized = schema.is_synthesized(), "schema established");
        self.schema = Some(Arc::clone(&schema));
        Ok(schema)
    }

    /// Read the next chunk, or `None` at end of file
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        let schema = self.schema()?;
        let width = schema.width();

        let chunk_start = match &self.lookahead {
            Some((offset, _)) => *offset,
            None => self.reader.position().byte(),
        };

        let mut rows = Vec::with_capacity(self.config.chunk_rows.min(64 * 1024));
        if let Some((offset, record)) = self.lookahead.take() {
            rows.push(self.convert(&record, width, offset));
        }

        while rows.len() < self.config.chunk_rows {
            let offset = self.reader.position().byte();
            if !self.reader.read_byte_record(&mut self.record).map_err(csv_err)? {
                break;
            }
            let record = std::mem::take(&mut self.record);
            rows.push(self.convert(&record, width, offset));
            self.record = record;
        }

        if rows.is_empty() {
            return Ok(None);
        }

        let chunk = Chunk {
            first_row: self.next_row,
            rows,
            byte_range: chunk_start..self.reader.position().byte(),
        };
        self.next_row += chunk.len() as u64;
        Ok(Some(chunk))
    }

    /// Bytes consumed from the source so far
    pub fn bytes_read(&self) -> u64 {
        self.reader.position().byte()
    }

    /// Total size of the source file in bytes
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Rows flagged malformed so far
    pub fn malformed_rows(&self) -> u64 {
        self.malformed_rows
    }

    fn convert(&mut self, record: &ByteRecord, width: usize, offset: u64) -> Row {
        let row = convert_record(record, width);
        if row.is_malformed() {
            self.malformed_rows += 1;
            let err = EngineError::MalformedRow { offset };
            tracing::debug!(%err, fields = record.len(), width, "row flagged and padded");
        }
        row
    }
}

/// Re-read an evicted chunk from its recorded byte range. The range always
/// starts at a record boundary, so a plain seek plus a bounded reader
/// reproduces the original parse (including malformed flags).
pub fn read_range(
    path: &Path,
    meta: &ChunkMeta,
    config: &TableConfig,
    schema: &Schema,
) -> Result<Vec<Row>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(meta.byte_range.start))?;
    let bounded = file.take(meta.byte_range.end - meta.byte_range.start);
    let mut reader = byte_reader(config, bounded);

    let mut rows = Vec::with_capacity(meta.row_count as usize);
    let mut record = ByteRecord::new();
    while rows.len() < meta.row_count as usize
        && reader.read_byte_record(&mut record).map_err(csv_err)?
    {
        rows.push(convert_record(&record, schema.width()));
    }
    Ok(rows)
}

fn byte_reader<R: Read>(config: &TableConfig, source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(config.delimiter)
        .quote(config.quote)
        .has_headers(false)
        .flexible(true)
        .from_reader(source)
}

/// Convert a raw record into a Row of exactly `width` fields
fn convert_record(record: &ByteRecord, width: usize) -> Row {
    let mut fields: Vec<String> = record
        .iter()
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .collect();
    let malformed = fields.len() != width;
    if fields.len() < width {
        fields.resize(width, String::new());
    } else {
        fields.truncate(width);
    }
    Row::new(fields, malformed)
}

/// With a flexible byte-record reader the only parse-time failures left are
/// genuine I/O errors; surface them as such.
fn csv_err(err: csv::Error) -> EngineError {
    match err.into_kind() {
        csv::ErrorKind::Io(io) => EngineError::Io(io),
        other => EngineError::Io(std::io::Error::other(format!("csv: {other:?}"))),
    }
}
