//! Engine configuration
//!
//! Every tunable is an explicit value passed into the session at
//! construction, so concurrent sessions can use different settings.

use serde::{Deserialize, Serialize};

/// Configuration for parsing and ingesting a delimited text file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Field delimiter (default comma)
    pub delimiter: u8,
    /// Quote character (default double quote)
    pub quote: u8,
    /// Whether the first record is a header row. When false, column names
    /// are synthesized ("Column 1", "Column 2", ...).
    pub has_headers: bool,
    /// Rows per chunk
    pub chunk_rows: usize,
    /// Maximum chunks resident in memory before least-recently-accessed
    /// chunks are evicted (metadata is retained; rows are re-read on demand)
    pub max_resident_chunks: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            has_headers: true,
            chunk_rows: 10_000,
            max_resident_chunks: 64, // ~640k rows resident at default chunk size
        }
    }
}

impl TableConfig {
    /// Convenience for tab-separated files
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TableConfig::default();
        assert_eq!(config.delimiter, b',');
        assert_eq!(config.quote, b'"');
        assert!(config.has_headers);
        assert!(config.chunk_rows > 0);
        assert!(config.max_resident_chunks > 0);
    }

    #[test]
    fn test_tsv_config() {
        let config = TableConfig::tsv();
        assert_eq!(config.delimiter, b'\t');
        assert_eq!(config.quote, b'"');
    }
}
