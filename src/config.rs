//! Ledger configuration from environment variables

use crate::analytics::SamplingOptions;
use crate::ingest::{RowMapping, DEFAULT_TIMESTAMP_COLUMN};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Configuration for the ledger and its import path
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// JSONL file of raw rows to import at startup
    pub import_path: Option<PathBuf>,

    /// Column holding the record timestamp
    pub timestamp_column: String,

    /// Reject inserts whose timestamp is already present
    pub unique_timestamps: bool,

    /// Log an ingestion checkpoint every N records
    pub progress_every: u64,

    /// Rows per ingestion batch (one graph rebuild each)
    pub batch_size: usize,

    /// Channel buffer size for ingestion messages
    pub channel_buffer: usize,

    /// Reservoir capacity for percentile estimates
    pub sample_size: usize,

    /// Reservoir seed
    pub seed: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parsed<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

impl LedgerConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `LEDGER_IMPORT_PATH` (default: none)
    /// - `LEDGER_TIMESTAMP_COLUMN` (default: timestamp)
    /// - `LEDGER_UNIQUE_TIMESTAMPS` (default: false)
    /// - `INGEST_PROGRESS_EVERY` (default: 100000)
    /// - `INGEST_BATCH_SIZE` (default: 10000)
    /// - `LEDGER_CHANNEL_BUFFER` (default: 1000)
    /// - `ANALYTICS_SAMPLE_SIZE` (default: 50000)
    /// - `ANALYTICS_SEED` (default: 1337)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SamplingOptions::default();
        Self {
            import_path: lookup("LEDGER_IMPORT_PATH")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),

            timestamp_column: lookup("LEDGER_TIMESTAMP_COLUMN")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TIMESTAMP_COLUMN.to_string()),

            unique_timestamps: parsed(lookup("LEDGER_UNIQUE_TIMESTAMPS"), false),

            progress_every: parsed(lookup("INGEST_PROGRESS_EVERY"), 100_000u64).max(1),

            batch_size: parsed(lookup("INGEST_BATCH_SIZE"), 10_000usize).max(1),

            channel_buffer: parsed(lookup("LEDGER_CHANNEL_BUFFER"), 1_000usize).max(1),

            sample_size: parsed(lookup("ANALYTICS_SAMPLE_SIZE"), defaults.sample_size).max(1),

            seed: parsed(lookup("ANALYTICS_SEED"), defaults.seed),
        }
    }

    pub fn row_mapping(&self) -> RowMapping {
        RowMapping::new(self.timestamp_column.clone())
    }

    pub fn sampling(&self) -> SamplingOptions {
        SamplingOptions {
            sample_size: self.sample_size,
            seed: self.seed,
        }
    }
}
