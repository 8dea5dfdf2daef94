//! In-memory transaction ledger: AVL-indexed record store, wallet flow graph
//! and single-pass amount analytics.

pub mod analytics;
pub mod config;
pub mod error;
pub mod graph;
pub mod index;
pub mod ingest;
pub mod ledger;
pub mod store;

pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use ledger::{ledger_ingestion_task, IngestSummary, Ledger, LedgerMessage, LedgerStatus, SharedLedger};
