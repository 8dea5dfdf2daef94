//! Store and wallet graph kept in lockstep
//!
//! Every mutation goes through [`Ledger`], which applies it to the store and
//! then rebuilds the graph before returning. Callers share one ledger behind a
//! [`SharedLedger`] lock, so readers never see a store/graph mismatch.

use crate::analytics::{amount_analytics, AmountAnalytics, AmountFilter, SamplingOptions};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::graph::WalletGraph;
use crate::ingest::{RawRow, RowMapping};
use crate::store::{IndexKey, NewRecord, Record, RecordId, RecordPatch, RecordStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};

pub type SharedLedger = Arc<RwLock<Ledger>>;

/// Outcome of one bulk ingestion call, or of a whole ingestion task run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub inserted: u64,
    pub skipped: u64,
    pub batches: u64,
}

impl IngestSummary {
    pub fn merge(&mut self, other: &IngestSummary) {
        self.inserted += other.inserted;
        self.skipped += other.skipped;
        self.batches += other.batches;
    }
}

/// Point-in-time sizes of the store and graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStatus {
    pub active_records: usize,
    pub slots: usize,
    pub distinct_timestamps: usize,
    pub timestamp_index_height: usize,
    pub graph_nodes: usize,
    pub wallets_with_outgoing: usize,
    pub edges: usize,
    pub ingested_total: u64,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    store: RecordStore,
    graph: WalletGraph,
    unique_timestamps: bool,
    progress_every: u64,
    ingested_total: u64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            store: RecordStore::new(),
            graph: WalletGraph::new(),
            unique_timestamps: false,
            progress_every: 100_000,
            ingested_total: 0,
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new()
            .with_unique_timestamps(config.unique_timestamps)
            .with_progress_every(config.progress_every)
    }

    /// Reject writes that would put a second live record on a timestamp
    pub fn with_unique_timestamps(mut self, unique: bool) -> Self {
        self.unique_timestamps = unique;
        self
    }

    pub fn with_progress_every(mut self, every: u64) -> Self {
        self.progress_every = every.max(1);
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn graph(&self) -> &WalletGraph {
        &self.graph
    }

    fn check_unique(&self, timestamp: i64, except: Option<RecordId>) -> Result<()> {
        if !self.unique_timestamps {
            return Ok(());
        }
        let taken = self
            .store
            .by_timestamp(timestamp)
            .iter()
            .any(|r| Some(r.id) != except);
        if taken {
            return Err(LedgerError::Conflict(format!(
                "timestamp {} already has a record",
                timestamp
            )));
        }
        Ok(())
    }

    fn insert_unsynced(&mut self, new: NewRecord) -> Result<RecordId> {
        self.check_unique(new.timestamp, None)?;
        let id = self.store.insert(new)?;
        self.ingested_total += 1;
        Ok(id)
    }

    pub fn insert(&mut self, new: NewRecord) -> Result<RecordId> {
        let id = self.insert_unsynced(new)?;
        self.graph.rebuild(&self.store);
        Ok(id)
    }

    /// `Ok(false)` when the id is unknown or already deleted
    pub fn update(&mut self, id: RecordId, patch: RecordPatch) -> Result<bool> {
        if let (Some(ts), Some(current)) = (patch.timestamp, self.store.get(id)) {
            if ts != current.timestamp {
                self.check_unique(ts, Some(id))?;
            }
        }
        let changed = self.store.update(id, patch)?;
        if changed {
            self.graph.rebuild(&self.store);
        }
        Ok(changed)
    }

    pub fn delete(&mut self, id: RecordId) -> Result<bool> {
        let removed = self.store.delete(id)?;
        if removed {
            self.graph.rebuild(&self.store);
        }
        Ok(removed)
    }

    /// Update the first live record at `timestamp`
    pub fn update_first_by_timestamp(&mut self, timestamp: i64, patch: RecordPatch) -> Result<bool> {
        match self.first_id_at(timestamp) {
            Some(id) => self.update(id, patch),
            None => Ok(false),
        }
    }

    /// Delete the first live record at `timestamp`
    pub fn delete_first_by_timestamp(&mut self, timestamp: i64) -> Result<bool> {
        match self.first_id_at(timestamp) {
            Some(id) => self.delete(id),
            None => Ok(false),
        }
    }

    fn first_id_at(&self, timestamp: i64) -> Option<RecordId> {
        self.store
            .get_first_by_key(IndexKey::Timestamp(timestamp))
            .map(|r| r.id)
    }

    pub fn get_first_by_key(&self, key: IndexKey<'_>) -> Option<&Record> {
        self.store.get_first_by_key(key)
    }

    pub fn get_all_by_key(&self, key: IndexKey<'_>) -> Vec<&Record> {
        self.store.get_all_by_key(key)
    }

    pub fn range(&self, start: i64, end: i64) -> Vec<&Record> {
        self.store.range(start, end)
    }

    pub fn amount_analytics(&self, filter: &AmountFilter, options: SamplingOptions) -> AmountAnalytics {
        amount_analytics(&self.store, filter, options)
    }

    /// Map and insert a batch of raw rows, then rebuild the graph once.
    ///
    /// Rows that fail mapping or insertion are skipped with a warning.
    pub fn ingest_rows<I>(&mut self, rows: I, mapping: &RowMapping) -> IngestSummary
    where
        I: IntoIterator<Item = RawRow>,
    {
        let mut summary = IngestSummary {
            batches: 1,
            ..IngestSummary::default()
        };

        for row in rows {
            match mapping
                .to_record(&row)
                .and_then(|new| self.insert_unsynced(new))
            {
                Ok(_) => {
                    summary.inserted += 1;
                    if self.ingested_total % self.progress_every == 0 {
                        log::info!("📈 Progress: {} records ingested...", self.ingested_total);
                    }
                }
                Err(e) => {
                    summary.skipped += 1;
                    log::warn!("⚠️  Skipping row: {}", e);
                }
            }
        }

        if summary.inserted > 0 {
            self.graph.rebuild(&self.store);
        }
        summary
    }

    pub fn status(&self) -> LedgerStatus {
        LedgerStatus {
            active_records: self.store.active_count(),
            slots: self.store.slot_count(),
            distinct_timestamps: self.store.distinct_timestamps(),
            timestamp_index_height: self.store.timestamp_index_height(),
            graph_nodes: self.graph.node_count(),
            wallets_with_outgoing: self.graph.wallets_with_outgoing(),
            edges: self.graph.edge_count(),
            ingested_total: self.ingested_total,
        }
    }
}

/// Message sent through the channel to the ingestion task
#[derive(Debug, Clone)]
pub enum LedgerMessage {
    Insert(NewRecord),
    Batch(Vec<RawRow>),
    Shutdown,
}

/// Background task that applies channel messages to the shared ledger.
///
/// Each message is applied under one write lock. Returns the totals once the
/// channel closes or a shutdown arrives.
pub async fn ledger_ingestion_task(
    mut receiver: mpsc::Receiver<LedgerMessage>,
    ledger: SharedLedger,
    mapping: RowMapping,
) -> IngestSummary {
    log::info!("Ledger ingestion task started");
    let mut totals = IngestSummary::default();

    while let Some(message) = receiver.recv().await {
        match message {
            LedgerMessage::Insert(new) => {
                let mut ledger = ledger.write().await;
                match ledger.insert(new) {
                    Ok(_) => totals.inserted += 1,
                    Err(e) => {
                        totals.skipped += 1;
                        log::warn!("⚠️  Insert rejected: {}", e);
                    }
                }
            }
            LedgerMessage::Batch(rows) => {
                let started = Instant::now();
                let row_count = rows.len();
                let summary = {
                    let mut ledger = ledger.write().await;
                    ledger.ingest_rows(rows, &mapping)
                };
                log::debug!(
                    "Batch of {} rows applied in {:?} ({} skipped)",
                    row_count,
                    started.elapsed(),
                    summary.skipped
                );
                totals.merge(&summary);
            }
            LedgerMessage::Shutdown => {
                log::info!("Ledger ingestion task received shutdown signal");
                break;
            }
        }
    }

    log::info!(
        "Ledger ingestion task stopped ({} inserted, {} skipped)",
        totals.inserted,
        totals.skipped
    );
    totals
}
