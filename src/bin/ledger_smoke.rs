//! Ledger Smoke Test - ingest + sample queries
//!
//! Loads a JSONL file of raw transaction rows through the ingestion task,
//! then runs a point lookup, a short range query, graph status and amount
//! analytics against the result.
//!
//! Usage:
//!   cargo run --release --bin ledger_smoke -- [path/to/rows.jsonl]
//!
//! Environment variables:
//!   LEDGER_IMPORT_PATH - JSONL file to import (overridden by the first argument)
//!   LEDGER_TIMESTAMP_COLUMN - Timestamp column name (default: timestamp)
//!   INGEST_BATCH_SIZE - Rows per batch (default: 10000)
//!   RUST_LOG - Log filter (default: info)

use dotenv::dotenv;
use ledgerflow::analytics::AmountFilter;
use ledgerflow::ingest::{format_timestamp, RowReader};
use ledgerflow::store::IndexKey;
use ledgerflow::{ledger_ingestion_task, Ledger, LedgerConfig, LedgerMessage, SharedLedger};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = LedgerConfig::from_env();

    info!("🚀 Ledger smoke test");
    let Some(path) = std::env::args().nth(1).map(PathBuf::from).or(config.import_path.clone()) else {
        error!("❌ No import file (pass a path or set LEDGER_IMPORT_PATH)");
        return Ok(());
    };

    info!("📊 Configuration:");
    info!("   ├─ Import: {}", path.display());
    info!("   ├─ Timestamp column: {}", config.timestamp_column);
    info!("   ├─ Unique timestamps: {}", config.unique_timestamps);
    info!("   ├─ Batch size: {}", config.batch_size);
    info!("   └─ Channel buffer: {}", config.channel_buffer);

    let ledger: SharedLedger = Arc::new(RwLock::new(Ledger::from_config(&config)));
    let (tx, rx) = mpsc::channel::<LedgerMessage>(config.channel_buffer);
    let ingestion = tokio::spawn(ledger_ingestion_task(rx, ledger.clone(), config.row_mapping()));

    let started = Instant::now();
    let mut reader = RowReader::open(&path).await?;
    loop {
        let batch = reader.next_batch(config.batch_size).await?;
        if batch.is_empty() {
            break;
        }
        if tx.send(LedgerMessage::Batch(batch)).await.is_err() {
            warn!("⚠️  Ingestion task stopped early");
            break;
        }
    }
    tx.send(LedgerMessage::Shutdown).await.ok();
    let totals = ingestion.await?;

    info!("--- Ingestion Summary ---");
    info!("   ├─ Inserted: {}", totals.inserted);
    info!("   ├─ Skipped: {} (+{} malformed lines)", totals.skipped, reader.malformed());
    info!("   ├─ Batches: {}", totals.batches);
    info!("   └─ Elapsed: {:.2}s", started.elapsed().as_secs_f64());

    let ledger = ledger.read().await;
    let store = ledger.store();
    let keys: Vec<i64> = store.timestamp_keys().collect();
    if keys.is_empty() {
        warn!("⚠️  No records loaded");
        return Ok(());
    }

    let mid_ts = keys[keys.len() / 2];
    if let Some(record) = ledger.get_first_by_key(IndexKey::Timestamp(mid_ts)) {
        info!(
            "🔎 GET at {} ({}): token={}, amount={}",
            mid_ts,
            format_timestamp(mid_ts).unwrap_or_default(),
            record.token,
            record.amount
        );
    }

    let range_start = keys[0];
    let range_end = range_start + 10;
    let in_range = ledger.range(range_start, range_end);
    info!("📅 Range [{}, {}) -> {} records", range_start, range_end, in_range.len());
    for record in in_range.iter().take(3) {
        info!("   - TS: {}, Token: {}", record.timestamp, record.token);
    }
    if in_range.len() > 3 {
        info!("   ...");
    }

    info!("🕸️  Status: {}", serde_json::to_string(&ledger.status())?);

    let analytics = ledger.amount_analytics(&AmountFilter::new(), config.sampling());
    info!("📈 Amount analytics: {}", serde_json::to_string_pretty(&analytics)?);

    Ok(())
}
