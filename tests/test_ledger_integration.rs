//! Integration tests for the ledger: store, graph and analytics driven
//! through the public API, plus JSONL import through the ingestion task.

#[cfg(test)]
mod ledger_integration_tests {
    use ledgerflow::analytics::{AmountFilter, SamplingOptions};
    use ledgerflow::graph::{Direction, RankBy};
    use ledgerflow::ingest::{RowMapping, RowReader};
    use ledgerflow::store::{IndexKey, NewRecord, RecordPatch};
    use ledgerflow::{ledger_ingestion_task, Ledger, LedgerConfig, LedgerMessage, SharedLedger};
    use std::sync::Arc;
    use tokio::io::AsyncWriteExt;
    use tokio::sync::{mpsc, RwLock};

    /// 100 A→B, 200 B→C, 200 A→B in that order
    fn three_record_ledger() -> Ledger {
        let mut ledger = Ledger::new();
        ledger
            .insert(NewRecord::new(100, "BTC", 10.0).with_wallets("A", "B").with_status("ok"))
            .unwrap();
        ledger
            .insert(NewRecord::new(200, "ETH", 20.0).with_wallets("B", "C").with_status("ok"))
            .unwrap();
        ledger
            .insert(NewRecord::new(200, "BTC", 30.0).with_wallets("A", "B").with_status("failed"))
            .unwrap();
        ledger
    }

    #[test]
    fn test_range_and_point_lookup() {
        let ledger = three_record_ledger();

        let ids: Vec<usize> = ledger.range(100, 300).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(ledger.get_first_by_key(IndexKey::Timestamp(200)).unwrap().id, 1);

        // Half-open: the end bound is excluded
        assert_eq!(ledger.range(100, 200).len(), 1);
        assert!(ledger.range(300, 100).is_empty());
    }

    #[test]
    fn test_graph_after_rebuild() {
        let ledger = three_record_ledger();
        let graph = ledger.graph();

        let out_a = graph.neighbors("A");
        assert_eq!(out_a["B"].count, 2);
        assert_eq!(out_a["B"].total_amount, 40.0);
        assert_eq!(graph.neighbors("B")["C"].count, 1);

        let top = graph.top_counterparties("A", 1, RankBy::Count, Direction::Out);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].counterparty, "B");

        assert_eq!(
            graph.shortest_path("A", "C"),
            Some(vec!["A".to_string(), "B".to_string(), "C".to_string()])
        );
        assert_eq!(graph.shortest_path("C", "A"), None);
    }

    #[test]
    fn test_mutations_keep_graph_in_sync() {
        let mut ledger = three_record_ledger();

        assert!(ledger.update(1, RecordPatch::new().receiver_wallet("D")).unwrap());
        assert!(ledger.graph().neighbors("B").get("C").is_none());
        assert_eq!(ledger.graph().neighbors("B")["D"].count, 1);
        assert_eq!(ledger.graph().shortest_path("A", "C"), None);

        let before = ledger.store().active_count();
        assert!(ledger.delete(0).unwrap());
        assert_eq!(ledger.store().active_count(), before - 1);
        assert!(!ledger.delete(0).unwrap());
        assert_eq!(ledger.store().active_count(), before - 1);

        assert_eq!(ledger.graph().neighbors("A")["B"].count, 1);
        ledger.store().verify_indexes().unwrap();
    }

    #[test]
    fn test_secondary_indexes_and_analytics() {
        let ledger = three_record_ledger();

        let btc: Vec<usize> = ledger
            .get_all_by_key(IndexKey::Token("BTC"))
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(btc, vec![0, 2]);
        assert_eq!(ledger.get_all_by_key(IndexKey::Sender("A")).len(), 2);

        let all = ledger.amount_analytics(&AmountFilter::new(), SamplingOptions::default());
        let summary = all.summary.unwrap();
        assert_eq!(all.count, 3);
        assert_eq!(summary.sum, 60.0);
        assert_eq!(summary.percentiles.p50, 20.0);

        let failed_btc = ledger.amount_analytics(
            &AmountFilter::new().token("BTC").status("failed"),
            SamplingOptions::default(),
        );
        assert_eq!(failed_btc.count, 1);
        assert_eq!(failed_btc.summary.unwrap().max, 30.0);
    }

    #[tokio::test]
    async fn test_jsonl_import_through_ingestion_task() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("rows.jsonl");
        let mut file = tokio::fs::File::create(&file_path).await.unwrap();
        let lines = [
            r#"{"timestamp": "2024-01-01 00:00:00", "symbol": "BTC", "price": "100", "sender_wallet": "A", "receiver_wallet": "B", "status": "confirmed"}"#,
            r#"{"timestamp": "2024-01-01 00:00:05", "crypto_symbol": "ETH", "amount_usd": 50, "wallet_from": "B", "wallet_to": "C"}"#,
            r#"{"timestamp": "not a time", "symbol": "BTC"}"#,
            r#"this line is not json"#,
            r#"{"timestamp": 1704067210, "symbol": "BTC", "price": 25, "sender_wallet": "A", "receiver_wallet": "B"}"#,
        ];
        for line in lines {
            file.write_all(line.as_bytes()).await.unwrap();
            file.write_all(b"\n").await.unwrap();
        }
        file.flush().await.unwrap();
        drop(file);

        let config = LedgerConfig::from_lookup(|key| match key {
            "INGEST_BATCH_SIZE" => Some("2".to_string()),
            _ => None,
        });
        let ledger: SharedLedger = Arc::new(RwLock::new(Ledger::from_config(&config)));
        let (tx, rx) = mpsc::channel(config.channel_buffer);
        let handle = tokio::spawn(ledger_ingestion_task(rx, ledger.clone(), config.row_mapping()));

        let mut reader = RowReader::open(&file_path).await.unwrap();
        loop {
            let batch = reader.next_batch(config.batch_size).await.unwrap();
            if batch.is_empty() {
                break;
            }
            tx.send(LedgerMessage::Batch(batch)).await.unwrap();
        }
        tx.send(LedgerMessage::Shutdown).await.unwrap();

        let totals = handle.await.unwrap();
        assert_eq!(totals.inserted, 3);
        assert_eq!(totals.skipped, 1);
        assert_eq!(totals.batches, 2);
        assert_eq!(reader.malformed(), 1);

        let ledger = ledger.read().await;
        let keys: Vec<i64> = ledger.store().timestamp_keys().collect();
        assert_eq!(keys, vec![1_704_067_200, 1_704_067_205, 1_704_067_210]);

        let eth = ledger.get_first_by_key(IndexKey::Token("ETH")).unwrap();
        assert_eq!(eth.amount, 50.0);
        assert_eq!(eth.status, "N/A");

        assert_eq!(ledger.graph().neighbors("A")["B"].count, 2);
        assert_eq!(ledger.graph().bfs("A"), vec!["A", "B", "C"]);
        assert_eq!(ledger.range(1_704_067_200, 1_704_067_210).len(), 2);
    }

    #[test]
    fn test_bulk_ingest_matches_single_inserts() {
        let rows: Vec<_> = (0..50)
            .map(|i| {
                let symbol = if i % 2 == 0 { "BTC" } else { "ETH" };
                let value = serde_json::json!({
                    "timestamp": 1_000 + (i % 7),
                    "symbol": symbol,
                    "price": i as f64,
                    "sender_wallet": format!("W{}", i % 5),
                    "receiver_wallet": format!("W{}", (i + 1) % 5),
                });
                match value {
                    serde_json::Value::Object(map) => map,
                    _ => unreachable!(),
                }
            })
            .collect();

        let mut bulk = Ledger::new();
        bulk.ingest_rows(rows.clone(), &RowMapping::default());

        let mut single = Ledger::new();
        for row in &rows {
            single
                .insert(RowMapping::default().to_record(row).unwrap())
                .unwrap();
        }

        assert_eq!(bulk.status(), single.status());
        assert_eq!(
            bulk.graph().top_counterparties("W0", 3, RankBy::TotalAmount, Direction::Both),
            single.graph().top_counterparties("W0", 3, RankBy::TotalAmount, Direction::Both)
        );
        let bulk_ids: Vec<usize> = bulk.range(1_000, 1_007).iter().map(|r| r.id).collect();
        let single_ids: Vec<usize> = single.range(1_000, 1_007).iter().map(|r| r.id).collect();
        assert_eq!(bulk_ids, single_ids);
    }
}
