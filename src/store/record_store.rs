//! Append-only record array with timestamp, token and sender-wallet indexes
//!
//! Ids are array positions. Deletion tombstones the slot and drops the id
//! from every bucket; the slot itself is never reused or compacted.

use super::record::{NewRecord, Record, RecordId, RecordPatch};
use crate::error::{LedgerError, Result};
use crate::index::{Bucket, OrderedIndex};
use std::fmt::Debug;

/// Key into one of the three store indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKey<'a> {
    Timestamp(i64),
    Token(&'a str),
    Sender(&'a str),
}

#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    by_timestamp: OrderedIndex<i64, Bucket>,
    by_token: OrderedIndex<String, Bucket>,
    by_sender: OrderedIndex<String, Bucket>,
    active: usize,
}

fn bucket_add<K: Ord>(index: &mut OrderedIndex<K, Bucket>, key: K, id: RecordId) {
    match index.get_mut(&key) {
        Some(bucket) => bucket.push(id),
        None => {
            index.put(key, Bucket::single(id));
        }
    }
}

fn ensure_member<K: Ord + Debug>(
    index: &OrderedIndex<K, Bucket>,
    key: &K,
    id: RecordId,
    index_name: &str,
) -> Result<()> {
    match index.get(key) {
        Some(bucket) if bucket.contains(id) => Ok(()),
        _ => Err(LedgerError::invariant(format!(
            "record {} missing from {} bucket {:?}",
            id, index_name, key
        ))),
    }
}

/// Caller has already checked membership with `ensure_member`
fn bucket_remove<K: Ord>(index: &mut OrderedIndex<K, Bucket>, key: &K, id: RecordId) {
    let now_empty = match index.get_mut(key) {
        Some(bucket) => {
            bucket.remove_id(id);
            bucket.is_empty()
        }
        None => false,
    };
    if now_empty {
        index.remove(key);
    }
}

fn indexed_ids<K: Ord>(index: &OrderedIndex<K, Bucket>) -> usize {
    index.values().map(Bucket::len).sum()
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append and index a record, returning its id.
    ///
    /// Duplicate timestamps are allowed; the bucket keeps every id in
    /// insertion order.
    pub fn insert(&mut self, new: NewRecord) -> Result<RecordId> {
        new.validate()?;

        let id = self.records.len();
        let record = new.into_record(id);

        bucket_add(&mut self.by_timestamp, record.timestamp, id);
        bucket_add(&mut self.by_token, record.token.clone(), id);
        bucket_add(&mut self.by_sender, record.sender_wallet.clone(), id);

        log::debug!(
            "Inserted record {} ts={} token={} amount={:.6}",
            id,
            record.timestamp,
            record.token,
            record.amount
        );

        self.records.push(record);
        self.active += 1;
        Ok(id)
    }

    /// Live record by id; tombstoned or unknown ids are absent
    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(id).filter(|r| !r.tombstoned)
    }

    /// Raw bucket for a key, if the key has any live ids
    pub fn bucket(&self, key: IndexKey<'_>) -> Option<&Bucket> {
        match key {
            IndexKey::Timestamp(ts) => self.by_timestamp.get(&ts),
            IndexKey::Token(token) => self.by_token.get(token),
            IndexKey::Sender(wallet) => self.by_sender.get(wallet),
        }
    }

    fn live_records<'a>(&'a self, bucket: &'a Bucket) -> impl Iterator<Item = &'a Record> + 'a {
        bucket.ids().iter().filter_map(move |&id| self.get(id))
    }

    /// First live record in the key's bucket, in insertion order
    pub fn get_first_by_key(&self, key: IndexKey<'_>) -> Option<&Record> {
        let bucket = self.bucket(key)?;
        self.live_records(bucket).next()
    }

    /// All live records in the key's bucket, in insertion order
    pub fn get_all_by_key(&self, key: IndexKey<'_>) -> Vec<&Record> {
        match self.bucket(key) {
            Some(bucket) => self.live_records(bucket).collect(),
            None => Vec::new(),
        }
    }

    pub fn by_timestamp(&self, timestamp: i64) -> Vec<&Record> {
        self.get_all_by_key(IndexKey::Timestamp(timestamp))
    }

    pub fn by_token(&self, token: &str) -> Vec<&Record> {
        self.get_all_by_key(IndexKey::Token(token))
    }

    pub fn by_sender(&self, wallet: &str) -> Vec<&Record> {
        self.get_all_by_key(IndexKey::Sender(wallet))
    }

    /// Live records with `start <= timestamp < end`, ascending by timestamp,
    /// ties in insertion order
    pub fn range(&self, start: i64, end: i64) -> Vec<&Record> {
        self.by_timestamp
            .range(&start, &end)
            .flat_map(|(_, bucket)| self.live_records(bucket))
            .collect()
    }

    /// Apply a partial update. `Ok(false)` when the id is unknown or tombstoned.
    ///
    /// Indexed fields that change move the id from the old bucket to the end
    /// of the new one.
    pub fn update(&mut self, id: RecordId, patch: RecordPatch) -> Result<bool> {
        patch.validate()?;
        if self.get(id).is_none() {
            return Ok(false);
        }

        let current = &self.records[id];
        let new_ts = patch.timestamp.filter(|ts| *ts != current.timestamp);
        let new_token = patch.token.filter(|t| *t != current.token);
        let new_sender = patch.sender_wallet.filter(|w| *w != current.sender_wallet);

        // Check every affected bucket before touching any of them
        if new_ts.is_some() {
            ensure_member(&self.by_timestamp, &current.timestamp, id, "timestamp")?;
        }
        if new_token.is_some() {
            ensure_member(&self.by_token, &current.token, id, "token")?;
        }
        if new_sender.is_some() {
            ensure_member(&self.by_sender, &current.sender_wallet, id, "sender")?;
        }

        if let Some(ts) = new_ts {
            let old = self.records[id].timestamp;
            bucket_remove(&mut self.by_timestamp, &old, id);
            bucket_add(&mut self.by_timestamp, ts, id);
            self.records[id].timestamp = ts;
            // Raw text no longer describes the stored value
            self.records[id].timestamp_raw = None;
        }
        if let Some(token) = new_token {
            let old = std::mem::replace(&mut self.records[id].token, token.clone());
            bucket_remove(&mut self.by_token, &old, id);
            bucket_add(&mut self.by_token, token, id);
        }
        if let Some(wallet) = new_sender {
            let old = std::mem::replace(&mut self.records[id].sender_wallet, wallet.clone());
            bucket_remove(&mut self.by_sender, &old, id);
            bucket_add(&mut self.by_sender, wallet, id);
        }

        let record = &mut self.records[id];
        if let Some(amount) = patch.amount {
            record.amount = amount;
        }
        if let Some(fee) = patch.fee {
            record.fee = fee;
        }
        if let Some(receiver) = patch.receiver_wallet {
            record.receiver_wallet = receiver;
        }
        if let Some(status) = patch.status {
            record.status = status;
        }

        log::debug!("Updated record {}", id);
        Ok(true)
    }

    /// Tombstone a record. `Ok(false)` when the id is unknown or already deleted.
    pub fn delete(&mut self, id: RecordId) -> Result<bool> {
        if self.get(id).is_none() {
            return Ok(false);
        }

        let record = &self.records[id];
        let (ts, token, sender) = (
            record.timestamp,
            record.token.clone(),
            record.sender_wallet.clone(),
        );
        ensure_member(&self.by_timestamp, &ts, id, "timestamp")?;
        ensure_member(&self.by_token, &token, id, "token")?;
        ensure_member(&self.by_sender, &sender, id, "sender")?;

        bucket_remove(&mut self.by_timestamp, &ts, id);
        bucket_remove(&mut self.by_token, &token, id);
        bucket_remove(&mut self.by_sender, &sender, id);

        self.records[id].tombstoned = true;
        self.active -= 1;

        log::debug!("Deleted record {} (ts={})", id, ts);
        Ok(true)
    }

    /// Live records in id order
    pub fn iter_active(&self) -> impl Iterator<Item = &Record> + '_ {
        self.records.iter().filter(|r| !r.tombstoned)
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Allocated slots, tombstones included
    pub fn slot_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    pub fn distinct_timestamps(&self) -> usize {
        self.by_timestamp.len()
    }

    pub fn timestamp_index_height(&self) -> usize {
        self.by_timestamp.height()
    }

    /// Indexed timestamps, ascending
    pub fn timestamp_keys(&self) -> impl Iterator<Item = i64> + '_ {
        self.by_timestamp.keys().copied()
    }

    /// Full cross-check of the record array against all three indexes
    pub fn verify_indexes(&self) -> Result<()> {
        let live = self.iter_active().count();
        if live != self.active {
            return Err(LedgerError::invariant(format!(
                "active count {} but {} live slots",
                self.active, live
            )));
        }

        for record in self.iter_active() {
            let memberships = [
                ("timestamp", self.bucket(IndexKey::Timestamp(record.timestamp))),
                ("token", self.bucket(IndexKey::Token(&record.token))),
                ("sender", self.bucket(IndexKey::Sender(&record.sender_wallet))),
            ];
            for (name, bucket) in memberships {
                let hits = bucket.map_or(0, |b| b.ids().iter().filter(|&&i| i == record.id).count());
                if hits != 1 {
                    return Err(LedgerError::invariant(format!(
                        "record {} appears {} times in {} index",
                        record.id, hits, name
                    )));
                }
            }
        }

        let totals = [
            indexed_ids(&self.by_timestamp),
            indexed_ids(&self.by_token),
            indexed_ids(&self.by_sender),
        ];
        if totals.iter().any(|&t| t != self.active) {
            return Err(LedgerError::invariant(format!(
                "index sizes {:?} disagree with {} active records",
                totals, self.active
            )));
        }
        Ok(())
    }
}
