//! Record types owned by the store

use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// Slot position in the record array. Assigned at insert, never reused.
pub type RecordId = usize;

/// A stored transaction record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// Epoch seconds
    pub timestamp: i64,
    /// Timestamp text as it arrived from the importer, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_raw: Option<String>,
    pub token: String,
    pub amount: f64,
    pub fee: f64,
    pub sender_wallet: String,
    pub receiver_wallet: String,
    pub status: String,
    pub tombstoned: bool,
}

impl Record {
    /// Both endpoints known; only such records contribute graph edges
    pub fn has_wallets(&self) -> bool {
        !self.sender_wallet.is_empty() && !self.receiver_wallet.is_empty()
    }

    /// Field-wise equality with an insert payload, ignoring id and tombstone
    pub fn matches(&self, new: &NewRecord) -> bool {
        self.timestamp == new.timestamp
            && self.timestamp_raw == new.timestamp_raw
            && self.token == new.token
            && self.amount == new.amount
            && self.fee == new.fee
            && self.sender_wallet == new.sender_wallet
            && self.receiver_wallet == new.receiver_wallet
            && self.status == new.status
    }
}

/// Insert payload: a record before it has an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub timestamp: i64,
    #[serde(default)]
    pub timestamp_raw: Option<String>,
    pub token: String,
    pub amount: f64,
    #[serde(default)]
    pub fee: f64,
    #[serde(default)]
    pub sender_wallet: String,
    #[serde(default)]
    pub receiver_wallet: String,
    #[serde(default)]
    pub status: String,
}

impl NewRecord {
    pub fn new(timestamp: i64, token: impl Into<String>, amount: f64) -> Self {
        Self {
            timestamp,
            timestamp_raw: None,
            token: token.into(),
            amount,
            fee: 0.0,
            sender_wallet: String::new(),
            receiver_wallet: String::new(),
            status: String::new(),
        }
    }

    pub fn with_fee(mut self, fee: f64) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_wallets(mut self, sender: impl Into<String>, receiver: impl Into<String>) -> Self {
        self.sender_wallet = sender.into();
        self.receiver_wallet = receiver.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_timestamp_raw(mut self, raw: impl Into<String>) -> Self {
        self.timestamp_raw = Some(raw.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_finite("amount", self.amount)?;
        check_finite("fee", self.fee)
    }

    pub(crate) fn into_record(self, id: RecordId) -> Record {
        Record {
            id,
            timestamp: self.timestamp,
            timestamp_raw: self.timestamp_raw,
            token: self.token,
            amount: self.amount,
            fee: self.fee,
            sender_wallet: self.sender_wallet,
            receiver_wallet: self.receiver_wallet,
            status: self.status,
            tombstoned: false,
        }
    }
}

/// Partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPatch {
    pub timestamp: Option<i64>,
    pub token: Option<String>,
    pub amount: Option<f64>,
    pub fee: Option<f64>,
    pub sender_wallet: Option<String>,
    pub receiver_wallet: Option<String>,
    pub status: Option<String>,
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn fee(mut self, fee: f64) -> Self {
        self.fee = Some(fee);
        self
    }

    pub fn sender_wallet(mut self, wallet: impl Into<String>) -> Self {
        self.sender_wallet = Some(wallet.into());
        self
    }

    pub fn receiver_wallet(mut self, wallet: impl Into<String>) -> Self {
        self.receiver_wallet = Some(wallet.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(LedgerError::validation("update carries no fields"));
        }
        if let Some(amount) = self.amount {
            check_finite("amount", amount)?;
        }
        if let Some(fee) = self.fee {
            check_finite("fee", fee)?;
        }
        Ok(())
    }
}

fn check_finite(field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(LedgerError::validation(format!("{} must be finite, got {}", field, value)))
    }
}
