//! Raw import rows and their mapping onto [`NewRecord`]

use super::time_codec::parse_timestamp_value;
use crate::error::{LedgerError, Result};
use crate::store::NewRecord;
use serde_json::{Map, Value};

/// One decoded import line: column name → cell
pub type RawRow = Map<String, Value>;

pub const DEFAULT_TIMESTAMP_COLUMN: &str = "timestamp";
pub const MISSING_TEXT: &str = "N/A";

const TOKEN_COLUMNS: [&str; 3] = ["symbol", "crypto_symbol", "token"];
const AMOUNT_COLUMNS: [&str; 3] = ["price", "amount_usd", "amount"];
const FEE_COLUMNS: [&str; 3] = ["volume", "fee_usd", "fee"];
const SENDER_COLUMNS: [&str; 2] = ["sender_wallet", "wallet_from"];
const RECEIVER_COLUMNS: [&str; 2] = ["receiver_wallet", "wallet_to"];
const STATUS_COLUMNS: [&str; 1] = ["status"];

/// Which column carries the record timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMapping {
    pub timestamp_column: String,
}

impl Default for RowMapping {
    fn default() -> Self {
        Self {
            timestamp_column: DEFAULT_TIMESTAMP_COLUMN.to_string(),
        }
    }
}

impl RowMapping {
    pub fn new(timestamp_column: impl Into<String>) -> Self {
        Self {
            timestamp_column: timestamp_column.into(),
        }
    }

    /// Map a raw row. Only the timestamp is mandatory; every other column
    /// falls back to a default when absent or unreadable.
    pub fn to_record(&self, row: &RawRow) -> Result<NewRecord> {
        let raw_ts = row.get(&self.timestamp_column).ok_or_else(|| {
            LedgerError::validation(format!("missing column '{}'", self.timestamp_column))
        })?;
        let timestamp = parse_timestamp_value(raw_ts)?;

        let token = text_cell(row, &TOKEN_COLUMNS).unwrap_or_else(|| MISSING_TEXT.to_string());
        let status = text_cell(row, &STATUS_COLUMNS).unwrap_or_else(|| MISSING_TEXT.to_string());
        let sender = text_cell(row, &SENDER_COLUMNS).unwrap_or_default();
        let receiver = text_cell(row, &RECEIVER_COLUMNS).unwrap_or_default();

        Ok(NewRecord::new(timestamp, token, number_cell(row, &AMOUNT_COLUMNS))
            .with_fee(number_cell(row, &FEE_COLUMNS))
            .with_wallets(sender, receiver)
            .with_status(status)
            .with_timestamp_raw(cell_text(raw_ts)))
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// First non-empty cell among `columns`
fn text_cell(row: &RawRow, columns: &[&str]) -> Option<String> {
    columns
        .iter()
        .filter_map(|c| row.get(*c))
        .filter(|v| !v.is_null())
        .map(cell_text)
        .find(|s| !s.trim().is_empty())
}

/// First non-empty cell among `columns` read as a finite float, else 0.0
fn number_cell(row: &RawRow, columns: &[&str]) -> f64 {
    let cell = columns
        .iter()
        .filter_map(|c| row.get(*c))
        .find(|v| match v {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        });

    let parsed = match cell {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite()).unwrap_or(0.0)
}
