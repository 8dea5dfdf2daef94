//! Single-pass amount statistics over the live records
//!
//! Nothing is buffered besides the bounded reservoir: count, sum, min and max
//! are exact over the full pass, percentiles come from the sorted sample and
//! are exact only while the match count fits in the sample.

use super::reservoir::{nearest_rank, Reservoir};
use super::running::RunningStats;
use crate::store::{Record, RecordStore};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SAMPLE_SIZE: usize = 50_000;
pub const DEFAULT_SEED: u64 = 1337;

/// AND-combined equality filters. Blank values mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountFilter {
    pub token: Option<String>,
    pub status: Option<String>,
    pub sender_wallet: Option<String>,
    pub receiver_wallet: Option<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AmountFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
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

    /// Trimmed copy with blank filters dropped
    pub fn normalized(&self) -> Self {
        Self {
            token: clean(self.token.clone()),
            status: clean(self.status.clone()),
            sender_wallet: clean(self.sender_wallet.clone()),
            receiver_wallet: clean(self.receiver_wallet.clone()),
        }
    }

    /// Expects a normalized filter
    pub fn matches(&self, record: &Record) -> bool {
        let eq = |want: &Option<String>, have: &str| want.as_deref().map_or(true, |w| w == have);
        eq(&self.token, &record.token)
            && eq(&self.status, &record.status)
            && eq(&self.sender_wallet, &record.sender_wallet)
            && eq(&self.receiver_wallet, &record.receiver_wallet)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingOptions {
    pub sample_size: usize,
    pub seed: u64,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountSummary {
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub variance_pop: f64,
    pub std_pop: f64,
    pub percentiles: Percentiles,
    /// Values the percentiles were computed from
    pub sample_len: usize,
    /// Percentiles cover every matching value
    pub exact: bool,
    pub note: String,
}

/// Result of [`amount_analytics`]. A zero count carries no summary, only a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountAnalytics {
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<AmountSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub filters: AmountFilter,
}

impl AmountAnalytics {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Stream every live record matching `filter` once, tracking exact moments
/// and a seeded reservoir sample for percentiles
pub fn amount_analytics(
    store: &RecordStore,
    filter: &AmountFilter,
    options: SamplingOptions,
) -> AmountAnalytics {
    let filter = filter.normalized();
    let mut stats = RunningStats::new();
    let mut reservoir = Reservoir::new(options.sample_size, options.seed);

    for record in store.iter_active().filter(|r| filter.matches(r)) {
        stats.push(record.amount);
        reservoir.offer(record.amount);
    }

    let (Some(min), Some(max)) = (stats.min(), stats.max()) else {
        return AmountAnalytics {
            count: 0,
            summary: None,
            message: Some("No matching records.".to_string()),
            filters: filter,
        };
    };

    let exact = reservoir.is_exact();
    let sorted = reservoir.into_sorted();
    let note = if exact {
        format!("Percentiles are exact over all {} matching values", sorted.len())
    } else {
        format!(
            "Percentiles are estimated from a reservoir sample (size={})",
            sorted.len()
        )
    };

    log::debug!(
        "Amount analytics: {} matches, sample {} (exact={})",
        stats.count(),
        sorted.len(),
        exact
    );

    AmountAnalytics {
        count: stats.count(),
        summary: Some(AmountSummary {
            sum: stats.sum(),
            min,
            max,
            mean: stats.mean(),
            variance_pop: stats.variance_pop(),
            std_pop: stats.std_pop(),
            percentiles: Percentiles {
                p50: nearest_rank(&sorted, 0.50),
                p90: nearest_rank(&sorted, 0.90),
                p95: nearest_rank(&sorted, 0.95),
                p99: nearest_rank(&sorted, 0.99),
            },
            sample_len: sorted.len(),
            exact,
            note,
        }),
        message: None,
        filters: filter,
    }
}
