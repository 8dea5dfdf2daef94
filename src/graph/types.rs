//! Aggregate and query types for the wallet graph

use serde::{Deserialize, Serialize};

/// Transaction count plus summed amount, used for edges and per-token tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowStats {
    pub count: u64,
    pub total_amount: f64,
}

impl FlowStats {
    pub fn record(&mut self, amount: f64) {
        self.count += 1;
        self.total_amount += amount;
    }

    pub fn merge(&mut self, other: &FlowStats) {
        self.count += other.count;
        self.total_amount += other.total_amount;
    }

    /// Ranking value for `by`. Fees are not tracked by the graph and read 0.
    pub fn metric(&self, by: RankBy) -> f64 {
        match by {
            RankBy::Count => self.count as f64,
            RankBy::TotalAmount => self.total_amount,
            RankBy::TotalFee => 0.0,
        }
    }
}

/// Which edges of a wallet to consider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Out,
    In,
    Both,
}

impl Direction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "out" => Some(Direction::Out),
            "in" => Some(Direction::In),
            "both" => Some(Direction::Both),
            _ => None,
        }
    }
}

/// Ranking key for top-K queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBy {
    Count,
    TotalAmount,
    TotalFee,
}

impl RankBy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" => Some(RankBy::Count),
            "total_amount" | "total_amt" | "amount" => Some(RankBy::TotalAmount),
            "total_fee" | "fee" => Some(RankBy::TotalFee),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterpartyRow {
    pub counterparty: String,
    pub count: u64,
    pub total_amount: f64,
    pub total_fee: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairStats {
    pub directed: bool,
    pub count: u64,
    pub total_amount: f64,
    /// Edge a→b, if any
    pub forward: Option<FlowStats>,
    /// Edge b→a, if any (always `None` in directed mode)
    pub reverse: Option<FlowStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopWallet {
    pub wallet: String,
    pub token: String,
    pub count: u64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletSummary {
    pub wallet: String,
    pub out_degree: usize,
    pub in_degree: usize,
    pub sent_count: u64,
    pub sent_total: f64,
    pub received_count: u64,
    pub received_total: f64,
    pub token_count: usize,
}
