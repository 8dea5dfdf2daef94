//! Derived wallet graph, rebuilt from the record store after every mutation

pub mod types;
pub mod wallet_graph;

pub use types::{CounterpartyRow, Direction, FlowStats, PairStats, RankBy, TopWallet, WalletSummary};
pub use wallet_graph::WalletGraph;
