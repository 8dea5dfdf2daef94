//! Directed wallet-to-wallet multigraph derived from the record store
//!
//! The graph is never patched: `rebuild` discards everything and re-scans the
//! live records in id order. Adjacency maps keep first-seen order, so BFS
//! discovery and every other iteration is reproducible across rebuilds.

use super::types::{
    CounterpartyRow, Direction, FlowStats, PairStats, RankBy, TopWallet, WalletSummary,
};
use crate::store::RecordStore;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::time::Instant;

type Adjacency = IndexMap<String, IndexMap<String, FlowStats>>;

#[derive(Debug, Clone, Default)]
pub struct WalletGraph {
    /// sender → receiver → edge
    outgoing: Adjacency,
    /// receiver → sender → edge (mirror of `outgoing`)
    incoming: Adjacency,
    /// wallet → token → tally over both send and receive participation
    wallet_tokens: IndexMap<String, BTreeMap<String, FlowStats>>,
    edge_count: usize,
}

impl WalletGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_store(store: &RecordStore) -> Self {
        let mut graph = Self::new();
        graph.rebuild(store);
        graph
    }

    /// Recompute every edge and token tally from the store's live records
    pub fn rebuild(&mut self, store: &RecordStore) {
        let started = Instant::now();
        self.outgoing.clear();
        self.incoming.clear();
        self.wallet_tokens.clear();

        for record in store.iter_active() {
            if !record.has_wallets() {
                continue;
            }
            let sender = &record.sender_wallet;
            let receiver = &record.receiver_wallet;
            let token = record.token.trim();

            for wallet in [sender, receiver] {
                self.wallet_tokens
                    .entry(wallet.clone())
                    .or_default()
                    .entry(token.to_string())
                    .or_default()
                    .record(record.amount);
            }

            self.outgoing
                .entry(sender.clone())
                .or_default()
                .entry(receiver.clone())
                .or_default()
                .record(record.amount);
            self.incoming
                .entry(receiver.clone())
                .or_default()
                .entry(sender.clone())
                .or_default()
                .record(record.amount);
        }

        self.edge_count = self.outgoing.values().map(IndexMap::len).sum();

        log::debug!(
            "Graph rebuilt: {} wallets, {} edges in {:?}",
            self.wallet_tokens.len(),
            self.edge_count,
            started.elapsed()
        );
    }

    /// Wallets seen as sender or receiver of any edge
    pub fn node_count(&self) -> usize {
        self.wallet_tokens.len()
    }

    pub fn wallets_with_outgoing(&self) -> usize {
        self.outgoing.len()
    }

    /// Distinct ordered (sender, receiver) pairs
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Outgoing edges of `wallet`, in first-seen order (empty when unknown)
    pub fn neighbors(&self, wallet: &str) -> IndexMap<String, FlowStats> {
        self.outgoing.get(wallet).cloned().unwrap_or_default()
    }

    /// Top `k` counterparties ranked by `by`, ties broken by counterparty ascending.
    ///
    /// `Both` sums a counterparty's outgoing and incoming edge stats.
    pub fn top_counterparties(
        &self,
        wallet: &str,
        k: usize,
        by: RankBy,
        direction: Direction,
    ) -> Vec<CounterpartyRow> {
        let mut merged: IndexMap<&str, FlowStats> = IndexMap::new();

        let sides: Vec<&Adjacency> = match direction {
            Direction::Out => vec![&self.outgoing],
            Direction::In => vec![&self.incoming],
            Direction::Both => vec![&self.outgoing, &self.incoming],
        };
        for side in sides {
            if let Some(edges) = side.get(wallet) {
                for (other, stats) in edges {
                    merged.entry(other.as_str()).or_default().merge(stats);
                }
            }
        }

        let mut ranked: Vec<(&str, FlowStats)> = merged.into_iter().collect();
        ranked.sort_by(|(a_name, a), (b_name, b)| {
            b.metric(by)
                .total_cmp(&a.metric(by))
                .then_with(|| a_name.cmp(b_name))
        });

        ranked
            .into_iter()
            .take(k)
            .map(|(name, stats)| CounterpartyRow {
                counterparty: name.to_string(),
                count: stats.count,
                total_amount: stats.total_amount,
                total_fee: stats.metric(RankBy::TotalFee),
            })
            .collect()
    }

    /// Minimal-hop path over outgoing edges, `None` when `dst` is unreachable
    /// or `src` has never sent anything
    pub fn shortest_path(&self, src: &str, dst: &str) -> Option<Vec<String>> {
        if !self.outgoing.contains_key(src) {
            return None;
        }
        if src == dst {
            return Some(vec![src.to_string()]);
        }

        let mut came_from: HashMap<&str, &str> = HashMap::new();
        let mut visited: HashSet<&str> = HashSet::from([src]);
        let mut queue: VecDeque<&str> = VecDeque::from([src]);

        while let Some(current) = queue.pop_front() {
            let Some(edges) = self.outgoing.get(current) else {
                continue;
            };
            for next in edges.keys() {
                let next = next.as_str();
                if !visited.insert(next) {
                    continue;
                }
                came_from.insert(next, current);
                if next == dst {
                    let mut path = vec![dst.to_string()];
                    let mut walk = dst;
                    while let Some(&prev) = came_from.get(walk) {
                        path.push(prev.to_string());
                        walk = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// Breadth-first visit order over outgoing edges. An unknown start yields `[start]`.
    pub fn bfs(&self, start: &str) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::from([start]);
        let mut queue: VecDeque<&str> = VecDeque::from([start]);
        let mut order = Vec::new();

        while let Some(current) = queue.pop_front() {
            order.push(current.to_string());
            if let Some(edges) = self.outgoing.get(current) {
                for next in edges.keys() {
                    if visited.insert(next.as_str()) {
                        queue.push_back(next.as_str());
                    }
                }
            }
        }
        order
    }

    /// Depth-first pre-order over outgoing edges, children in first-seen order
    pub fn dfs(&self, start: &str) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = vec![start];
        let mut order = Vec::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            order.push(current.to_string());
            if let Some(edges) = self.outgoing.get(current) {
                // Reversed so the first neighbor is explored first
                for next in edges.keys().rev() {
                    if !visited.contains(next.as_str()) {
                        stack.push(next.as_str());
                    }
                }
            }
        }
        order
    }

    /// Edge a→b in directed mode; a→b merged with b→a otherwise
    pub fn pair_stats(&self, a: &str, b: &str, directed: bool) -> Option<PairStats> {
        let edge = |from: &str, to: &str| self.outgoing.get(from).and_then(|e| e.get(to)).copied();

        let forward = edge(a, b);
        let reverse = if directed { None } else { edge(b, a) };
        if forward.is_none() && reverse.is_none() {
            return None;
        }

        let mut total = FlowStats::default();
        for stats in forward.iter().chain(reverse.iter()) {
            total.merge(stats);
        }

        Some(PairStats {
            directed,
            count: total.count,
            total_amount: total.total_amount,
            forward,
            reverse,
        })
    }

    /// Per-token tallies for a wallet over both directions (empty when unknown)
    pub fn wallet_currency_breakdown(&self, wallet: &str) -> BTreeMap<String, FlowStats> {
        self.wallet_tokens.get(wallet).cloned().unwrap_or_default()
    }

    /// Top `k` tokens for a wallet by total amount
    pub fn top_tokens_for_wallet(&self, wallet: &str, k: usize) -> Vec<(String, f64)> {
        let Some(tokens) = self.wallet_tokens.get(wallet) else {
            return Vec::new();
        };
        let mut rows: Vec<(String, f64)> = tokens
            .iter()
            .map(|(token, stats)| (token.clone(), stats.total_amount))
            .collect();
        rows.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        rows.truncate(k);
        rows
    }

    /// Wallet with the highest count or amount in `symbol`; ties go to the
    /// lexicographically smallest wallet
    pub fn top_wallet_by_currency(&self, symbol: &str, by: RankBy) -> Option<TopWallet> {
        let symbol = symbol.trim();
        let mut best: Option<(&str, FlowStats)> = None;

        for (wallet, tokens) in &self.wallet_tokens {
            let Some(stats) = tokens.get(symbol) else {
                continue;
            };
            let better = match &best {
                None => true,
                Some((best_wallet, best_stats)) => {
                    match stats.metric(by).total_cmp(&best_stats.metric(by)) {
                        std::cmp::Ordering::Greater => true,
                        std::cmp::Ordering::Equal => wallet.as_str() < *best_wallet,
                        std::cmp::Ordering::Less => false,
                    }
                }
            };
            if better {
                best = Some((wallet.as_str(), *stats));
            }
        }

        best.map(|(wallet, stats)| TopWallet {
            wallet: wallet.to_string(),
            token: symbol.to_string(),
            count: stats.count,
            total_amount: stats.total_amount,
        })
    }

    pub fn wallet_summary(&self, wallet: &str) -> WalletSummary {
        let mut summary = WalletSummary {
            wallet: wallet.to_string(),
            ..WalletSummary::default()
        };

        if let Some(edges) = self.outgoing.get(wallet) {
            summary.out_degree = edges.len();
            for stats in edges.values() {
                summary.sent_count += stats.count;
                summary.sent_total += stats.total_amount;
            }
        }
        if let Some(edges) = self.incoming.get(wallet) {
            summary.in_degree = edges.len();
            for stats in edges.values() {
                summary.received_count += stats.count;
                summary.received_total += stats.total_amount;
            }
        }
        summary.token_count = self.wallet_tokens.get(wallet).map_or(0, BTreeMap::len);
        summary
    }
}
