//! # Node Pool
//!
//! Tracks the configured network and answers two questions for the execution
//! engine: *how many* nodes may a request target, and *which* node should the
//! next attempt use.
//!
//! No I/O happens here. Node health is stored per node (see [`Node`]), the
//! node list is behind a read-mostly lock, and selection never holds a lock
//! across an await point.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::Instant;
use tracing::debug;

use super::node::Node;
use crate::config;
use crate::id::AccountId;

/// How the pool spreads attempts across healthy nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionStrategy {
    /// Walk the healthy nodes in account order.
    #[default]
    RoundRobin,
    /// Pick a healthy node uniformly at random (seedable for tests).
    Random,
}

/// The set of known nodes plus their shared selection state.
pub struct NodePool {
    /// Account ids in ascending order. Defines "network order".
    order: RwLock<Vec<AccountId>>,
    nodes: DashMap<AccountId, Arc<Node>>,
    max_nodes_per_request: AtomicUsize,
    cursor: AtomicUsize,
    strategy: SelectionStrategy,
    rng: Mutex<StdRng>,
    min_node_backoff: Duration,
    max_node_backoff: Duration,
}

impl NodePool {
    /// Builds a pool from `address -> node account id`, the shape network
    /// configs are usually written in.
    pub fn new(network: BTreeMap<String, AccountId>) -> Self {
        let pool = Self {
            order: RwLock::new(Vec::new()),
            nodes: DashMap::new(),
            max_nodes_per_request: AtomicUsize::new(0),
            cursor: AtomicUsize::new(0),
            strategy: SelectionStrategy::RoundRobin,
            rng: Mutex::new(StdRng::from_entropy()),
            min_node_backoff: config::DEFAULT_MIN_NODE_BACKOFF,
            max_node_backoff: config::DEFAULT_MAX_NODE_BACKOFF,
        };
        pool.set_network(network);
        pool
    }

    /// Switches node selection strategy.
    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Seeds the random selection strategy so tests see a fixed sequence.
    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    /// Overrides the per-node backoff window. Applies to the current nodes
    /// and any added later by [`set_network`](Self::set_network).
    pub fn with_node_backoff(mut self, min: Duration, max: Duration) -> Self {
        self.min_node_backoff = min;
        self.max_node_backoff = max;
        let network = self.network();
        self.nodes.clear();
        self.set_network(network);
        self
    }

    /// Replaces the network. Nodes that survive the change keep their health.
    pub fn set_network(&self, network: BTreeMap<String, AccountId>) {
        let mut order = self.order.write();

        let wanted: BTreeMap<AccountId, String> = network
            .into_iter()
            .map(|(address, account_id)| (account_id, address))
            .collect();

        self.nodes.retain(|id, node| wanted.get(id).map(String::as_str) == Some(node.address()));
        for (account_id, address) in &wanted {
            if !self.nodes.contains_key(account_id) {
                let node = Node::with_backoff(
                    account_id.clone(),
                    address.clone(),
                    self.min_node_backoff,
                    self.max_node_backoff,
                );
                self.nodes.insert(account_id.clone(), Arc::new(node));
            }
        }

        *order = wanted.into_keys().collect();
        debug!(nodes = order.len(), "network updated");
    }

    /// The network as `address -> account id`.
    pub fn network(&self) -> BTreeMap<String, AccountId> {
        self.order
            .read()
            .iter()
            .filter_map(|id| {
                self.nodes
                    .get(id)
                    .map(|node| (node.address().to_string(), id.clone()))
            })
            .collect()
    }

    /// Number of known nodes.
    pub fn len(&self) -> usize {
        self.order.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Caps how many nodes a single request may target. `0` clears the cap.
    pub fn set_max_nodes_per_request(&self, max: usize) {
        self.max_nodes_per_request.store(max, Ordering::Relaxed);
    }

    /// The configured cap, or `None` when unset.
    pub fn max_nodes_per_request(&self) -> Option<usize> {
        match self.max_nodes_per_request.load(Ordering::Relaxed) {
            0 => None,
            n => Some(n),
        }
    }

    /// How many nodes a request may address: the network size, limited by the
    /// cap when one is set.
    pub fn number_of_nodes_for_request(&self) -> usize {
        let size = self.len();
        match self.max_nodes_per_request() {
            Some(cap) => size.min(cap),
            None => size,
        }
    }

    /// Looks up a node by account id.
    pub fn node(&self, account_id: &AccountId) -> Option<Arc<Node>> {
        self.nodes.get(account_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Nodes currently eligible for attempts.
    pub fn healthy_count(&self) -> usize {
        let now = Instant::now();
        self.order
            .read()
            .iter()
            .filter_map(|id| self.node(id))
            .filter(|node| node.is_healthy_at(now))
            .count()
    }

    /// The nodes a new request should be frozen against: healthy nodes first
    /// (in selection order), then backed-off nodes by earliest readmission,
    /// truncated to [`number_of_nodes_for_request`](Self::number_of_nodes_for_request).
    pub fn nodes_for_request(&self) -> Vec<AccountId> {
        let count = self.number_of_nodes_for_request();
        let ids = self.order.read().clone();
        let (mut healthy, mut benched) = self.partition(&ids);

        if !healthy.is_empty() {
            let start = match self.strategy {
                SelectionStrategy::RoundRobin => {
                    self.cursor.fetch_add(1, Ordering::Relaxed) % healthy.len()
                }
                SelectionStrategy::Random => self.rng.lock().gen_range(0..healthy.len()),
            };
            healthy.rotate_left(start);
        }
        benched.sort_by_key(|node| node.readmit_at());

        healthy
            .into_iter()
            .chain(benched)
            .take(count)
            .map(|node| node.account_id().clone())
            .collect()
    }

    /// Picks the node for the next attempt among `candidates` (usually the
    /// node list a transaction was frozen with).
    ///
    /// Healthy candidates are chosen by the pool's strategy. If none are
    /// healthy the candidate readmitted soonest is returned anyway, so a
    /// fully benched network slows down instead of failing outright.
    /// Candidates the pool has never heard of are ignored.
    pub fn select_node(&self, candidates: &[AccountId]) -> Option<Arc<Node>> {
        let (healthy, benched) = self.partition(candidates);

        if !healthy.is_empty() {
            let index = match self.strategy {
                SelectionStrategy::RoundRobin => {
                    self.cursor.fetch_add(1, Ordering::Relaxed) % healthy.len()
                }
                SelectionStrategy::Random => self.rng.lock().gen_range(0..healthy.len()),
            };
            return healthy.into_iter().nth(index);
        }

        benched.into_iter().min_by_key(|node| node.readmit_at())
    }

    /// Records a failed attempt against `account_id`.
    pub fn mark_unhealthy(&self, account_id: &AccountId) {
        if let Some(node) = self.node(account_id) {
            node.increase_backoff();
        }
    }

    /// Records a successful attempt against `account_id`.
    pub fn mark_healthy(&self, account_id: &AccountId) {
        if let Some(node) = self.node(account_id) {
            node.decrease_backoff();
        }
    }

    fn partition(&self, ids: &[AccountId]) -> (Vec<Arc<Node>>, Vec<Arc<Node>>) {
        let now = Instant::now();
        ids.iter()
            .filter_map(|id| self.node(id))
            .partition(|node| node.is_healthy_at(now))
    }
}

impl std::fmt::Debug for NodePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodePool")
            .field("nodes", &self.len())
            .field("max_nodes_per_request", &self.max_nodes_per_request())
            .field("strategy", &self.strategy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(n: u64) -> BTreeMap<String, AccountId> {
        (0..n)
            .map(|i| (format!("10.0.0.{}:50211", i + 1), AccountId::from_num(3 + i)))
            .collect()
    }

    #[test]
    fn test_number_of_nodes_without_cap_is_network_size() {
        let pool = NodePool::new(network(5));
        assert_eq!(pool.number_of_nodes_for_request(), 5);
    }

    #[test]
    fn test_number_of_nodes_respects_cap() {
        let pool = NodePool::new(network(5));
        pool.set_max_nodes_per_request(2);
        assert_eq!(pool.number_of_nodes_for_request(), 2);

        // A cap larger than the network changes nothing.
        pool.set_max_nodes_per_request(50);
        assert_eq!(pool.number_of_nodes_for_request(), 5);

        // Zero means "unset".
        pool.set_max_nodes_per_request(0);
        assert_eq!(pool.max_nodes_per_request(), None);
        assert_eq!(pool.number_of_nodes_for_request(), 5);
    }

    #[test]
    fn test_degenerate_networks() {
        let empty = NodePool::new(BTreeMap::new());
        empty.set_max_nodes_per_request(3);
        assert_eq!(empty.number_of_nodes_for_request(), 0);
        assert!(empty.nodes_for_request().is_empty());
        assert!(empty.select_node(&[AccountId::from_num(3)]).is_none());

        let single = NodePool::new(network(1));
        assert_eq!(single.number_of_nodes_for_request(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_robin_cycles_through_healthy_candidates() {
        let pool = NodePool::new(network(3));
        let candidates: Vec<_> = (3..6).map(AccountId::from_num).collect();
        let picks: Vec<u64> = (0..6)
            .map(|_| pool.select_node(&candidates).unwrap().account_id().num)
            .collect();
        assert_eq!(picks, vec![3, 4, 5, 3, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhealthy_nodes_are_skipped_while_others_are_healthy() {
        let pool = NodePool::new(network(3));
        pool.mark_unhealthy(&AccountId::from_num(4));
        let candidates: Vec<_> = (3..6).map(AccountId::from_num).collect();
        for _ in 0..6 {
            let picked = pool.select_node(&candidates).unwrap();
            assert_ne!(picked.account_id().num, 4);
        }
        assert_eq!(pool.healthy_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fully_benched_candidates_fall_back_to_earliest_readmit() {
        let pool = NodePool::new(network(2));
        pool.mark_unhealthy(&AccountId::from_num(3));
        tokio::time::advance(Duration::from_secs(1)).await;
        pool.mark_unhealthy(&AccountId::from_num(4));

        let candidates = vec![AccountId::from_num(3), AccountId::from_num(4)];
        let picked = pool.select_node(&candidates).unwrap();
        assert_eq!(picked.account_id().num, 3, "node 3 is readmitted first");
    }

    #[tokio::test(start_paused = true)]
    async fn test_nodes_for_request_orders_healthy_first_and_truncates() {
        let pool = NodePool::new(network(4));
        pool.mark_unhealthy(&AccountId::from_num(3));
        pool.set_max_nodes_per_request(3);

        let nodes = pool.nodes_for_request();
        assert_eq!(nodes.len(), 3);
        assert!(!nodes.contains(&AccountId::from_num(3)));

        pool.set_max_nodes_per_request(0);
        let nodes = pool.nodes_for_request();
        assert_eq!(nodes.last(), Some(&AccountId::from_num(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_random_strategy_is_deterministic_for_a_seed() {
        let candidates: Vec<_> = (3..8).map(AccountId::from_num).collect();
        let run = || {
            let pool = NodePool::new(network(5))
                .with_strategy(SelectionStrategy::Random)
                .with_seed(42);
            (0..10)
                .map(|_| pool.select_node(&candidates).unwrap().account_id().num)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_network_preserves_health_of_surviving_nodes() {
        let pool = NodePool::new(network(3));
        pool.mark_unhealthy(&AccountId::from_num(3));

        let mut smaller = network(3);
        smaller.remove("10.0.0.3:50211");
        pool.set_network(smaller);

        assert_eq!(pool.len(), 2);
        assert!(pool.node(&AccountId::from_num(5)).is_none());
        assert!(!pool.node(&AccountId::from_num(3)).unwrap().is_healthy());
    }

    #[test]
    fn test_unknown_candidates_are_ignored() {
        let pool = NodePool::new(network(1));
        let picked = pool
            .select_node(&[AccountId::from_num(99), AccountId::from_num(3)])
            .unwrap();
        assert_eq!(picked.account_id().num, 3);
    }
}
