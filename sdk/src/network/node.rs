//! # Service Node
//!
//! A `Node` is the client's bookkeeping for one network participant: which
//! account it answers for, where to reach it, and how much we currently trust
//! it to answer.
//!
//! Health follows a simple penalty-box model:
//!
//! ```text
//! Healthy --failure--> Backoff { until: now + backoff, attempts: 1 }
//! Backoff --failure--> Backoff { until: now + 2x backoff, attempts: n + 1 }
//! Backoff --success--> Healthy (backoff halves, never below the minimum)
//! ```
//!
//! A node in `Backoff` is still usable once `until` has passed, and the pool
//! will fall back to it even earlier when nothing healthier is left.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config;
use crate::id::AccountId;

// ---------------------------------------------------------------------------
// Health State
// ---------------------------------------------------------------------------

/// How much the client trusts a node right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// Eligible for any attempt.
    Healthy,
    /// Recently failed. Deprioritized until `until`.
    Backoff {
        /// When the node is readmitted.
        until: Instant,
        /// Consecutive failures since the node was last healthy.
        attempts: u32,
    },
}

#[derive(Debug)]
struct NodeHealth {
    state: HealthState,
    current_backoff: Duration,
    bad_attempts_total: u64,
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// One known service node.
///
/// Health lives behind the node's own lock so concurrent calls marking
/// different nodes never contend.
#[derive(Debug)]
pub struct Node {
    account_id: AccountId,
    address: String,
    min_backoff: Duration,
    max_backoff: Duration,
    health: Mutex<NodeHealth>,
}

impl Node {
    /// Creates a healthy node with the default backoff window.
    pub fn new(account_id: AccountId, address: impl Into<String>) -> Self {
        Self::with_backoff(
            account_id,
            address,
            config::DEFAULT_MIN_NODE_BACKOFF,
            config::DEFAULT_MAX_NODE_BACKOFF,
        )
    }

    /// Creates a healthy node with a custom backoff window.
    pub fn with_backoff(
        account_id: AccountId,
        address: impl Into<String>,
        min_backoff: Duration,
        max_backoff: Duration,
    ) -> Self {
        Self {
            account_id,
            address: address.into(),
            min_backoff,
            max_backoff,
            health: Mutex::new(NodeHealth {
                state: HealthState::Healthy,
                current_backoff: min_backoff,
                bad_attempts_total: 0,
            }),
        }
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Snapshot of the current health state.
    pub fn health(&self) -> HealthState {
        self.health.lock().state
    }

    /// Whether the node may be used now.
    pub fn is_healthy(&self) -> bool {
        self.is_healthy_at(Instant::now())
    }

    /// Whether the node may be used at `now`.
    pub fn is_healthy_at(&self, now: Instant) -> bool {
        match self.health.lock().state {
            HealthState::Healthy => true,
            HealthState::Backoff { until, .. } => until <= now,
        }
    }

    /// When a backed-off node is readmitted. `None` for healthy nodes.
    pub fn readmit_at(&self) -> Option<Instant> {
        match self.health.lock().state {
            HealthState::Healthy => None,
            HealthState::Backoff { until, .. } => Some(until),
        }
    }

    /// The penalty the *next* failure will apply.
    pub fn current_backoff(&self) -> Duration {
        self.health.lock().current_backoff
    }

    /// Failures recorded over the node's lifetime.
    pub fn bad_attempts_total(&self) -> u64 {
        self.health.lock().bad_attempts_total
    }

    /// Records a failure: the node sits out `current_backoff`, and the next
    /// penalty doubles (capped at the maximum).
    pub fn increase_backoff(&self) {
        let mut health = self.health.lock();
        let attempts = match health.state {
            HealthState::Healthy => 1,
            HealthState::Backoff { attempts, .. } => attempts.saturating_add(1),
        };
        let penalty = health.current_backoff;
        health.state = HealthState::Backoff {
            until: Instant::now() + penalty,
            attempts,
        };
        health.current_backoff = (penalty * 2).min(self.max_backoff);
        health.bad_attempts_total += 1;
        drop(health);

        info!(
            node = %self.account_id,
            address = %self.address,
            backoff_ms = penalty.as_millis() as u64,
            attempts,
            "node marked unhealthy"
        );
    }

    /// Records a success: the node is healthy again and its next penalty
    /// halves (floored at the minimum).
    pub fn decrease_backoff(&self) {
        let mut health = self.health.lock();
        let was_backed_off = matches!(health.state, HealthState::Backoff { .. });
        health.state = HealthState::Healthy;
        health.current_backoff = (health.current_backoff / 2).max(self.min_backoff);
        drop(health);

        if was_backed_off {
            info!(node = %self.account_id, "node readmitted");
        } else {
            debug!(node = %self.account_id, "node healthy");
        }
    }
}
