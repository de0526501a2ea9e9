//! # Network Module
//!
//! The client's view of the ledger network: an address book of nodes, a
//! cooldown timer per node, and the [`Transport`] seam the execution engine
//! talks through.
//!
//! ## Architecture
//!
//! ```text
//! node.rs     : Endpoint (address + node account id) and per-node cooldown
//! transport.rs: Transport trait, TransportRequest, TransportError
//! mod.rs      : Network: node selection shared by every request on a client
//! ```
//!
//! ## Design Decisions
//!
//! - Node health is the only state shared between concurrent executions on
//!   one client. It sits behind a `parking_lot::Mutex` that is only held for
//!   a map lookup, never across an `.await`, so no request ever waits on
//!   another request's network I/O.
//! - Selection is round-robin over the candidate list, skipping nodes in
//!   cooldown. If every candidate is cooling down, the one that becomes
//!   ready soonest is picked and the caller sleeps for the difference.

pub mod node;
pub mod transport;

pub use node::Endpoint;
pub use transport::{Transport, TransportError, TransportRequest};

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Error, Result};
use crate::id::AccountId;
use node::NodeHealth;

/// The address book plus per-node health.
#[derive(Debug)]
pub struct Network {
    endpoints: Vec<Endpoint>,
    health: Mutex<HashMap<AccountId, NodeHealth>>,
}

impl Network {
    /// Build from `(address, node account id)` pairs.
    ///
    /// Fails on an empty list or a node account id that appears twice.
    pub fn new(nodes: impl IntoIterator<Item = (String, AccountId)>) -> Result<Self> {
        let mut endpoints: Vec<Endpoint> = Vec::new();
        for (address, account_id) in nodes {
            account_id.require_num("node account id")?;
            if endpoints.iter().any(|e| e.account_id == account_id) {
                return Err(Error::validation(
                    "network",
                    format!("node {account_id} is listed twice"),
                ));
            }
            endpoints.push(Endpoint::new(account_id, address));
        }
        if endpoints.is_empty() {
            return Err(Error::validation("network", "no nodes configured"));
        }
        let health = endpoints
            .iter()
            .map(|e| (e.account_id, NodeHealth::default()))
            .collect();
        Ok(Self {
            endpoints,
            health: Mutex::new(health),
        })
    }

    /// Every node account id, in address-book order.
    pub fn node_ids(&self) -> Vec<AccountId> {
        self.endpoints.iter().map(|e| e.account_id).collect()
    }

    pub fn endpoint(&self, node: &AccountId) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| &e.account_id == node)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// The nodes a freshly frozen transaction is addressed to.
    ///
    /// A third of the network (rounded up) unless `max_nodes` says
    /// otherwise, healthy nodes first, shuffled so that many clients don't
    /// all hammer the same node.
    pub fn node_ids_for_execute(&self, max_nodes: Option<usize>) -> Vec<AccountId> {
        let count = max_nodes
            .unwrap_or_else(|| self.endpoints.len().div_ceil(3))
            .clamp(1, self.endpoints.len());

        let now = Instant::now();
        let health = self.health.lock();
        let (mut healthy, mut cooling): (Vec<AccountId>, Vec<AccountId>) = self
            .endpoints
            .iter()
            .map(|e| e.account_id)
            .partition(|id| health.get(id).map_or(true, |h| h.is_healthy(now)));
        drop(health);

        let mut rng = rand::thread_rng();
        healthy.shuffle(&mut rng);
        cooling.shuffle(&mut rng);
        healthy.extend(cooling);
        healthy.truncate(count);
        healthy
    }

    /// Pick the node for attempt number `rotation` out of `candidates`.
    ///
    /// Returns the endpoint and how long to wait before using it (zero if it
    /// is ready now).
    pub(crate) fn select(
        &self,
        candidates: &[AccountId],
        rotation: usize,
    ) -> Result<(Endpoint, Duration)> {
        if candidates.is_empty() {
            return Err(Error::illegal_state("no candidate nodes to send to"));
        }

        let now = Instant::now();
        let health = self.health.lock();
        let remaining = |id: &AccountId| {
            health
                .get(id)
                .map_or(Duration::ZERO, |h| h.remaining(now))
        };

        let n = candidates.len();
        let mut best: Option<(AccountId, Duration)> = None;
        for offset in 0..n {
            let id = candidates[(rotation + offset) % n];
            let wait = remaining(&id);
            if wait.is_zero() {
                best = Some((id, wait));
                break;
            }
            if best.map_or(true, |(_, w)| wait < w) {
                best = Some((id, wait));
            }
        }
        drop(health);

        // Non-empty candidates always produce a pick.
        let (id, wait) = best.ok_or_else(|| Error::illegal_state("no candidate nodes"))?;
        let endpoint = self.endpoint(&id).cloned().ok_or_else(|| {
            Error::validation("node account id", format!("{id} is not in the network"))
        })?;
        if !wait.is_zero() {
            debug!(node = %id, wait_ms = wait.as_millis() as u64, "all candidates cooling down");
        }
        Ok((endpoint, wait))
    }

    pub(crate) fn mark_failure(&self, node: AccountId, min: Duration, max: Duration) {
        let now = Instant::now();
        self.health
            .lock()
            .entry(node)
            .or_default()
            .mark_failure(min, max, now);
    }

    pub(crate) fn mark_success(&self, node: AccountId) {
        if let Some(health) = self.health.lock().get_mut(&node) {
            health.mark_success();
        }
    }

    /// Whether `node` is outside its cooldown right now.
    pub fn is_healthy(&self, node: &AccountId) -> bool {
        let now = Instant::now();
        self.health
            .lock()
            .get(node)
            .map_or(true, |h| h.is_healthy(now))
    }
}
