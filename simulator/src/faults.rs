//! Scripted misbehavior, per node.
//!
//! Tests queue faults against a node and the next requests that node
//! receives consume them in order. A node can also be taken down entirely,
//! in which case every request fails at the transport until it is restored.

use std::collections::VecDeque;
use std::time::Duration;

use dashmap::{DashMap, DashSet};
use tracing::debug;

use strata_sdk::{AccountId, Status, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Answer with this precheck status instead of processing the request.
    Precheck(Status),
    /// Fail the exchange without answering.
    Transport(TransportError),
    /// Stall before processing. The client's deadline may fire first.
    Delay(Duration),
}

#[derive(Debug, Default)]
pub struct Faults {
    queued: DashMap<AccountId, VecDeque<Fault>>,
    down: DashSet<AccountId>,
}

impl Faults {
    pub fn inject(&self, node: AccountId, fault: Fault) {
        self.inject_n(node, fault, 1);
    }

    /// Queue the same fault `times` times.
    pub fn inject_n(&self, node: AccountId, fault: Fault, times: usize) {
        let mut queue = self.queued.entry(node).or_default();
        queue.extend(std::iter::repeat(fault).take(times));
    }

    pub fn take_down(&self, node: AccountId) {
        debug!(node = %node, "node taken down");
        self.down.insert(node);
    }

    pub fn restore(&self, node: AccountId) {
        self.down.remove(&node);
    }

    pub fn clear(&self) {
        self.queued.clear();
        self.down.clear();
    }

    /// Faults still waiting to fire against `node`.
    pub fn pending(&self, node: &AccountId) -> usize {
        self.queued.get(node).map_or(0, |q| q.len())
    }

    /// The fault the next request to `node` runs into, if any.
    pub(crate) fn next(&self, node: &AccountId) -> Option<Fault> {
        if self.down.contains(node) {
            return Some(Fault::Transport(TransportError::Unavailable(format!(
                "{node} is down"
            ))));
        }
        self.queued.get_mut(node)?.pop_front()
    }
}
