//! One node in the address book, and how healthy we currently think it is.

use std::time::Duration;

use tokio::time::Instant;

use crate::backoff::exponential_delay;
use crate::id::AccountId;

/// Where to reach a node, and the account id the node signs for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub account_id: AccountId,
    /// Opaque to the SDK; the transport decides what it means
    /// (`host:port`, a channel name in tests, ...).
    pub address: String,
}

impl Endpoint {
    pub fn new(account_id: AccountId, address: impl Into<String>) -> Self {
        Self {
            account_id,
            address: address.into(),
        }
    }
}

/// Cooldown bookkeeping for a single node.
///
/// A node that keeps failing is pushed further into the future each time,
/// but it is never dropped: the moment its cooldown lapses it is a
/// candidate again, and one good exchange wipes the slate.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeHealth {
    consecutive_failures: u32,
    ready_at: Option<Instant>,
}

impl NodeHealth {
    pub fn mark_failure(&mut self, min: Duration, max: Duration, now: Instant) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.ready_at = Some(now + exponential_delay(min, max, self.consecutive_failures));
    }

    pub fn mark_success(&mut self) {
        self.consecutive_failures = 0;
        self.ready_at = None;
    }

    /// How long until this node may be used again. Zero when it is ready.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.ready_at
            .map(|at| at.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_healthy(&self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: Duration = Duration::from_millis(250);
    const MAX: Duration = Duration::from_secs(8);

    #[test]
    fn fresh_node_is_healthy() {
        let health = NodeHealth::default();
        assert!(health.is_healthy(Instant::now()));
        assert_eq!(health.consecutive_failures(), 0);
    }

    #[test]
    fn failures_push_the_cooldown_out() {
        let now = Instant::now();
        let mut health = NodeHealth::default();

        health.mark_failure(MIN, MAX, now);
        assert_eq!(health.remaining(now), MIN);

        health.mark_failure(MIN, MAX, now);
        assert_eq!(health.remaining(now), MIN * 2);
        assert!(!health.is_healthy(now));
        assert!(health.is_healthy(now + MIN * 2));
    }

    #[test]
    fn success_resets() {
        let now = Instant::now();
        let mut health = NodeHealth::default();
        health.mark_failure(MIN, MAX, now);
        health.mark_failure(MIN, MAX, now);
        health.mark_success();
        assert!(health.is_healthy(now));

        health.mark_failure(MIN, MAX, now);
        assert_eq!(health.remaining(now), MIN);
    }
}
