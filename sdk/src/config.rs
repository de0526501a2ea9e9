//! # SDK Configuration & Defaults
//!
//! Every default the SDK applies lives here. If you are hardcoding a timeout
//! somewhere else, move it here and buy the team coffee.
//!
//! Three layers feed every request, most specific first:
//!
//! 1. per-request overrides ([`ExecutionOverrides`], set on a transaction or
//!    query),
//! 2. the client's [`ExecutionConfig`],
//! 3. the constants below.
//!
//! There is no process-wide singleton: two clients in one test binary never
//! see each other's settings.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::hbar::Hbar;
use crate::id::AccountId;

// ---------------------------------------------------------------------------
// Execution Defaults
// ---------------------------------------------------------------------------

/// How many times a request is sent before giving up. Ten is enough to ride
/// out a node restart without turning a dead network into a ten-minute hang.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// First backoff step after a failed exchange with a node.
pub const DEFAULT_MIN_BACKOFF: Duration = Duration::from_millis(250);

/// Backoff never grows past this. 250ms doubled five times, rounded.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Deadline for a single exchange with a single node.
pub const DEFAULT_GRPC_DEADLINE: Duration = Duration::from_secs(10);

/// Overall budget for one `execute` call, retries and backoff included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Whether an expired transaction id may be replaced and resubmitted.
pub const DEFAULT_REGENERATE_TRANSACTION_IDS: bool = true;

// ---------------------------------------------------------------------------
// Transaction Defaults
// ---------------------------------------------------------------------------

/// How long after its valid start a transaction is accepted by the network.
/// 120 seconds is also the network maximum.
pub const DEFAULT_TRANSACTION_VALID_DURATION: Duration = Duration::from_secs(120);

/// Default ceiling on the fee a payer is willing to be charged.
pub const DEFAULT_MAX_TRANSACTION_FEE: Hbar = Hbar::new(2);

/// Memos longer than this are rejected at the setter, in bytes.
pub const MAX_MEMO_LENGTH: usize = 100;

/// Auto-renew period given to new accounts and topics, about 90 days.
pub const DEFAULT_AUTO_RENEW_PERIOD: Duration = Duration::from_secs(7_890_000);

/// Upper bound on automatic token associations for a new account.
pub const MAX_AUTOMATIC_TOKEN_ASSOCIATIONS: i32 = 5000;

/// Default slice size for chunked topic messages.
pub const DEFAULT_TOPIC_CHUNK_SIZE: usize = 1024;

/// Default slice size for chunked file appends.
pub const DEFAULT_FILE_CHUNK_SIZE: usize = 4096;

/// Chunked submissions needing more pieces than this fail at freeze.
pub const DEFAULT_MAX_CHUNKS: usize = 20;

// ---------------------------------------------------------------------------
// Query Defaults
// ---------------------------------------------------------------------------

/// Paid queries whose quoted cost exceeds this are refused client-side.
pub const DEFAULT_MAX_QUERY_PAYMENT: Hbar = Hbar::new(1);

// ---------------------------------------------------------------------------
// ExecutionConfig
// ---------------------------------------------------------------------------

/// Client-wide execution settings.
///
/// `min_backoff <= max_backoff` is an invariant: setters that would break it
/// are rejected and leave the config untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionConfig {
    request_timeout: Duration,
    grpc_deadline: Duration,
    max_attempts: u32,
    min_backoff: Duration,
    max_backoff: Duration,
    regenerate_transaction_ids: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            grpc_deadline: DEFAULT_GRPC_DEADLINE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_backoff: DEFAULT_MIN_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            regenerate_transaction_ids: DEFAULT_REGENERATE_TRANSACTION_IDS,
        }
    }
}

impl ExecutionConfig {
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn grpc_deadline(&self) -> Duration {
        self.grpc_deadline
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn min_backoff(&self) -> Duration {
        self.min_backoff
    }

    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    pub fn regenerate_transaction_ids(&self) -> bool {
        self.regenerate_transaction_ids
    }

    pub fn set_request_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.request_timeout = timeout;
        self
    }

    pub fn set_grpc_deadline(&mut self, deadline: Duration) -> &mut Self {
        self.grpc_deadline = deadline;
        self
    }

    /// Zero attempts would fail every request before sending it.
    pub fn set_max_attempts(&mut self, attempts: u32) -> Result<&mut Self> {
        if attempts == 0 {
            return Err(Error::validation("max_attempts", "must be at least 1"));
        }
        self.max_attempts = attempts;
        Ok(self)
    }

    pub fn set_min_backoff(&mut self, min: Duration) -> Result<&mut Self> {
        if min > self.max_backoff {
            return Err(Error::validation(
                "min_backoff",
                format!("{min:?} exceeds max backoff {:?}", self.max_backoff),
            ));
        }
        self.min_backoff = min;
        Ok(self)
    }

    pub fn set_max_backoff(&mut self, max: Duration) -> Result<&mut Self> {
        if max < self.min_backoff {
            return Err(Error::validation(
                "max_backoff",
                format!("{max:?} is below min backoff {:?}", self.min_backoff),
            ));
        }
        self.max_backoff = max;
        Ok(self)
    }

    pub fn set_regenerate_transaction_ids(&mut self, regenerate: bool) -> &mut Self {
        self.regenerate_transaction_ids = regenerate;
        self
    }
}

// ---------------------------------------------------------------------------
// ExecutionOverrides
// ---------------------------------------------------------------------------

/// Per-request overrides. `None` means "use the client's value".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOverrides {
    pub(crate) request_timeout: Option<Duration>,
    pub(crate) grpc_deadline: Option<Duration>,
    pub(crate) max_attempts: Option<u32>,
    pub(crate) min_backoff: Option<Duration>,
    pub(crate) max_backoff: Option<Duration>,
}

impl ExecutionOverrides {
    pub(crate) fn set_max_attempts(&mut self, attempts: u32) -> Result<()> {
        if attempts == 0 {
            return Err(Error::validation("max_attempts", "must be at least 1"));
        }
        self.max_attempts = Some(attempts);
        Ok(())
    }

    /// Checked against the request's own max backoff only. The client's
    /// bounds are not known until execution; see [`Self::resolve`].
    pub(crate) fn set_min_backoff(&mut self, min: Duration) -> Result<()> {
        if let Some(max) = self.max_backoff.filter(|max| min > *max) {
            return Err(Error::validation(
                "min_backoff",
                format!("{min:?} exceeds max backoff {max:?}"),
            ));
        }
        self.min_backoff = Some(min);
        Ok(())
    }

    pub(crate) fn set_max_backoff(&mut self, max: Duration) -> Result<()> {
        if let Some(min) = self.min_backoff.filter(|min| max < *min) {
            return Err(Error::validation(
                "max_backoff",
                format!("{max:?} is below min backoff {min:?}"),
            ));
        }
        self.max_backoff = Some(max);
        Ok(())
    }

    /// Layer these overrides over the client config.
    ///
    /// A request may override only one bound. When that bound crosses the
    /// client's other one, the request's value wins and the client's bound
    /// moves to meet it.
    pub(crate) fn resolve(&self, base: &ExecutionConfig) -> ResolvedExecution {
        let (min_backoff, max_backoff) = match (self.min_backoff, self.max_backoff) {
            (Some(min), Some(max)) => (min, max),
            (Some(min), None) => (min, base.max_backoff.max(min)),
            (None, Some(max)) => (base.min_backoff.min(max), max),
            (None, None) => (base.min_backoff, base.max_backoff),
        };
        ResolvedExecution {
            request_timeout: self.request_timeout.unwrap_or(base.request_timeout),
            grpc_deadline: self.grpc_deadline.unwrap_or(base.grpc_deadline),
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            min_backoff,
            max_backoff,
        }
    }
}

/// The effective settings for one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolvedExecution {
    pub request_timeout: Duration,
    pub grpc_deadline: Duration,
    pub max_attempts: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
}

// ---------------------------------------------------------------------------
// ClientConfig (JSON)
// ---------------------------------------------------------------------------

/// Operator section of a client config file.
#[derive(Debug, Clone, Deserialize)]
pub struct OperatorConfig {
    pub account_id: String,
    /// Hex-encoded Ed25519 secret. Fine for a devnet config file; keep real
    /// keys out of plaintext.
    pub private_key: String,
}

/// A client described as JSON.
///
/// ```json
/// {
///   "network": { "127.0.0.1:50211": "0.0.3", "127.0.0.1:50212": "0.0.4" },
///   "operator": { "account_id": "0.0.2", "private_key": "<hex>" },
///   "max_attempts": 5,
///   "min_backoff_ms": 100
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Node address to node account id.
    pub network: BTreeMap<String, String>,
    #[serde(default)]
    pub operator: Option<OperatorConfig>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub min_backoff_ms: Option<u64>,
    #[serde(default)]
    pub max_backoff_ms: Option<u64>,
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub grpc_deadline_ms: Option<u64>,
    #[serde(default)]
    pub regenerate_transaction_ids: Option<bool>,
    #[serde(default)]
    pub max_nodes_per_transaction: Option<usize>,
    #[serde(default)]
    pub default_max_transaction_fee_tinybars: Option<i64>,
    #[serde(default)]
    pub default_max_query_payment_tinybars: Option<i64>,
}

impl ClientConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parsed `(address, node account id)` pairs.
    pub fn nodes(&self) -> Result<Vec<(String, AccountId)>> {
        self.network
            .iter()
            .map(|(address, id)| Ok((address.clone(), id.parse()?)))
            .collect()
    }

    /// Build an [`ExecutionConfig`] from the optional fields, applying the
    /// same min/max validation as the setters.
    pub fn execution_config(&self) -> Result<ExecutionConfig> {
        let mut config = ExecutionConfig::default();
        if let Some(attempts) = self.max_attempts {
            config.set_max_attempts(attempts)?;
        }
        let min = self
            .min_backoff_ms
            .map_or(DEFAULT_MIN_BACKOFF, Duration::from_millis);
        let max = self
            .max_backoff_ms
            .map_or(DEFAULT_MAX_BACKOFF, Duration::from_millis);
        if min > max {
            return Err(Error::validation(
                "min_backoff_ms",
                format!("{min:?} exceeds max backoff {max:?}"),
            ));
        }
        config.min_backoff = min;
        config.max_backoff = max;
        if let Some(ms) = self.request_timeout_ms {
            config.set_request_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.grpc_deadline_ms {
            config.set_grpc_deadline(Duration::from_millis(ms));
        }
        if let Some(regenerate) = self.regenerate_transaction_ids {
            config.set_regenerate_transaction_ids(regenerate);
        }
        Ok(config)
    }
}
