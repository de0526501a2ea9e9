//! Error types for the SDK.
//!
//! Every fallible public operation returns [`Error`]. The variants follow
//! how the failure should be handled, not where it happened:
//!
//! - caller mistakes (`IllegalState`, `Validation`) surface synchronously and
//!   are never retried;
//! - network rejections (`PrecheckStatus`, `ReceiptStatus`) carry the status
//!   code the network reported;
//! - exhaustion (`MaxAttemptsExceeded`, `Timeout`, `MaxChunksExceeded`)
//!   carries the last thing that went wrong, for diagnostics.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::crypto::KeyError;
use crate::hbar::Hbar;
use crate::id::{AccountId, TransactionId};
use crate::network::TransportError;
use crate::status::Status;
use crate::transaction::DecodeError;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the SDK.
#[derive(Debug, Error)]
pub enum Error {
    /// The operation is not allowed in the object's current state
    /// (mutating a frozen transaction, signing an unfrozen one, ...).
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A setter or parser rejected a value.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// The field or input that was rejected.
        field: &'static str,
        /// Why.
        reason: String,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("invalid client config: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    /// A node could not be reached and the failure is not worth retrying.
    #[error("transport failure talking to node {node}: {source}")]
    Transport {
        node: AccountId,
        #[source]
        source: TransportError,
    },

    /// A node rejected the request at precheck with a non-retryable status.
    #[error("precheck failed with status {status} for transaction {}", OptionalId(.transaction_id))]
    PrecheckStatus {
        status: Status,
        transaction_id: Option<TransactionId>,
    },

    /// Consensus was reached and the transaction failed.
    #[error("receipt for transaction {transaction_id} contained error status {status}")]
    ReceiptStatus {
        status: Status,
        transaction_id: TransactionId,
    },

    #[error("exceeded maximum attempts ({max_attempts}); last outcome: {last}")]
    MaxAttemptsExceeded {
        max_attempts: u32,
        last: LastOutcome,
    },

    #[error("request timed out after {timeout:?}; last outcome: {last}")]
    Timeout {
        timeout: Duration,
        last: LastOutcome,
    },

    #[error("payload needs {required} chunks but at most {max} are allowed")]
    MaxChunksExceeded { required: usize, max: usize },

    #[error("query cost {cost} exceeds the maximum payment {max}")]
    MaxQueryPaymentExceeded { cost: Hbar, max: Hbar },
}

impl Error {
    pub(crate) fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState(message.into())
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// The network status carried by this error, if any.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::PrecheckStatus { status, .. } | Self::ReceiptStatus { status, .. } => {
                Some(*status)
            }
            Self::MaxAttemptsExceeded { last, .. } | Self::Timeout { last, .. } => match last {
                LastOutcome::Status(status) => Some(*status),
                _ => None,
            },
            _ => None,
        }
    }
}

/// The last observed result before an execution gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastOutcome {
    /// Nothing was sent.
    Nothing,
    /// A node answered with this status.
    Status(Status),
    /// The exchange itself failed.
    Transport(TransportError),
}

impl fmt::Display for LastOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => f.write_str("no request sent"),
            Self::Status(status) => write!(f, "status {status}"),
            Self::Transport(err) => write!(f, "transport error: {err}"),
        }
    }
}

struct OptionalId<'a>(&'a Option<TransactionId>);

impl fmt::Display for OptionalId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "{id}"),
            None => f.write_str("<none>"),
        }
    }
}
