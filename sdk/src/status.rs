//! # Network Status Codes
//!
//! Nodes answer every request with a numeric response code, once at precheck
//! time and again (inside the receipt) after consensus. This module gives
//! those codes names and decides what each one *means* to the client.
//!
//! ## Design Decisions
//!
//! - [`Status`] is generated from a single table so that `from_code`,
//!   `code` and `Display` can never drift apart.
//! - Codes this SDK has no name for are kept as `Status::Unrecognized(code)`
//!   and round-trip unchanged. A newer network must not break an older SDK.
//! - What to *do* with a status lives in [`StatusTable`], a plain value
//!   injected into the client. The retry loop never hard-codes status names.

use std::collections::HashMap;
use std::fmt;

macro_rules! status_codes {
    ($( $(#[$doc:meta])* $variant:ident = $code:literal => $name:literal, )*) => {
        /// A network response code.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Status {
            $( $(#[$doc])* $variant, )*
            /// A code this SDK does not know by name.
            Unrecognized(i32),
        }

        impl Status {
            pub fn from_code(code: i32) -> Self {
                match code {
                    $( $code => Status::$variant, )*
                    other => Status::Unrecognized(other),
                }
            }

            pub fn code(self) -> i32 {
                match self {
                    $( Status::$variant => $code, )*
                    Status::Unrecognized(code) => code,
                }
            }

            /// The wire name, e.g. `TRANSACTION_EXPIRED`.
            pub fn name(self) -> Option<&'static str> {
                match self {
                    $( Status::$variant => Some($name), )*
                    Status::Unrecognized(_) => None,
                }
            }
        }
    };
}

status_codes! {
    /// Precheck passed.
    Ok = 0 => "OK",
    InvalidTransaction = 1 => "INVALID_TRANSACTION",
    PayerAccountNotFound = 2 => "PAYER_ACCOUNT_NOT_FOUND",
    InvalidNodeAccount = 3 => "INVALID_NODE_ACCOUNT",
    /// The valid-start plus valid-duration window has passed.
    TransactionExpired = 4 => "TRANSACTION_EXPIRED",
    InvalidTransactionStart = 5 => "INVALID_TRANSACTION_START",
    InvalidTransactionDuration = 6 => "INVALID_TRANSACTION_DURATION",
    InvalidSignature = 7 => "INVALID_SIGNATURE",
    MemoTooLong = 8 => "MEMO_TOO_LONG",
    InsufficientTxFee = 9 => "INSUFFICIENT_TX_FEE",
    InsufficientPayerBalance = 10 => "INSUFFICIENT_PAYER_BALANCE",
    DuplicateTransaction = 11 => "DUPLICATE_TRANSACTION",
    /// The node is overloaded. Try again, preferably elsewhere.
    Busy = 12 => "BUSY",
    NotSupported = 13 => "NOT_SUPPORTED",
    InvalidFileId = 14 => "INVALID_FILE_ID",
    InvalidAccountId = 15 => "INVALID_ACCOUNT_ID",
    InvalidTransactionId = 17 => "INVALID_TRANSACTION_ID",
    /// No receipt yet, or none retained for this id.
    ReceiptNotFound = 18 => "RECEIPT_NOT_FOUND",
    RecordNotFound = 19 => "RECORD_NOT_FOUND",
    /// Consensus has not been reached yet.
    Unknown = 21 => "UNKNOWN",
    /// Consensus reached and the transaction did what it said.
    Success = 22 => "SUCCESS",
    FailInvalid = 23 => "FAIL_INVALID",
    FailFee = 24 => "FAIL_FEE",
    FailBalance = 25 => "FAIL_BALANCE",
    KeyRequired = 26 => "KEY_REQUIRED",
    BadEncoding = 27 => "BAD_ENCODING",
    InsufficientAccountBalance = 28 => "INSUFFICIENT_ACCOUNT_BALANCE",
    InvalidReceivingNodeAccount = 35 => "INVALID_RECEIVING_NODE_ACCOUNT",
    MissingQueryHeader = 36 => "MISSING_QUERY_HEADER",
    InvalidKeyEncoding = 38 => "INVALID_KEY_ENCODING",
    InvalidQueryHeader = 41 => "INVALID_QUERY_HEADER",
    InvalidFeeSubmitted = 42 => "INVALID_FEE_SUBMITTED",
    InvalidPayerSignature = 43 => "INVALID_PAYER_SIGNATURE",
    KeyNotProvided = 44 => "KEY_NOT_PROVIDED",
    InvalidExpirationTime = 45 => "INVALID_EXPIRATION_TIME",
    FileContentEmpty = 47 => "FILE_CONTENT_EMPTY",
    InvalidAccountAmounts = 48 => "INVALID_ACCOUNT_AMOUNTS",
    EmptyTransactionBody = 49 => "EMPTY_TRANSACTION_BODY",
    InvalidTransactionBody = 50 => "INVALID_TRANSACTION_BODY",
    TransactionOversize = 64 => "TRANSACTION_OVERSIZE",
    /// The node is starting up or catching up.
    PlatformNotActive = 67 => "PLATFORM_NOT_ACTIVE",
    /// The node failed to hand the transaction to consensus.
    PlatformTransactionNotCreated = 69 => "PLATFORM_TRANSACTION_NOT_CREATED",
    InvalidRenewalPeriod = 70 => "INVALID_RENEWAL_PERIOD",
    InvalidPayerAccountId = 71 => "INVALID_PAYER_ACCOUNT_ID",
    AccountDeleted = 72 => "ACCOUNT_DELETED",
    FileDeleted = 73 => "FILE_DELETED",
    AccountRepeatedInAccountAmounts = 74 => "ACCOUNT_REPEATED_IN_ACCOUNT_AMOUNTS",
    InvalidInitialBalance = 85 => "INVALID_INITIAL_BALANCE",
    TransferListSizeLimitExceeded = 92 => "TRANSFER_LIST_SIZE_LIMIT_EXCEEDED",
    AuthorizationFailed = 99 => "AUTHORIZATION_FAILED",
    InvalidTopicId = 150 => "INVALID_TOPIC_ID",
    InvalidTokenId = 167 => "INVALID_TOKEN_ID",
    TokenAlreadyAssociatedToAccount = 194 => "TOKEN_ALREADY_ASSOCIATED_TO_ACCOUNT",
    TokenNotAssociatedToAccount = 184 => "TOKEN_NOT_ASSOCIATED_TO_ACCOUNT",
    InvalidScheduleId = 201 => "INVALID_SCHEDULE_ID",
    NegativeAllowanceAmount = 291 => "NEGATIVE_ALLOWANCE_AMOUNT",
    SpenderDoesNotHaveAllowance = 292 => "SPENDER_DOES_NOT_HAVE_ALLOWANCE",
    /// An approved transfer asked for more than the remaining allowance.
    AmountExceedsAllowance = 293 => "AMOUNT_EXCEEDS_ALLOWANCE",
    MaxAllowancesExceeded = 294 => "MAX_ALLOWANCES_EXCEEDED",
    EmptyAllowances = 295 => "EMPTY_ALLOWANCES",
    InvalidAllowanceOwnerId = 300 => "INVALID_ALLOWANCE_OWNER_ID",
    InvalidAllowanceSpenderId = 301 => "INVALID_ALLOWANCE_SPENDER_ID",
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "UNRECOGNIZED({})", self.code()),
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// What the client should do about a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusBucket {
    /// Done, hand the result back.
    Success,
    /// Node-local transient trouble: back off and try another node.
    Retryable,
    /// The transaction id's validity window has closed.
    Expired,
    /// The request itself is wrong. Retrying cannot help.
    NonRetryable,
    /// Ask again later: consensus or the receipt is not there yet.
    StillProcessing,
    /// Consensus reached, and the answer is no.
    TerminalFailure,
}

/// Status → bucket lookup, one map for precheck codes and one for the codes
/// found inside receipts.
///
/// Unlisted precheck codes are `NonRetryable`; unlisted consensus codes are
/// `TerminalFailure`. Both defaults fail closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTable {
    precheck: HashMap<Status, StatusBucket>,
    consensus: HashMap<Status, StatusBucket>,
}

impl StatusTable {
    /// A table with no entries at all. Useful as a starting point for a
    /// network whose code semantics differ from the defaults.
    pub fn empty() -> Self {
        Self {
            precheck: HashMap::new(),
            consensus: HashMap::new(),
        }
    }

    pub fn with_precheck(mut self, status: Status, bucket: StatusBucket) -> Self {
        self.precheck.insert(status, bucket);
        self
    }

    pub fn with_consensus(mut self, status: Status, bucket: StatusBucket) -> Self {
        self.consensus.insert(status, bucket);
        self
    }

    pub fn classify_precheck(&self, status: Status) -> StatusBucket {
        self.precheck
            .get(&status)
            .copied()
            .unwrap_or(StatusBucket::NonRetryable)
    }

    pub fn classify_consensus(&self, status: Status) -> StatusBucket {
        self.consensus
            .get(&status)
            .copied()
            .unwrap_or(StatusBucket::TerminalFailure)
    }
}

impl Default for StatusTable {
    fn default() -> Self {
        use StatusBucket::*;

        Self::empty()
            .with_precheck(Status::Ok, Success)
            .with_precheck(Status::Busy, Retryable)
            .with_precheck(Status::PlatformNotActive, Retryable)
            .with_precheck(Status::PlatformTransactionNotCreated, Retryable)
            .with_precheck(Status::TransactionExpired, Expired)
            .with_precheck(Status::ReceiptNotFound, StillProcessing)
            .with_precheck(Status::RecordNotFound, StillProcessing)
            .with_consensus(Status::Success, Success)
            .with_consensus(Status::Unknown, StillProcessing)
            .with_consensus(Status::Busy, StillProcessing)
            .with_consensus(Status::Ok, StillProcessing)
            .with_consensus(Status::ReceiptNotFound, StillProcessing)
            .with_consensus(Status::RecordNotFound, StillProcessing)
            .with_consensus(Status::PlatformNotActive, StillProcessing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_roundtrip() {
        for code in [0, 4, 12, 21, 22, 69, 293] {
            assert_eq!(Status::from_code(code).code(), code);
        }
        assert_eq!(Status::from_code(12), Status::Busy);
        assert_eq!(Status::Busy.to_string(), "BUSY");
    }

    #[test]
    fn unknown_codes_survive() {
        let status = Status::from_code(9_999);
        assert_eq!(status, Status::Unrecognized(9_999));
        assert_eq!(status.code(), 9_999);
        assert_eq!(status.to_string(), "UNRECOGNIZED(9999)");
    }

    #[test]
    fn default_precheck_buckets() {
        let table = StatusTable::default();
        assert_eq!(table.classify_precheck(Status::Ok), StatusBucket::Success);
        assert_eq!(table.classify_precheck(Status::Busy), StatusBucket::Retryable);
        assert_eq!(
            table.classify_precheck(Status::TransactionExpired),
            StatusBucket::Expired
        );
        assert_eq!(
            table.classify_precheck(Status::InvalidSignature),
            StatusBucket::NonRetryable
        );
        assert_eq!(
            table.classify_precheck(Status::Unrecognized(4242)),
            StatusBucket::NonRetryable
        );
    }

    #[test]
    fn default_consensus_buckets() {
        let table = StatusTable::default();
        assert_eq!(table.classify_consensus(Status::Success), StatusBucket::Success);
        assert_eq!(
            table.classify_consensus(Status::Unknown),
            StatusBucket::StillProcessing
        );
        assert_eq!(
            table.classify_consensus(Status::AmountExceedsAllowance),
            StatusBucket::TerminalFailure
        );
    }

    #[test]
    fn injected_table_overrides_defaults() {
        let table = StatusTable::default().with_precheck(Status::Busy, StatusBucket::NonRetryable);
        assert_eq!(
            table.classify_precheck(Status::Busy),
            StatusBucket::NonRetryable
        );
        assert_eq!(
            StatusTable::empty().classify_precheck(Status::Ok),
            StatusBucket::NonRetryable
        );
    }
}
