//! # Transaction Kinds
//!
//! One [`TransactionData`](super::TransactionData) impl per kind the SDK can
//! build. Each file owns its kind's fields, its frozen-gated setters, and
//! the mapping to and from its slot in the body's `data` oneof. Nothing
//! here knows about freezing, signing or the network.
//!
//! ```text
//! account.rs  : AccountCreate, AccountDelete
//! allowance.rs: AccountAllowanceApprove, AccountAllowanceDelete
//! file.rs     : FileCreate, FileAppend (chunked)
//! prng.rs     : Prng
//! schedule.rs : ScheduleDelete
//! token.rs    : TokenAssociate, TokenDissociate
//! topic.rs    : TopicCreate, TopicDelete, TopicMessageSubmit (chunked)
//! transfer.rs : Transfer
//! ```

pub mod account;
pub mod allowance;
pub mod file;
pub mod prng;
pub mod schedule;
pub mod token;
pub mod topic;
pub mod transfer;

pub use account::{
    AccountCreateTransaction, AccountCreateTransactionData, AccountDeleteTransaction,
    AccountDeleteTransactionData,
};
pub use allowance::{
    AccountAllowanceApproveTransaction, AccountAllowanceApproveTransactionData,
    AccountAllowanceDeleteTransaction, AccountAllowanceDeleteTransactionData, HbarAllowance,
    NftAllowanceRemoval, TokenAllowance,
};
pub use file::{
    FileAppendTransaction, FileAppendTransactionData, FileCreateTransaction,
    FileCreateTransactionData,
};
pub use prng::{PrngTransaction, PrngTransactionData};
pub use schedule::{ScheduleDeleteTransaction, ScheduleDeleteTransactionData};
pub use token::{
    TokenAssociateTransaction, TokenAssociateTransactionData, TokenDissociateTransaction,
    TokenDissociateTransactionData,
};
pub use topic::{
    TopicCreateTransaction, TopicCreateTransactionData, TopicDeleteTransaction,
    TopicDeleteTransactionData, TopicMessageSubmitTransaction, TopicMessageSubmitTransactionData,
};
pub use transfer::{HbarTransfer, TransferTransaction, TransferTransactionData};

use std::time::Duration;

use super::DecodeError;
use crate::crypto::PublicKey;
use crate::error;
use crate::id::{AccountId, EntityId};
use crate::proto;

// ---------------------------------------------------------------------------
// Wire helpers shared by the kinds
// ---------------------------------------------------------------------------

/// The body carried a different kind than the one being decoded.
pub(crate) fn wrong_kind(expected: &'static str) -> DecodeError {
    DecodeError::malformed("data", format!("expected a {expected} body"))
}

pub(crate) fn account_to_proto(id: Option<AccountId>) -> error::Result<Option<proto::AccountId>> {
    id.map(EntityId::to_account_proto).transpose()
}

pub(crate) fn account_from_proto(
    id: Option<&proto::AccountId>,
    field: &'static str,
) -> Result<Option<AccountId>, DecodeError> {
    id.map(AccountId::from_account_proto)
        .transpose()
        .map_err(|e| DecodeError::malformed(field, e.to_string()))
}

pub(crate) fn entity_to_proto(id: Option<EntityId>) -> error::Result<Option<proto::EntityNum>> {
    id.map(EntityId::to_num_proto).transpose()
}

pub(crate) fn entity_from_proto(
    id: Option<&proto::EntityNum>,
    field: &'static str,
) -> Result<Option<EntityId>, DecodeError> {
    id.map(EntityId::from_num_proto)
        .transpose()
        .map_err(|e| DecodeError::malformed(field, e.to_string()))
}

pub(crate) fn key_to_proto(key: Option<PublicKey>) -> Option<proto::Key> {
    key.map(PublicKey::to_key_proto)
}

pub(crate) fn key_from_proto(
    key: Option<&proto::Key>,
    field: &'static str,
) -> Result<Option<PublicKey>, DecodeError> {
    key.map(PublicKey::from_key_proto)
        .transpose()
        .map_err(|e| DecodeError::malformed(field, e.to_string()))
}

pub(crate) fn duration_to_proto(duration: Duration) -> proto::Duration {
    proto::Duration {
        seconds: duration.as_secs() as i64,
    }
}

pub(crate) fn duration_from_proto(duration: Option<&proto::Duration>) -> Option<Duration> {
    duration.map(|d| Duration::from_secs(u64::try_from(d.seconds).unwrap_or(0)))
}
