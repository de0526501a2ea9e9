//! # Identifiers
//!
//! Pure value types, no I/O:
//!
//! ```text
//! entity_id.rs     : shard.realm.num (or alias) for accounts, tokens, topics, files, schedules
//! transaction_id.rs: payer + valid start, with scheduled / nonce markers
//! ```

pub mod entity_id;
pub mod transaction_id;

pub use entity_id::{
    AccountId, EntityAddress, EntityId, FileId, ScheduleId, TokenId, TopicId, EVM_ADDRESS_LENGTH,
};
pub use transaction_id::TransactionId;
