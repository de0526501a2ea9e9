//! # Wire Schema
//!
//! Hand-derived `prost` messages for the subset of the ledger's protobuf
//! schema this SDK speaks. Field numbers are the network's; names follow
//! Rust conventions. Nothing here has behavior beyond encode/decode.
//!
//! ```text
//! basic.rs: ids, keys, timestamps, the three-layer transaction envelope
//! body.rs : TransactionBody and its per-kind `data` oneof
//! query.rs: Query / Response, receipts, records, balances
//! ```

pub mod basic;
pub mod body;
pub mod query;

pub use basic::*;
pub use body::*;
pub use query::*;

/// Fully-qualified gRPC method paths, one per service call the SDK makes.
pub mod methods {
    pub const CREATE_ACCOUNT: &str = "/proto.CryptoService/createAccount";
    pub const CRYPTO_DELETE: &str = "/proto.CryptoService/cryptoDelete";
    pub const CRYPTO_TRANSFER: &str = "/proto.CryptoService/cryptoTransfer";
    pub const APPROVE_ALLOWANCES: &str = "/proto.CryptoService/approveAllowances";
    pub const DELETE_ALLOWANCES: &str = "/proto.CryptoService/deleteAllowances";
    pub const GET_BALANCE: &str = "/proto.CryptoService/cryptoGetBalance";
    pub const GET_RECEIPT: &str = "/proto.CryptoService/getTransactionReceipts";
    pub const GET_RECORD: &str = "/proto.CryptoService/getTxRecordByTxID";
    pub const CREATE_FILE: &str = "/proto.FileService/createFile";
    pub const APPEND_CONTENT: &str = "/proto.FileService/appendContent";
    pub const CREATE_TOPIC: &str = "/proto.ConsensusService/createTopic";
    pub const DELETE_TOPIC: &str = "/proto.ConsensusService/deleteTopic";
    pub const SUBMIT_MESSAGE: &str = "/proto.ConsensusService/submitMessage";
    pub const ASSOCIATE_TOKENS: &str = "/proto.TokenService/associateTokens";
    pub const DISSOCIATE_TOKENS: &str = "/proto.TokenService/dissociateTokens";
    pub const DELETE_SCHEDULE: &str = "/proto.ScheduleService/deleteSchedule";
    pub const PRNG: &str = "/proto.UtilService/prng";
}
