//! Shared wire types: identifiers, keys, time, and the signature envelope.

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Timestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Duration {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
}

/// Account identifier: shard and realm plus either a number or an alias.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct AccountId {
    #[prost(int64, tag = "1")]
    pub shard_num: i64,
    #[prost(int64, tag = "2")]
    pub realm_num: i64,
    #[prost(oneof = "account_id::Account", tags = "3, 4")]
    pub account: Option<account_id::Account>,
}

pub mod account_id {
    #[derive(Clone, PartialEq, Eq, prost::Oneof)]
    pub enum Account {
        #[prost(int64, tag = "3")]
        AccountNum(i64),
        /// Either a serialized `Key` or a 20-byte EVM address.
        #[prost(bytes = "vec", tag = "4")]
        Alias(Vec<u8>),
    }
}

/// The shard/realm/num triple shared by token, topic, file and schedule ids.
/// The field names differ per entity in the schema; the wire layout does not.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct EntityNum {
    #[prost(int64, tag = "1")]
    pub shard_num: i64,
    #[prost(int64, tag = "2")]
    pub realm_num: i64,
    #[prost(int64, tag = "3")]
    pub num: i64,
}

pub type TokenId = EntityNum;
pub type TopicId = EntityNum;
pub type FileId = EntityNum;
pub type ScheduleId = EntityNum;

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TransactionId {
    #[prost(message, optional, tag = "1")]
    pub transaction_valid_start: Option<Timestamp>,
    #[prost(message, optional, tag = "2")]
    pub account_id: Option<AccountId>,
    #[prost(bool, tag = "3")]
    pub scheduled: bool,
    #[prost(int32, tag = "4")]
    pub nonce: i32,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Key {
    #[prost(oneof = "key::Key", tags = "2, 6")]
    pub key: Option<key::Key>,
}

pub mod key {
    #[derive(Clone, PartialEq, Eq, prost::Oneof)]
    pub enum Key {
        #[prost(bytes = "vec", tag = "2")]
        Ed25519(Vec<u8>),
        #[prost(message, tag = "6")]
        KeyList(super::KeyList),
    }
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct KeyList {
    #[prost(message, repeated, tag = "1")]
    pub keys: Vec<Key>,
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct SignaturePair {
    /// Prefix of the signer's public key. We always send the full key.
    #[prost(bytes = "vec", tag = "1")]
    pub pub_key_prefix: Vec<u8>,
    #[prost(oneof = "signature_pair::Signature", tags = "3")]
    pub signature: Option<signature_pair::Signature>,
}

pub mod signature_pair {
    #[derive(Clone, PartialEq, Eq, prost::Oneof)]
    pub enum Signature {
        #[prost(bytes = "vec", tag = "3")]
        Ed25519(Vec<u8>),
    }
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct SignatureMap {
    #[prost(message, repeated, tag = "1")]
    pub sig_pair: Vec<SignaturePair>,
}

/// Middle layer: body bytes plus the signatures over exactly those bytes.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct SignedTransaction {
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub sig_map: Option<SignatureMap>,
}

/// Outer layer: what a node actually receives.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Transaction {
    #[prost(bytes = "vec", tag = "5")]
    pub signed_transaction_bytes: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TransactionList {
    #[prost(message, repeated, tag = "1")]
    pub transaction_list: Vec<Transaction>,
}

/// Synchronous answer to a transaction submission.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TransactionResponse {
    #[prost(int32, tag = "1")]
    pub node_transaction_precheck_code: i32,
    #[prost(uint64, tag = "2")]
    pub cost: u64,
}
