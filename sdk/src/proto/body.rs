//! `TransactionBody` and the per-kind payloads it can carry.

use super::basic::{
    AccountId, Duration, EntityNum, FileId, Key, KeyList, ScheduleId, Timestamp, TokenId,
    TopicId, TransactionId,
};

#[derive(Clone, PartialEq, prost::Message)]
pub struct TransactionBody {
    #[prost(message, optional, tag = "1")]
    pub transaction_id: Option<TransactionId>,
    #[prost(message, optional, tag = "2")]
    pub node_account_id: Option<AccountId>,
    #[prost(uint64, tag = "3")]
    pub transaction_fee: u64,
    #[prost(message, optional, tag = "4")]
    pub transaction_valid_duration: Option<Duration>,
    #[prost(string, tag = "6")]
    pub memo: String,
    #[prost(
        oneof = "transaction_body::Data",
        tags = "11, 12, 14, 16, 17, 24, 26, 27, 40, 41, 43, 48, 49, 52"
    )]
    pub data: Option<transaction_body::Data>,
}

pub mod transaction_body {
    use super::*;

    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Data {
        #[prost(message, tag = "11")]
        CryptoCreateAccount(CryptoCreateTransactionBody),
        #[prost(message, tag = "12")]
        CryptoDelete(CryptoDeleteTransactionBody),
        #[prost(message, tag = "14")]
        CryptoTransfer(CryptoTransferTransactionBody),
        #[prost(message, tag = "16")]
        FileAppend(FileAppendTransactionBody),
        #[prost(message, tag = "17")]
        FileCreate(FileCreateTransactionBody),
        #[prost(message, tag = "24")]
        ConsensusCreateTopic(ConsensusCreateTopicTransactionBody),
        #[prost(message, tag = "26")]
        ConsensusDeleteTopic(ConsensusDeleteTopicTransactionBody),
        #[prost(message, tag = "27")]
        ConsensusSubmitMessage(ConsensusSubmitMessageTransactionBody),
        #[prost(message, tag = "40")]
        TokenAssociate(TokenAssociateTransactionBody),
        #[prost(message, tag = "41")]
        TokenDissociate(TokenDissociateTransactionBody),
        #[prost(message, tag = "43")]
        ScheduleDelete(ScheduleDeleteTransactionBody),
        #[prost(message, tag = "48")]
        CryptoApproveAllowance(CryptoApproveAllowanceTransactionBody),
        #[prost(message, tag = "49")]
        CryptoDeleteAllowance(CryptoDeleteAllowanceTransactionBody),
        #[prost(message, tag = "52")]
        UtilPrng(UtilPrngTransactionBody),
    }
}

// ---------------------------------------------------------------------------
// Crypto service
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct AccountAmount {
    #[prost(message, optional, tag = "1")]
    pub account_id: Option<AccountId>,
    #[prost(sint64, tag = "2")]
    pub amount: i64,
    /// Debit is paid out of an allowance granted to the payer.
    #[prost(bool, tag = "3")]
    pub is_approval: bool,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TransferList {
    #[prost(message, repeated, tag = "1")]
    pub account_amounts: Vec<AccountAmount>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct CryptoTransferTransactionBody {
    #[prost(message, optional, tag = "1")]
    pub transfers: Option<TransferList>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct CryptoCreateTransactionBody {
    #[prost(message, optional, tag = "1")]
    pub key: Option<Key>,
    #[prost(uint64, tag = "2")]
    pub initial_balance: u64,
    #[prost(bool, tag = "8")]
    pub receiver_sig_required: bool,
    #[prost(message, optional, tag = "9")]
    pub auto_renew_period: Option<Duration>,
    #[prost(string, tag = "13")]
    pub memo: String,
    #[prost(int32, tag = "14")]
    pub max_automatic_token_associations: i32,
    #[prost(bool, tag = "17")]
    pub decline_reward: bool,
    #[prost(bytes = "vec", tag = "18")]
    pub alias: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct CryptoDeleteTransactionBody {
    #[prost(message, optional, tag = "1")]
    pub transfer_account_id: Option<AccountId>,
    #[prost(message, optional, tag = "2")]
    pub delete_account_id: Option<AccountId>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct CryptoAllowance {
    #[prost(message, optional, tag = "1")]
    pub owner: Option<AccountId>,
    #[prost(message, optional, tag = "2")]
    pub spender: Option<AccountId>,
    #[prost(int64, tag = "3")]
    pub amount: i64,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TokenAllowance {
    #[prost(message, optional, tag = "1")]
    pub token_id: Option<TokenId>,
    #[prost(message, optional, tag = "2")]
    pub owner: Option<AccountId>,
    #[prost(message, optional, tag = "3")]
    pub spender: Option<AccountId>,
    #[prost(int64, tag = "4")]
    pub amount: i64,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct CryptoApproveAllowanceTransactionBody {
    #[prost(message, repeated, tag = "1")]
    pub crypto_allowances: Vec<CryptoAllowance>,
    #[prost(message, repeated, tag = "3")]
    pub token_allowances: Vec<TokenAllowance>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct NftRemoveAllowance {
    #[prost(message, optional, tag = "1")]
    pub token_id: Option<TokenId>,
    #[prost(message, optional, tag = "2")]
    pub owner: Option<AccountId>,
    #[prost(int64, repeated, tag = "3")]
    pub serial_numbers: Vec<i64>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct CryptoDeleteAllowanceTransactionBody {
    #[prost(message, repeated, tag = "2")]
    pub nft_allowances: Vec<NftRemoveAllowance>,
}

// ---------------------------------------------------------------------------
// File service
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct FileCreateTransactionBody {
    #[prost(message, optional, tag = "2")]
    pub expiration_time: Option<Timestamp>,
    #[prost(message, optional, tag = "3")]
    pub keys: Option<KeyList>,
    #[prost(bytes = "vec", tag = "4")]
    pub contents: Vec<u8>,
    #[prost(string, tag = "8")]
    pub memo: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct FileAppendTransactionBody {
    #[prost(message, optional, tag = "2")]
    pub file_id: Option<FileId>,
    #[prost(bytes = "vec", tag = "4")]
    pub contents: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Consensus service
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ConsensusCreateTopicTransactionBody {
    #[prost(string, tag = "1")]
    pub memo: String,
    #[prost(message, optional, tag = "2")]
    pub admin_key: Option<Key>,
    #[prost(message, optional, tag = "3")]
    pub submit_key: Option<Key>,
    #[prost(message, optional, tag = "6")]
    pub auto_renew_period: Option<Duration>,
    #[prost(message, optional, tag = "7")]
    pub auto_renew_account: Option<AccountId>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ConsensusDeleteTopicTransactionBody {
    #[prost(message, optional, tag = "1")]
    pub topic_id: Option<TopicId>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ConsensusMessageChunkInfo {
    #[prost(message, optional, tag = "1")]
    pub initial_transaction_id: Option<TransactionId>,
    #[prost(int32, tag = "2")]
    pub total: i32,
    /// One-based.
    #[prost(int32, tag = "3")]
    pub number: i32,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ConsensusSubmitMessageTransactionBody {
    #[prost(message, optional, tag = "1")]
    pub topic_id: Option<TopicId>,
    #[prost(bytes = "vec", tag = "2")]
    pub message: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub chunk_info: Option<ConsensusMessageChunkInfo>,
}

// ---------------------------------------------------------------------------
// Token, schedule and util services
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TokenAssociateTransactionBody {
    #[prost(message, optional, tag = "1")]
    pub account: Option<AccountId>,
    #[prost(message, repeated, tag = "2")]
    pub tokens: Vec<EntityNum>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TokenDissociateTransactionBody {
    #[prost(message, optional, tag = "1")]
    pub account: Option<AccountId>,
    #[prost(message, repeated, tag = "2")]
    pub tokens: Vec<EntityNum>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ScheduleDeleteTransactionBody {
    #[prost(message, optional, tag = "1")]
    pub schedule_id: Option<ScheduleId>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct UtilPrngTransactionBody {
    /// Zero asks for 384 random bits instead of a bounded number.
    #[prost(int32, tag = "1")]
    pub range: i32,
}
