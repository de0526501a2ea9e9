//! Queries, their responses, receipts and records.

use super::basic::{AccountId, FileId, ScheduleId, Timestamp, TokenId, TopicId, Transaction, TransactionId};
use super::body::TransferList;

/// `ResponseType::ANSWER_ONLY`.
pub const RESPONSE_TYPE_ANSWER_ONLY: i32 = 0;
/// `ResponseType::COST_ANSWER`.
pub const RESPONSE_TYPE_COST_ANSWER: i32 = 2;

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct QueryHeader {
    #[prost(message, optional, tag = "1")]
    pub payment: Option<Transaction>,
    #[prost(int32, tag = "2")]
    pub response_type: i32,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ResponseHeader {
    #[prost(int32, tag = "1")]
    pub node_transaction_precheck_code: i32,
    #[prost(int32, tag = "2")]
    pub response_type: i32,
    #[prost(uint64, tag = "3")]
    pub cost: u64,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Query {
    #[prost(oneof = "query::Query", tags = "7, 14, 15")]
    pub query: Option<query::Query>,
}

pub mod query {
    use super::*;

    #[derive(Clone, PartialEq, Eq, prost::Oneof)]
    pub enum Query {
        #[prost(message, tag = "7")]
        CryptogetAccountBalance(CryptoGetAccountBalanceQuery),
        #[prost(message, tag = "14")]
        TransactionGetReceipt(TransactionGetReceiptQuery),
        #[prost(message, tag = "15")]
        TransactionGetRecord(TransactionGetRecordQuery),
    }
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Response {
    #[prost(oneof = "response::Response", tags = "7, 14, 15")]
    pub response: Option<response::Response>,
}

pub mod response {
    use super::*;

    #[derive(Clone, PartialEq, Eq, prost::Oneof)]
    pub enum Response {
        #[prost(message, tag = "7")]
        CryptogetAccountBalance(CryptoGetAccountBalanceResponse),
        #[prost(message, tag = "14")]
        TransactionGetReceipt(TransactionGetReceiptResponse),
        #[prost(message, tag = "15")]
        TransactionGetRecord(TransactionGetRecordResponse),
    }
}

impl Response {
    pub fn header(&self) -> Option<&ResponseHeader> {
        match self.response.as_ref()? {
            response::Response::CryptogetAccountBalance(r) => r.header.as_ref(),
            response::Response::TransactionGetReceipt(r) => r.header.as_ref(),
            response::Response::TransactionGetRecord(r) => r.header.as_ref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Balance
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct CryptoGetAccountBalanceQuery {
    #[prost(message, optional, tag = "1")]
    pub header: Option<QueryHeader>,
    #[prost(message, optional, tag = "2")]
    pub account_id: Option<AccountId>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct CryptoGetAccountBalanceResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
    #[prost(message, optional, tag = "2")]
    pub account_id: Option<AccountId>,
    #[prost(uint64, tag = "3")]
    pub balance: u64,
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TransactionReceipt {
    #[prost(int32, tag = "1")]
    pub status: i32,
    #[prost(message, optional, tag = "2")]
    pub account_id: Option<AccountId>,
    #[prost(message, optional, tag = "3")]
    pub file_id: Option<FileId>,
    #[prost(message, optional, tag = "6")]
    pub topic_id: Option<TopicId>,
    #[prost(uint64, tag = "7")]
    pub topic_sequence_number: u64,
    #[prost(bytes = "vec", tag = "8")]
    pub topic_running_hash: Vec<u8>,
    #[prost(message, optional, tag = "10")]
    pub token_id: Option<TokenId>,
    #[prost(message, optional, tag = "12")]
    pub schedule_id: Option<ScheduleId>,
    #[prost(message, optional, tag = "13")]
    pub scheduled_transaction_id: Option<TransactionId>,
    #[prost(int64, repeated, tag = "14")]
    pub serial_numbers: Vec<i64>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TransactionGetReceiptQuery {
    #[prost(message, optional, tag = "1")]
    pub header: Option<QueryHeader>,
    #[prost(message, optional, tag = "2")]
    pub transaction_id: Option<TransactionId>,
    #[prost(bool, tag = "3")]
    pub include_duplicates: bool,
    #[prost(bool, tag = "4")]
    pub include_child_receipts: bool,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TransactionGetReceiptResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
    #[prost(message, optional, tag = "2")]
    pub receipt: Option<TransactionReceipt>,
    #[prost(message, repeated, tag = "4")]
    pub duplicate_transaction_receipts: Vec<TransactionReceipt>,
    #[prost(message, repeated, tag = "5")]
    pub child_transaction_receipts: Vec<TransactionReceipt>,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TransactionRecord {
    #[prost(message, optional, tag = "1")]
    pub receipt: Option<TransactionReceipt>,
    #[prost(bytes = "vec", tag = "2")]
    pub transaction_hash: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub consensus_timestamp: Option<Timestamp>,
    #[prost(message, optional, tag = "4")]
    pub transaction_id: Option<TransactionId>,
    #[prost(string, tag = "5")]
    pub memo: String,
    #[prost(uint64, tag = "6")]
    pub transaction_fee: u64,
    #[prost(message, optional, tag = "10")]
    pub transfer_list: Option<TransferList>,
    #[prost(oneof = "transaction_record::Entropy", tags = "19, 20")]
    pub entropy: Option<transaction_record::Entropy>,
}

pub mod transaction_record {
    #[derive(Clone, PartialEq, Eq, prost::Oneof)]
    pub enum Entropy {
        #[prost(bytes = "vec", tag = "19")]
        PrngBytes(Vec<u8>),
        #[prost(int32, tag = "20")]
        PrngNumber(i32),
    }
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TransactionGetRecordQuery {
    #[prost(message, optional, tag = "1")]
    pub header: Option<QueryHeader>,
    #[prost(message, optional, tag = "2")]
    pub transaction_id: Option<TransactionId>,
    #[prost(bool, tag = "3")]
    pub include_duplicates: bool,
    #[prost(bool, tag = "4")]
    pub include_child_records: bool,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TransactionGetRecordResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
    #[prost(message, optional, tag = "3")]
    pub transaction_record: Option<TransactionRecord>,
}
