// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Strata SDK
//!
//! A client for a Strata ledger network: build transactions, freeze and
//! sign them, push them at whichever node will take them, and find out what
//! consensus made of them.
//!
//! The network speaks gRPC and protobuf. This crate owns the protobuf half
//! (the three-layer transaction envelope, queries, receipts) and leaves the
//! wire to a [`Transport`] you plug in, which is also what lets the whole
//! thing run against an in-process simulator in tests.
//!
//! ## Architecture
//!
//! - **id**: Entity and transaction identifiers. Pure values.
//! - **crypto**: Ed25519 keys and signers, SHA-384 transaction hashes.
//! - **proto**: The wire schema, as hand-derived prost messages.
//! - **transaction**: `Transaction<D>`: build, freeze, sign, encode,
//!   decode, chunk. One data type per transaction kind.
//! - **query**: Receipts, records, balances, and query payments.
//! - **network**: The node address book, per-node cooldowns, transport.
//! - **execute**: The retry engine every request runs through.
//! - **status**: Network status codes and how the client reacts to them.
//! - **client**: Ties network, transport, operator and settings together.
//! - **config**: Defaults, per-client and per-request execution settings.
//!
//! ## Design Philosophy
//!
//! 1. A frozen transaction is immutable bytes. Nothing re-encodes a body
//!    after it has been signed.
//! 2. Retry policy is data (a status table), not control flow scattered
//!    over call sites.
//! 3. No global state. Everything hangs off a [`Client`].

pub mod backoff;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
mod execute;
pub mod hbar;
pub mod id;
pub mod network;
pub mod proto;
pub mod query;
pub mod receipt;
pub mod response;
pub mod status;
pub mod transaction;

pub use client::{Client, Operator};
pub use config::{ClientConfig, ExecutionConfig};
pub use crypto::{PrivateKey, PublicKey, Signer};
pub use error::{Error, LastOutcome, Result};
pub use hbar::Hbar;
pub use id::{AccountId, EntityId, FileId, ScheduleId, TokenId, TopicId, TransactionId};
pub use network::{Endpoint, Network, Transport, TransportError, TransportRequest};
pub use query::{
    AccountBalance, AccountBalanceQuery, Query, QueryData, TransactionReceiptQuery,
    TransactionRecordQuery,
};
pub use receipt::{PrngOutput, TransactionReceipt, TransactionRecord};
pub use response::TransactionResponse;
pub use status::{Status, StatusBucket, StatusTable};
pub use transaction::{
    AccountAllowanceApproveTransaction, AccountAllowanceDeleteTransaction,
    AccountCreateTransaction, AccountDeleteTransaction, ChunkConfig, DecodeError,
    FileAppendTransaction, FileCreateTransaction, PrngTransaction, ScheduleDeleteTransaction,
    TokenAssociateTransaction, TokenDissociateTransaction, TopicCreateTransaction,
    TopicDeleteTransaction, TopicMessageSubmitTransaction, Transaction, TransactionData,
    TransferTransaction, WrappedTransaction,
};
