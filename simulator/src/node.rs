//! # Simulated Network
//!
//! A set of nodes sharing one [`Ledger`], reachable through the SDK's
//! [`Transport`] trait. Requests are decoded from the same protobuf bytes a
//! real node would receive, prechecked the way a real node prechecks them,
//! and then either applied to the ledger or answered from it.
//!
//! ## Architecture
//!
//! ```text
//! send(node, request)
//!   ├─ fault queued for node?      -> injected answer / transport error / stall
//!   ├─ transaction method          -> precheck -> Ledger::apply -> OK
//!   └─ query method                -> header check -> (payment) -> answer
//! ```
//!
//! Consensus is instantaneous, but receipts can be made to lag: with
//! `receipt_lag = n`, the first `n` receipt or record polls for a fresh
//! transaction answer "not yet".

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use prost::Message;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use strata_sdk::crypto::sha384;
use strata_sdk::proto::{
    self, methods, query::query, response, transaction_body::Data, RESPONSE_TYPE_COST_ANSWER,
};
use strata_sdk::{
    AccountId, Client, Endpoint, Hbar, PublicKey, Status, TransactionId, Transport,
    TransportError, TransportRequest,
};

use crate::faults::{Fault, Faults};
use crate::ledger::{Ledger, Submission};

/// Account number of the first node. Nodes are numbered consecutively.
pub const FIRST_NODE_NUM: u64 = 3;

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub node_count: u64,
    /// Flat fee every transaction pays, and the least a body may offer.
    pub transaction_fee: Hbar,
    /// What a record query costs. Receipts and balances are free.
    pub record_query_cost: Hbar,
    /// Receipt and record polls answered "not yet" after each submission.
    pub receipt_lag: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            node_count: 3,
            transaction_fee: Hbar::from_tinybars(100_000),
            record_query_cost: Hbar::from_tinybars(50_000),
            receipt_lag: 0,
        }
    }
}

/// Why a request was turned away before consensus.
type Precheck<T> = std::result::Result<T, Status>;

pub struct SimulatedNetwork {
    config: SimConfig,
    ledger: Arc<Ledger>,
    faults: Faults,
    nodes: Vec<AccountId>,
    /// Polls left before a transaction's receipt becomes visible.
    lagging: DashMap<TransactionId, u32>,
    /// Requests received, per node, faults included.
    requests: DashMap<AccountId, u64>,
    submissions: AtomicU64,
}

impl SimulatedNetwork {
    pub fn new(config: SimConfig) -> Arc<Self> {
        let ledger = Arc::new(Ledger::new(config.transaction_fee));
        let nodes: Vec<AccountId> = (0..config.node_count)
            .map(|i| AccountId::new(0, 0, FIRST_NODE_NUM + i))
            .collect();
        for node in &nodes {
            // Nodes collect fees, so they need accounts.
            let _ = ledger.create_genesis_account(*node, None, Hbar::ZERO);
        }
        Arc::new(Self {
            config,
            ledger,
            faults: Faults::default(),
            nodes,
            lagging: DashMap::new(),
            requests: DashMap::new(),
            submissions: AtomicU64::new(0),
        })
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    pub fn node_ids(&self) -> &[AccountId] {
        &self.nodes
    }

    /// `(address, account id)` pairs in the shape `Client::for_network`
    /// takes.
    pub fn address_book(&self) -> Vec<(String, AccountId)> {
        self.nodes
            .iter()
            .map(|id| (format!("sim://{id}"), *id))
            .collect()
    }

    /// A client for this network, without an operator.
    pub fn client(self: &Arc<Self>) -> strata_sdk::Result<Client> {
        Client::for_network(self.address_book(), Arc::clone(self) as Arc<dyn Transport>)
    }

    pub fn requests_to(&self, node: &AccountId) -> u64 {
        self.requests.get(node).map_or(0, |n| *n)
    }

    /// Transactions that passed precheck and were applied.
    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::Relaxed)
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    fn submit(&self, node: AccountId, method: &str, payload: &[u8]) -> Bytes {
        let status = match self.precheck_transaction(node, payload) {
            Ok(submission) if method_of(submission.body.data.as_ref()) != Some(method) => {
                Status::NotSupported
            }
            Ok(submission) => {
                let transaction_id = submission.transaction_id;
                if self.config.receipt_lag > 0 {
                    self.lagging.insert(transaction_id, self.config.receipt_lag);
                }
                self.ledger.apply(submission);
                self.submissions.fetch_add(1, Ordering::Relaxed);
                Status::Ok
            }
            Err(status) => status,
        };
        if status != Status::Ok {
            debug!(node = %node, %status, "transaction failed precheck");
        }
        encode_transaction_response(status)
    }

    /// Everything a node checks before handing a transaction to consensus.
    fn precheck_transaction(&self, node: AccountId, payload: &[u8]) -> Precheck<Submission> {
        let outer = proto::Transaction::decode(payload).map_err(|_| Status::InvalidTransaction)?;
        let signed = proto::SignedTransaction::decode(outer.signed_transaction_bytes.as_slice())
            .map_err(|_| Status::InvalidTransaction)?;
        let body = proto::TransactionBody::decode(signed.body_bytes.as_slice())
            .map_err(|_| Status::InvalidTransactionBody)?;

        let addressed_to = body
            .node_account_id
            .as_ref()
            .and_then(|id| AccountId::from_account_proto(id).ok());
        if addressed_to != Some(node) {
            return Err(Status::InvalidNodeAccount);
        }

        let transaction_id = body
            .transaction_id
            .as_ref()
            .and_then(|id| TransactionId::from_proto(id).ok())
            .ok_or(Status::InvalidTransactionId)?;
        let valid_for = body
            .transaction_valid_duration
            .as_ref()
            .map_or(0, |d| d.seconds);
        if transaction_id.valid_start + ChronoDuration::seconds(valid_for) < Utc::now() {
            return Err(Status::TransactionExpired);
        }
        if self.ledger.has_outcome(&transaction_id) {
            return Err(Status::DuplicateTransaction);
        }

        let signers = verify_signatures(&signed)?;
        let payer = transaction_id.account_id;
        let Some(payer_key) = self.ledger.account(&payer).and_then(|a| a.key) else {
            return Err(Status::PayerAccountNotFound);
        };
        if !signers.contains(&payer_key) {
            return Err(Status::InvalidSignature);
        }
        if body.transaction_fee < self.config.transaction_fee.to_tinybars() as u64 {
            return Err(Status::InsufficientTxFee);
        }
        if body.data.is_none() {
            return Err(Status::EmptyTransactionBody);
        }

        Ok(Submission {
            transaction_id,
            node,
            body,
            signers,
            transaction_hash: sha384(&outer.signed_transaction_bytes).to_vec(),
        })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    fn answer(&self, node: AccountId, method: &'static str, payload: &[u8]) -> Bytes {
        let query = proto::Query::decode(payload)
            .ok()
            .and_then(|q| q.query);
        let Some(query) = query else {
            return encode_query_response(method, header(Status::InvalidQueryHeader, 0));
        };

        match query {
            query::Query::TransactionGetReceipt(q) => {
                let Some(transaction_id) = parse_transaction_id(q.transaction_id.as_ref()) else {
                    return encode_query_response(method, header(Status::InvalidTransactionId, 0));
                };
                let receipt = match self.visible_outcome(&transaction_id) {
                    Visibility::Missing => {
                        return encode_query_response(method, header(Status::ReceiptNotFound, 0))
                    }
                    Visibility::Lagging => proto::TransactionReceipt {
                        status: Status::Unknown.code(),
                        ..Default::default()
                    },
                    Visibility::Ready(outcome) => outcome.receipt,
                };
                encode_response(response::Response::TransactionGetReceipt(
                    proto::TransactionGetReceiptResponse {
                        header: header(Status::Ok, 0),
                        receipt: Some(receipt),
                        ..Default::default()
                    },
                ))
            }

            query::Query::TransactionGetRecord(q) => {
                let cost = self.config.record_query_cost.to_tinybars() as u64;
                let response_type = q.header.as_ref().map_or(0, |h| h.response_type);
                if response_type == RESPONSE_TYPE_COST_ANSWER {
                    return encode_query_response(method, header(Status::Ok, cost));
                }
                if let Err(status) = self.take_payment(node, q.header.as_ref(), cost) {
                    return encode_query_response(method, header(status, cost));
                }
                let Some(transaction_id) = parse_transaction_id(q.transaction_id.as_ref()) else {
                    return encode_query_response(method, header(Status::InvalidTransactionId, 0));
                };
                let record = match self.visible_outcome(&transaction_id) {
                    Visibility::Missing => {
                        return encode_query_response(method, header(Status::RecordNotFound, 0))
                    }
                    Visibility::Lagging => proto::TransactionRecord {
                        receipt: Some(proto::TransactionReceipt {
                            status: Status::Unknown.code(),
                            ..Default::default()
                        }),
                        ..Default::default()
                    },
                    Visibility::Ready(outcome) => outcome.record,
                };
                encode_response(response::Response::TransactionGetRecord(
                    proto::TransactionGetRecordResponse {
                        header: header(Status::Ok, 0),
                        transaction_record: Some(record),
                    },
                ))
            }

            query::Query::CryptogetAccountBalance(q) => {
                let account = q
                    .account_id
                    .as_ref()
                    .and_then(|id| AccountId::from_account_proto(id).ok());
                let Some((account, balance)) =
                    account.and_then(|id| self.ledger.balance(&id).map(|b| (id, b)))
                else {
                    return encode_query_response(method, header(Status::InvalidAccountId, 0));
                };
                encode_response(response::Response::CryptogetAccountBalance(
                    proto::CryptoGetAccountBalanceResponse {
                        header: header(Status::Ok, 0),
                        account_id: account.to_account_proto().ok(),
                        balance: balance.to_tinybars().max(0) as u64,
                    },
                ))
            }
        }
    }

    /// Check and settle the payment attached to a paid query. The payment
    /// is an ordinary transfer to `node` and goes through consensus like
    /// one.
    fn take_payment(
        &self,
        node: AccountId,
        header: Option<&proto::QueryHeader>,
        cost: u64,
    ) -> Precheck<()> {
        let payment = header
            .and_then(|h| h.payment.as_ref())
            .ok_or(Status::InsufficientTxFee)?;
        let submission = match self.precheck_transaction(node, &payment.encode_to_vec()) {
            Ok(submission) => submission,
            // Polls resend the payment they were built with.
            Err(Status::DuplicateTransaction) => return Ok(()),
            Err(status) => return Err(status),
        };

        let Some(Data::CryptoTransfer(transfer)) = submission.body.data.as_ref() else {
            return Err(Status::InvalidTransactionBody);
        };
        let paid: i64 = transfer
            .transfers
            .iter()
            .flat_map(|list| &list.account_amounts)
            .filter(|leg| {
                leg.account_id
                    .as_ref()
                    .and_then(|id| AccountId::from_account_proto(id).ok())
                    == Some(node)
            })
            .map(|leg| leg.amount)
            .sum();
        if paid < cost as i64 {
            return Err(Status::InsufficientTxFee);
        }

        let outcome = self.ledger.apply(submission);
        match outcome.status() {
            Status::Success => Ok(()),
            failed => {
                warn!(node = %node, status = %failed, "query payment failed");
                Err(failed)
            }
        }
    }

    fn visible_outcome(&self, id: &TransactionId) -> Visibility {
        let Some(outcome) = self.ledger.outcome(id) else {
            return Visibility::Missing;
        };
        if let Some(mut polls) = self.lagging.get_mut(id) {
            if *polls > 0 {
                *polls -= 1;
                return Visibility::Lagging;
            }
        }
        Visibility::Ready(outcome)
    }
}

enum Visibility {
    Missing,
    Lagging,
    Ready(crate::ledger::Outcome),
}

#[async_trait]
impl Transport for SimulatedNetwork {
    async fn send(
        &self,
        endpoint: &Endpoint,
        request: TransportRequest,
        _deadline: Instant,
    ) -> Result<Bytes, TransportError> {
        let node = endpoint.account_id;
        *self.requests.entry(node).or_insert(0) += 1;
        if !self.nodes.contains(&node) {
            return Err(TransportError::Unavailable(format!("no such node {node}")));
        }

        match self.faults.next(&node) {
            Some(Fault::Transport(err)) => {
                trace!(node = %node, error = %err, "injected transport failure");
                return Err(err);
            }
            Some(Fault::Precheck(status)) => {
                trace!(node = %node, %status, "injected precheck status");
                return Ok(if is_query_method(request.method) {
                    encode_query_response(request.method, header(status, 0))
                } else {
                    encode_transaction_response(status)
                });
            }
            Some(Fault::Delay(delay)) => tokio::time::sleep(delay).await,
            None => {}
        }

        if is_query_method(request.method) {
            Ok(self.answer(node, request.method, &request.payload))
        } else if is_transaction_method(request.method) {
            Ok(self.submit(node, request.method, &request.payload))
        } else {
            Err(TransportError::Fatal(format!(
                "method {} is not implemented",
                request.method
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Wire helpers
// ---------------------------------------------------------------------------

fn is_query_method(method: &str) -> bool {
    matches!(
        method,
        methods::GET_RECEIPT | methods::GET_RECORD | methods::GET_BALANCE
    )
}

fn is_transaction_method(method: &str) -> bool {
    matches!(
        method,
        methods::CREATE_ACCOUNT
            | methods::CRYPTO_DELETE
            | methods::CRYPTO_TRANSFER
            | methods::APPROVE_ALLOWANCES
            | methods::DELETE_ALLOWANCES
            | methods::CREATE_FILE
            | methods::APPEND_CONTENT
            | methods::CREATE_TOPIC
            | methods::DELETE_TOPIC
            | methods::SUBMIT_MESSAGE
            | methods::ASSOCIATE_TOKENS
            | methods::DISSOCIATE_TOKENS
            | methods::DELETE_SCHEDULE
            | methods::PRNG
    )
}

/// The service method a body must arrive through.
fn method_of(data: Option<&Data>) -> Option<&'static str> {
    Some(match data? {
        Data::CryptoCreateAccount(_) => methods::CREATE_ACCOUNT,
        Data::CryptoDelete(_) => methods::CRYPTO_DELETE,
        Data::CryptoTransfer(_) => methods::CRYPTO_TRANSFER,
        Data::CryptoApproveAllowance(_) => methods::APPROVE_ALLOWANCES,
        Data::CryptoDeleteAllowance(_) => methods::DELETE_ALLOWANCES,
        Data::FileCreate(_) => methods::CREATE_FILE,
        Data::FileAppend(_) => methods::APPEND_CONTENT,
        Data::ConsensusCreateTopic(_) => methods::CREATE_TOPIC,
        Data::ConsensusDeleteTopic(_) => methods::DELETE_TOPIC,
        Data::ConsensusSubmitMessage(_) => methods::SUBMIT_MESSAGE,
        Data::TokenAssociate(_) => methods::ASSOCIATE_TOKENS,
        Data::TokenDissociate(_) => methods::DISSOCIATE_TOKENS,
        Data::ScheduleDelete(_) => methods::DELETE_SCHEDULE,
        Data::UtilPrng(_) => methods::PRNG,
    })
}

/// Every signature must verify; the keys that produced them are returned.
fn verify_signatures(signed: &proto::SignedTransaction) -> Precheck<HashSet<PublicKey>> {
    let mut signers = HashSet::new();
    for pair in signed.sig_map.iter().flat_map(|m| &m.sig_pair) {
        let key = PublicKey::from_bytes(&pair.pub_key_prefix)
            .map_err(|_| Status::InvalidSignature)?;
        let Some(proto::signature_pair::Signature::Ed25519(signature)) = &pair.signature else {
            return Err(Status::InvalidSignature);
        };
        if !key.verify(&signed.body_bytes, signature) {
            return Err(Status::InvalidSignature);
        }
        signers.insert(key);
    }
    Ok(signers)
}

fn parse_transaction_id(id: Option<&proto::TransactionId>) -> Option<TransactionId> {
    id.and_then(|id| TransactionId::from_proto(id).ok())
}

fn header(status: Status, cost: u64) -> Option<proto::ResponseHeader> {
    Some(proto::ResponseHeader {
        node_transaction_precheck_code: status.code(),
        response_type: 0,
        cost,
    })
}

fn encode_transaction_response(status: Status) -> Bytes {
    Bytes::from(
        proto::TransactionResponse {
            node_transaction_precheck_code: status.code(),
            cost: 0,
        }
        .encode_to_vec(),
    )
}

fn encode_response(response: response::Response) -> Bytes {
    Bytes::from(
        proto::Response {
            response: Some(response),
        }
        .encode_to_vec(),
    )
}

/// A header-only answer in the response slot matching `method`.
fn encode_query_response(method: &str, header: Option<proto::ResponseHeader>) -> Bytes {
    let response = match method {
        methods::GET_RECORD => {
            response::Response::TransactionGetRecord(proto::TransactionGetRecordResponse {
                header,
                transaction_record: None,
            })
        }
        methods::GET_BALANCE => response::Response::CryptogetAccountBalance(
            proto::CryptoGetAccountBalanceResponse {
                header,
                ..Default::default()
            },
        ),
        _ => response::Response::TransactionGetReceipt(proto::TransactionGetReceiptResponse {
            header,
            ..Default::default()
        }),
    };
    encode_response(response)
}
