//! A transport that answers from a script instead of a network.
//!
//! Each call pops the next [`Reply`]. An empty script means the happy path:
//! `OK` at precheck and a `SUCCESS` receipt. Every request is recorded with
//! the node it went to and the (paused) time it was sent, so tests can
//! check ordering and backoff without real sleeps.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use prost::Message;
use tokio::time::Instant;

use strata_sdk::proto::{self, methods, response};
use strata_sdk::{
    AccountId, Client, Endpoint, PrivateKey, Status, Transport, TransportError,
    TransportRequest,
};

pub const OPERATOR: AccountId = AccountId::new(0, 0, 1001);

#[derive(Debug, Clone)]
pub enum Reply {
    /// Precheck answer, for transactions and queries alike.
    Precheck(Status),
    /// A receipt query that passes precheck and carries this status.
    Receipt(Status),
    Transport(TransportError),
}

#[derive(Debug, Clone)]
pub struct Sent {
    pub node: AccountId,
    pub method: &'static str,
    pub payload: Bytes,
    pub at: Instant,
}

#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    sent: Mutex<Vec<Sent>>,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, reply: Reply) {
        self.script.lock().push_back(reply);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    /// Only the requests sent through `method`.
    pub fn sent_to(&self, method: &str) -> Vec<Sent> {
        self.sent
            .lock()
            .iter()
            .filter(|s| s.method == method)
            .cloned()
            .collect()
    }
}

fn header(status: Status) -> Option<proto::ResponseHeader> {
    Some(proto::ResponseHeader {
        node_transaction_precheck_code: status.code(),
        response_type: 0,
        cost: 0,
    })
}

fn receipt_response(precheck: Status, receipt: Status) -> Bytes {
    let response = proto::Response {
        response: Some(response::Response::TransactionGetReceipt(
            proto::TransactionGetReceiptResponse {
                header: header(precheck),
                receipt: Some(proto::TransactionReceipt {
                    status: receipt.code(),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )),
    };
    Bytes::from(response.encode_to_vec())
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        node: &Endpoint,
        request: TransportRequest,
        _deadline: Instant,
    ) -> Result<Bytes, TransportError> {
        let is_receipt = request.method == methods::GET_RECEIPT;
        self.sent.lock().push(Sent {
            node: node.account_id,
            method: request.method,
            payload: request.payload,
            at: Instant::now(),
        });

        let default = if is_receipt {
            Reply::Receipt(Status::Success)
        } else {
            Reply::Precheck(Status::Ok)
        };
        let reply = self.script.lock().pop_front().unwrap_or(default);

        match (reply, is_receipt) {
            (Reply::Transport(err), _) => Err(err),
            (Reply::Receipt(status), _) => Ok(receipt_response(Status::Ok, status)),
            (Reply::Precheck(status), true) => Ok(receipt_response(status, Status::Unknown)),
            (Reply::Precheck(status), false) => Ok(Bytes::from(
                proto::TransactionResponse {
                    node_transaction_precheck_code: status.code(),
                    cost: 0,
                }
                .encode_to_vec(),
            )),
        }
    }
}

/// A client over `nodes` (0.0.3, 0.0.4, ...) with an operator, talking to
/// `transport`.
pub fn client(transport: Arc<ScriptedTransport>, nodes: u64) -> (Client, PrivateKey) {
    let network = (0..nodes)
        .map(|i| (format!("node-{i}"), AccountId::new(0, 0, 3 + i)))
        .collect::<Vec<_>>();
    let client = Client::for_network(network, transport).expect("client");
    let key = PrivateKey::generate();
    client.set_operator(OPERATOR, key.clone());
    (client, key)
}

pub fn node(num: u64) -> AccountId {
    AccountId::new(0, 0, num)
}
