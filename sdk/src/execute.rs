//! # Execution Engine
//!
//! One loop drives every request the SDK sends, transactions and queries
//! alike:
//!
//! ```text
//! select node -> build request -> send -> classify -+-> Success        -> return
//!      ^                                            +-> Retryable      -> cool node down, next node
//!      |                                            +-> StillProcessing-> poll backoff, same budget
//!      |                                            +-> Expired        -> regenerate id (if allowed)
//!      +--------------------------------------------+-> anything else  -> typed error
//! ```
//!
//! Retry decisions are made by matching on a [`StatusBucket`], never by
//! unwinding an error. The only suspension points are the transport call
//! and the backoff sleeps, and both are bounded by the request deadline.
//!
//! Two retry axes are kept apart on purpose. Node trouble (transport errors,
//! `BUSY`) counts against `max_attempts` and pushes that node's cooldown
//! out. "Not there yet" answers (pending receipts) do not consume attempts:
//! they back off on their own schedule until the request timeout.

use prost::Message;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::backoff::Backoff;
use crate::client::Client;
use crate::config::{ExecutionOverrides, ResolvedExecution};
use crate::error::{Error, LastOutcome, Result};
use crate::id::{AccountId, TransactionId};
use crate::network::{TransportError, TransportRequest};
use crate::status::{Status, StatusBucket, StatusTable};
use crate::transaction::DecodeError;

/// Something the engine can send: a transaction chunk, a query, a cost
/// query.
///
/// Everything here is synchronous. The engine owns all the waiting.
pub(crate) trait Execute {
    /// The protobuf message a node answers with.
    type Response: Message + Default;
    /// What the caller gets back on success.
    type Output;

    /// Nodes this request may go to, in the order to try them.
    fn candidates(&self) -> Vec<AccountId>;

    fn overrides(&self) -> &ExecutionOverrides;

    /// Carried on precheck errors for diagnostics.
    fn transaction_id(&self) -> Option<TransactionId>;

    /// Serialize the request for one specific node.
    fn make_request(&self, node: AccountId) -> Result<TransportRequest>;

    fn classify(&self, response: &Self::Response, table: &StatusTable) -> (Status, StatusBucket);

    /// Replace an expired transaction id. `Ok(false)` means "not allowed",
    /// and the expiry is reported to the caller.
    fn regenerate_transaction_id(&mut self, _client: &Client) -> Result<bool> {
        Ok(false)
    }

    fn make_output(
        &self,
        response: Self::Response,
        node: AccountId,
        status: Status,
    ) -> Result<Self::Output>;
}

/// Run `request` to completion against `client`'s network.
pub(crate) async fn execute<E: Execute>(client: &Client, request: &mut E) -> Result<E::Output> {
    let settings = request.overrides().resolve(&client.execution_config());
    let table = client.status_table();
    let candidates = request.candidates();
    if candidates.is_empty() {
        return Err(Error::illegal_state("request has no candidate nodes"));
    }

    let deadline = Instant::now() + settings.request_timeout;
    let mut attempt: u32 = 0;
    let mut rotation: usize = 0;
    let mut last = LastOutcome::Nothing;
    let mut poll = Backoff::new(settings.min_backoff, settings.max_backoff);

    loop {
        if attempt >= settings.max_attempts {
            return Err(Error::MaxAttemptsExceeded {
                max_attempts: settings.max_attempts,
                last,
            });
        }
        if Instant::now() >= deadline {
            return Err(timed_out(&settings, last));
        }

        let (endpoint, wait) = client.network().select(&candidates, rotation)?;
        if !wait.is_zero() && !sleep_within(wait, deadline).await {
            return Err(timed_out(&settings, last));
        }

        let node = endpoint.account_id;
        let outgoing = request.make_request(node)?;
        let attempt_deadline = (Instant::now() + settings.grpc_deadline).min(deadline);
        trace!(node = %node, attempt, method = outgoing.method, "sending request");

        let sent = tokio::time::timeout_at(
            attempt_deadline,
            client.transport().send(&endpoint, outgoing, attempt_deadline),
        )
        .await;
        let outcome = match sent {
            Ok(outcome) => outcome,
            Err(_elapsed) => Err(TransportError::DeadlineExceeded),
        };

        let bytes = match outcome {
            Ok(bytes) => bytes,
            Err(err) if err.is_retryable() => {
                warn!(node = %node, attempt, error = %err, "transport failure, trying the next node");
                client
                    .network()
                    .mark_failure(node, settings.min_backoff, settings.max_backoff);
                last = LastOutcome::Transport(err);
                attempt += 1;
                rotation += 1;
                continue;
            }
            Err(err) => return Err(Error::Transport { node, source: err }),
        };

        let response = E::Response::decode(bytes).map_err(DecodeError::from)?;
        let (status, bucket) = request.classify(&response, &table);
        debug!(node = %node, attempt, %status, ?bucket, "response classified");

        match bucket {
            StatusBucket::Success => {
                client.network().mark_success(node);
                return request.make_output(response, node, status);
            }
            StatusBucket::Retryable => {
                warn!(node = %node, attempt, %status, "node asked us to back off");
                client
                    .network()
                    .mark_failure(node, settings.min_backoff, settings.max_backoff);
                last = LastOutcome::Status(status);
                attempt += 1;
                rotation += 1;
            }
            StatusBucket::StillProcessing => {
                client.network().mark_success(node);
                last = LastOutcome::Status(status);
                let delay = poll.next_delay();
                trace!(node = %node, %status, delay_ms = delay.as_millis() as u64, "not ready, polling again");
                if !sleep_within(delay, deadline).await {
                    return Err(timed_out(&settings, last));
                }
            }
            StatusBucket::Expired => {
                let expired = request.transaction_id();
                if !request.regenerate_transaction_id(client)? {
                    return Err(Error::PrecheckStatus {
                        status,
                        transaction_id: expired,
                    });
                }
                info!(
                    node = %node,
                    expired = ?expired.map(|id| id.to_string()),
                    fresh = ?request.transaction_id().map(|id| id.to_string()),
                    "transaction id expired, regenerated"
                );
                last = LastOutcome::Status(status);
                attempt += 1;
            }
            StatusBucket::NonRetryable | StatusBucket::TerminalFailure => {
                return Err(Error::PrecheckStatus {
                    status,
                    transaction_id: request.transaction_id(),
                });
            }
        }
    }
}

fn timed_out(settings: &ResolvedExecution, last: LastOutcome) -> Error {
    Error::Timeout {
        timeout: settings.request_timeout,
        last,
    }
}

/// Sleep for `delay`, or until `deadline` if that comes first.
/// Returns `false` when the deadline cut the sleep short.
async fn sleep_within(delay: std::time::Duration, deadline: Instant) -> bool {
    let wake = Instant::now() + delay;
    if wake >= deadline {
        tokio::time::sleep_until(deadline).await;
        return false;
    }
    tokio::time::sleep_until(wake).await;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Endpoint, Transport};
    use crate::proto;
    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    /// Answers with scripted precheck codes, then `OK` forever.
    struct Scripted {
        replies: Mutex<VecDeque<std::result::Result<Status, TransportError>>>,
        sent: Mutex<u32>,
    }

    impl Scripted {
        fn new(replies: Vec<std::result::Result<Status, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                sent: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(
            &self,
            _node: &Endpoint,
            _request: TransportRequest,
            _deadline: Instant,
        ) -> std::result::Result<Bytes, TransportError> {
            *self.sent.lock() += 1;
            let status = self.replies.lock().pop_front().unwrap_or(Ok(Status::Ok))?;
            let response = proto::TransactionResponse {
                node_transaction_precheck_code: status.code(),
                cost: 0,
            };
            Ok(Bytes::from(response.encode_to_vec()))
        }
    }

    /// The smallest possible request: one node, no payload.
    struct Ping {
        overrides: ExecutionOverrides,
    }

    impl Ping {
        fn new() -> Self {
            Self {
                overrides: ExecutionOverrides::default(),
            }
        }
    }

    impl Execute for Ping {
        type Response = proto::TransactionResponse;
        type Output = Status;

        fn candidates(&self) -> Vec<AccountId> {
            vec![AccountId::new(0, 0, 3)]
        }

        fn overrides(&self) -> &ExecutionOverrides {
            &self.overrides
        }

        fn transaction_id(&self) -> Option<TransactionId> {
            None
        }

        fn make_request(&self, _node: AccountId) -> Result<TransportRequest> {
            Ok(TransportRequest::new("/test/echo", Vec::new()))
        }

        fn classify(&self, response: &Self::Response, table: &StatusTable) -> (Status, StatusBucket) {
            let status = Status::from_code(response.node_transaction_precheck_code);
            (status, table.classify_precheck(status))
        }

        fn make_output(&self, _response: Self::Response, _node: AccountId, status: Status) -> Result<Status> {
            Ok(status)
        }
    }

    fn client(transport: Arc<Scripted>) -> Client {
        Client::for_network(vec![("node".to_string(), AccountId::new(0, 0, 3))], transport).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn busy_node_is_retried_after_its_cooldown() {
        let transport = Scripted::new(vec![Ok(Status::Busy), Ok(Status::Busy), Ok(Status::Busy)]);
        let client = client(Arc::clone(&transport));

        let started = Instant::now();
        let status = execute(&client, &mut Ping::new()).await.unwrap();

        assert_eq!(status, Status::Ok);
        assert_eq!(*transport.sent.lock(), 4);
        // 250 + 500 + 1000 ms of cooldown on the only node.
        assert_eq!(started.elapsed(), Duration::from_millis(1750));
    }

    #[tokio::test(start_paused = true)]
    async fn polling_does_not_consume_attempts() {
        let transport = Scripted::new(vec![
            Ok(Status::ReceiptNotFound),
            Ok(Status::ReceiptNotFound),
            Ok(Status::ReceiptNotFound),
        ]);
        let client = client(Arc::clone(&transport));
        let mut ping = Ping::new();
        ping.overrides.set_max_attempts(1).unwrap();

        assert_eq!(execute(&client, &mut ping).await.unwrap(), Status::Ok);
        assert_eq!(*transport.sent.lock(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_run_out() {
        let transport = Scripted::new(vec![Ok(Status::Busy); 10]);
        let client = client(transport);
        let mut ping = Ping::new();
        ping.overrides.set_max_attempts(3).unwrap();

        let err = execute(&client, &mut ping).await.unwrap_err();
        assert!(matches!(
            err,
            Error::MaxAttemptsExceeded {
                max_attempts: 3,
                last: LastOutcome::Status(Status::Busy)
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cuts_backoff_short() {
        let transport = Scripted::new(vec![Ok(Status::Busy); 10]);
        let client = client(transport);
        let mut ping = Ping::new();
        ping.overrides.request_timeout = Some(Duration::from_secs(1));

        let started = Instant::now();
        let err = execute(&client, &mut ping).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_transport_error_is_final() {
        let transport = Scripted::new(vec![Err(TransportError::Fatal("bad certificate".into()))]);
        let client = client(Arc::clone(&transport));

        let err = execute(&client, &mut Ping::new()).await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
        assert_eq!(*transport.sent.lock(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_precheck_is_reported() {
        let transport = Scripted::new(vec![Ok(Status::InvalidSignature)]);
        let client = client(transport);

        let err = execute(&client, &mut Ping::new()).await.unwrap_err();
        assert_eq!(err.status(), Some(Status::InvalidSignature));
    }
}
