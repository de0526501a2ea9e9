//! Execution scenarios against a scripted network.
//!
//! Every test runs on a paused tokio clock, so the backoff schedule is
//! observable to the millisecond and nothing actually sleeps.

mod common;

use std::collections::HashSet;
use std::time::Duration;

use futures::future::join_all;

use common::{client, node, Reply, ScriptedTransport, OPERATOR};
use strata_sdk::proto::methods;
use strata_sdk::{
    AccountId, Error, FileAppendTransaction, Hbar, LastOutcome, Status, TopicId,
    TopicMessageSubmitTransaction, TransactionId, TransactionReceiptQuery, TransferTransaction,
    TransportError, WrappedTransaction,
};

fn transfer() -> TransferTransaction {
    let mut tx = TransferTransaction::new();
    tx.add_hbar_transfer(OPERATOR, Hbar::new(-1))
        .expect("debit")
        .add_hbar_transfer(node(2000), Hbar::new(1))
        .expect("credit");
    tx
}

fn transaction_id_of(payload: &[u8]) -> TransactionId {
    WrappedTransaction::from_bytes(payload)
        .expect("decodable request")
        .transaction_id()
        .expect("transaction id")
}

// ---------------------------------------------------------------------------
// Backoff and node rotation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn busy_single_node_backs_off_exponentially() {
    let transport = ScriptedTransport::new(vec![
        Reply::Precheck(Status::Busy),
        Reply::Precheck(Status::Busy),
        Reply::Precheck(Status::Busy),
    ]);
    let (client, _) = client(transport.clone(), 1);

    let started = tokio::time::Instant::now();
    let response = transfer().execute(&client).await.expect("accepted");
    assert_eq!(response.precheck_status, Status::Ok);

    let offsets: Vec<u64> = transport
        .sent()
        .iter()
        .map(|s| (s.at - started).as_millis() as u64)
        .collect();
    assert_eq!(offsets, vec![0, 250, 750, 1750]);
}

#[tokio::test(start_paused = true)]
async fn busy_node_hands_over_to_the_next_one_immediately() {
    let transport = ScriptedTransport::new(vec![Reply::Precheck(Status::Busy)]);
    let (client, _) = client(transport.clone(), 3);

    let mut tx = transfer();
    tx.set_node_account_ids(vec![node(5), node(3), node(4)])
        .expect("nodes");
    let started = tokio::time::Instant::now();
    let response = tx.execute(&client).await.expect("accepted");

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].node, node(5));
    assert_eq!(sent[1].node, node(3));
    assert_eq!(sent[1].at, started);
    assert_eq!(response.node_id, node(3));
    assert!(!client.network().is_healthy(&node(5)));
}

#[tokio::test(start_paused = true)]
async fn transport_errors_rotate_like_busy() {
    let transport = ScriptedTransport::new(vec![
        Reply::Transport(TransportError::Unavailable("connection refused".into())),
        Reply::Transport(TransportError::DeadlineExceeded),
    ]);
    let (client, _) = client(transport.clone(), 3);

    let mut tx = transfer();
    tx.set_node_account_ids(vec![node(3), node(4), node(5)])
        .expect("nodes");
    let response = tx.execute(&client).await.expect("accepted");

    let nodes: Vec<_> = transport.sent().iter().map(|s| s.node).collect();
    assert_eq!(nodes, vec![node(3), node(4), node(5)]);
    assert_eq!(response.node_id, node(5));
}

#[tokio::test(start_paused = true)]
async fn attempts_are_bounded() {
    let transport = ScriptedTransport::new(vec![Reply::Precheck(Status::Busy); 10]);
    let (client, _) = client(transport.clone(), 2);

    let mut tx = transfer();
    tx.set_max_attempts(3).expect("attempts");
    let err = tx.execute(&client).await.expect_err("should give up");

    assert!(matches!(
        err,
        Error::MaxAttemptsExceeded {
            max_attempts: 3,
            last: LastOutcome::Status(Status::Busy)
        }
    ));
    assert_eq!(transport.sent().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn request_timeout_wins_over_backoff() {
    let transport = ScriptedTransport::new(vec![Reply::Precheck(Status::Busy); 10]);
    let (client, _) = client(transport.clone(), 1);

    let mut tx = transfer();
    tx.set_request_timeout(Duration::from_millis(600));
    let started = tokio::time::Instant::now();
    let err = tx.execute(&client).await.expect_err("should time out");

    assert!(matches!(err, Error::Timeout { .. }));
    assert_eq!(err.status(), Some(Status::Busy));
    assert_eq!(started.elapsed(), Duration::from_millis(600));
    // Sent at 0 and 250; the next slot (750) is past the deadline.
    assert_eq!(transport.sent().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn fatal_transport_error_stops_immediately() {
    let transport = ScriptedTransport::new(vec![Reply::Transport(TransportError::Fatal(
        "invalid certificate".into(),
    ))]);
    let (client, _) = client(transport.clone(), 3);

    let err = transfer().execute(&client).await.expect_err("fatal");
    assert!(matches!(err, Error::Transport { .. }));
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn non_retryable_precheck_is_final() {
    let transport =
        ScriptedTransport::new(vec![Reply::Precheck(Status::InsufficientPayerBalance)]);
    let (client, _) = client(transport.clone(), 3);

    let mut tx = transfer();
    let err = tx.execute(&client).await.expect_err("rejected");
    match err {
        Error::PrecheckStatus {
            status,
            transaction_id,
        } => {
            assert_eq!(status, Status::InsufficientPayerBalance);
            assert_eq!(transaction_id, tx.transaction_id());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_executions_share_one_client() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new(vec![]);
    let (client, _) = client(transport.clone(), 3);

    let mut transfers: Vec<TransferTransaction> = (0..8).map(|_| transfer()).collect();
    let responses = join_all(transfers.iter_mut().map(|tx| tx.execute(&client)))
        .await
        .into_iter()
        .collect::<Result<Vec<_>, Error>>()?;

    let ids: HashSet<TransactionId> = responses.iter().map(|r| r.transaction_id).collect();
    assert_eq!(ids.len(), transfers.len());
    assert_eq!(transport.sent().len(), transfers.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// Transaction id regeneration
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn expired_id_is_regenerated_and_re_signed() {
    let transport =
        ScriptedTransport::new(vec![Reply::Precheck(Status::TransactionExpired)]);
    let (client, key) = client(transport.clone(), 1);

    let mut tx = transfer();
    let response = tx.execute(&client).await.expect("accepted");

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    let first = transaction_id_of(&sent[0].payload);
    let second = transaction_id_of(&sent[1].payload);
    assert_ne!(first, second);
    assert_eq!(second.account_id, OPERATOR);
    assert!(second.valid_start > first.valid_start);
    assert_eq!(response.transaction_id, second);
    assert_eq!(tx.transaction_id(), Some(second));
    assert!(tx.is_signed_by(&key.public_key()));
}

#[tokio::test(start_paused = true)]
async fn regeneration_can_be_disabled_per_transaction() {
    let transport =
        ScriptedTransport::new(vec![Reply::Precheck(Status::TransactionExpired)]);
    let (client, _) = client(transport.clone(), 1);

    let mut tx = transfer();
    tx.set_regenerate_transaction_id(false);
    let err = tx.execute(&client).await.expect_err("expired");

    assert_eq!(err.status(), Some(Status::TransactionExpired));
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    let original = transaction_id_of(&sent[0].payload);
    assert_eq!(tx.transaction_id(), Some(original));
}

#[tokio::test(start_paused = true)]
async fn transaction_setting_overrides_client_setting() {
    let transport = ScriptedTransport::new(vec![
        Reply::Precheck(Status::TransactionExpired),
        Reply::Precheck(Status::TransactionExpired),
    ]);
    let (client, _) = client(transport.clone(), 1);
    client
        .update_execution_config(|config| {
            config.set_regenerate_transaction_ids(false);
            Ok(())
        })
        .expect("config");

    let err = transfer().execute(&client).await.expect_err("client forbids");
    assert_eq!(err.status(), Some(Status::TransactionExpired));

    let mut tx = transfer();
    tx.set_regenerate_transaction_id(true);
    tx.execute(&client).await.expect("transaction allows");
    assert_eq!(transport.sent().len(), 3);
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn receipt_is_polled_until_consensus() {
    let transport = ScriptedTransport::new(vec![
        Reply::Precheck(Status::Ok),
        Reply::Precheck(Status::ReceiptNotFound),
        Reply::Receipt(Status::Unknown),
        Reply::Receipt(Status::Success),
    ]);
    let (client, _) = client(transport.clone(), 2);

    let mut tx = transfer();
    tx.set_node_account_ids(vec![node(4)]).expect("nodes");
    let response = tx.execute(&client).await.expect("accepted");
    let receipt = response.get_receipt(&client).await.expect("receipt");

    assert_eq!(receipt.status, Status::Success);
    let polls = transport.sent_to(methods::GET_RECEIPT);
    assert_eq!(polls.len(), 3);
    assert!(polls.iter().all(|s| s.node == node(4)));
}

#[tokio::test(start_paused = true)]
async fn failed_receipt_becomes_an_error() {
    let transport = ScriptedTransport::new(vec![
        Reply::Precheck(Status::Ok),
        Reply::Receipt(Status::InvalidAccountId),
    ]);
    let (client, _) = client(transport.clone(), 1);

    let response = transfer().execute(&client).await.expect("accepted");
    let err = response.get_receipt(&client).await.expect_err("failed");
    match err {
        Error::ReceiptStatus {
            status,
            transaction_id,
        } => {
            assert_eq!(status, Status::InvalidAccountId);
            assert_eq!(transaction_id, response.transaction_id);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn out_of_range_receipt_query_is_never_sent() {
    let transport = ScriptedTransport::new(vec![]);
    let (client, _) = client(transport.clone(), 1);

    let payer = AccountId::new(0, i64::MAX as u64 + 1, 1001);
    let mut query = TransactionReceiptQuery::new();
    query.set_transaction_id(TransactionId::generate(payer));

    let err = query.execute(&client).await.expect_err("unencodable id");
    assert!(matches!(err, Error::Validation { .. }));
    assert!(transport.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn receipt_query_returns_failed_receipts_as_answers() {
    let transport = ScriptedTransport::new(vec![
        Reply::Precheck(Status::Ok),
        Reply::Receipt(Status::InvalidAccountId),
    ]);
    let (client, _) = client(transport.clone(), 1);

    let response = transfer().execute(&client).await.expect("accepted");
    let receipt = response
        .get_receipt_query()
        .execute(&client)
        .await
        .expect("answer");
    assert_eq!(receipt.status, Status::InvalidAccountId);
    assert!(receipt.validate_status(response.transaction_id).is_err());
}

// ---------------------------------------------------------------------------
// Chunked transactions
// ---------------------------------------------------------------------------

fn topic_message(len: usize) -> TopicMessageSubmitTransaction {
    let mut tx = TopicMessageSubmitTransaction::new();
    tx.set_topic_id(TopicId::new(0, 0, 5005))
        .expect("topic")
        .set_message(vec![7u8; len])
        .expect("message");
    tx
}

#[tokio::test(start_paused = true)]
async fn chunks_are_sent_in_order() {
    let transport = ScriptedTransport::new(vec![]);
    let (client, _) = client(transport.clone(), 1);

    let mut tx = topic_message(2500);
    let responses = tx.execute_all(&client).await.expect("all chunks");
    assert_eq!(responses.len(), 3);

    let initial = tx.transaction_id().expect("frozen id");
    let sent: Vec<TransactionId> = transport
        .sent_to(methods::SUBMIT_MESSAGE)
        .iter()
        .map(|s| transaction_id_of(&s.payload))
        .collect();
    let expected: Vec<TransactionId> = (0..3).map(|i| initial.chunk_id(i)).collect();
    assert_eq!(sent, expected);
    let answered: Vec<TransactionId> = responses.iter().map(|r| r.transaction_id).collect();
    assert_eq!(answered, expected);
}

#[tokio::test(start_paused = true)]
async fn failed_chunk_stops_the_rest() {
    let transport = ScriptedTransport::new(vec![
        Reply::Precheck(Status::Ok),
        Reply::Precheck(Status::InvalidTopicId),
    ]);
    let (client, _) = client(transport.clone(), 1);

    let err = topic_message(2500)
        .execute_all(&client)
        .await
        .expect_err("second chunk rejected");
    assert_eq!(err.status(), Some(Status::InvalidTopicId));
    assert_eq!(transport.sent().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn expired_chunk_is_not_regenerated() {
    let transport =
        ScriptedTransport::new(vec![Reply::Precheck(Status::TransactionExpired)]);
    let (client, _) = client(transport.clone(), 1);

    let err = topic_message(2500)
        .execute_all(&client)
        .await
        .expect_err("chunk ids are chained");
    assert_eq!(err.status(), Some(Status::TransactionExpired));
}

#[tokio::test(start_paused = true)]
async fn file_append_waits_for_each_receipt() {
    let transport = ScriptedTransport::new(vec![]);
    let (client, _) = client(transport.clone(), 1);

    let mut tx = FileAppendTransaction::new();
    tx.set_file_id(strata_sdk::FileId::new(0, 0, 150))
        .expect("file")
        .set_contents(vec![1u8; 10_000])
        .expect("contents");
    tx.execute_all(&client).await.expect("appended");

    let methods_sent: Vec<&str> = transport.sent().iter().map(|s| s.method).collect();
    assert_eq!(
        methods_sent,
        vec![
            methods::APPEND_CONTENT,
            methods::GET_RECEIPT,
            methods::APPEND_CONTENT,
            methods::GET_RECEIPT,
            methods::APPEND_CONTENT,
        ]
    );
}
