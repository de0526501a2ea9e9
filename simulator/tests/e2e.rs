//! The SDK against a simulated network: real encoding, real signatures,
//! real precheck, a ledger that actually moves balances.

use std::sync::Arc;

use strata_sdk::{
    AccountAllowanceApproveTransaction, AccountBalanceQuery, AccountCreateTransaction, AccountId,
    Client, Error, FileAppendTransaction, FileCreateTransaction, Hbar, PrivateKey,
    PrngTransaction, Status, TopicCreateTransaction, TopicMessageSubmitTransaction,
    TransactionId, TransactionRecordQuery, TransferTransaction, TransportError,
};
use strata_sim::{init_test_logging, Fault, SimConfig, SimulatedNetwork};

const OPERATOR: AccountId = AccountId::new(0, 0, 1001);
const NODE_3: AccountId = AccountId::new(0, 0, 3);
const NODE_4: AccountId = AccountId::new(0, 0, 4);

struct Harness {
    network: Arc<SimulatedNetwork>,
    client: Client,
    operator_key: PrivateKey,
}

impl Harness {
    fn new(config: SimConfig) -> Self {
        init_test_logging();
        let network = SimulatedNetwork::new(config);
        let operator_key = PrivateKey::generate();
        network
            .ledger()
            .create_genesis_account(OPERATOR, Some(operator_key.public_key()), Hbar::new(1_000))
            .expect("operator account");
        let client = network.client().expect("client");
        client.set_operator(OPERATOR, operator_key.clone());
        Self {
            network,
            client,
            operator_key,
        }
    }

    fn balance(&self, account: &AccountId) -> Hbar {
        self.network.ledger().balance(account).expect("account exists")
    }

    /// A funded account with its own key, created outside consensus.
    fn account(&self, num: u64, balance: Hbar) -> (AccountId, PrivateKey) {
        let id = AccountId::new(0, 0, num);
        let key = PrivateKey::generate();
        self.network
            .ledger()
            .create_genesis_account(id, Some(key.public_key()), balance)
            .expect("genesis account");
        (id, key)
    }
}

fn fee() -> Hbar {
    SimConfig::default().transaction_fee
}

// ---------------------------------------------------------------------------
// Crypto
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transfer_moves_balances_and_charges_the_fee() {
    let sim = Harness::new(SimConfig::default());
    let (bob, _) = sim.account(2001, Hbar::ZERO);

    let mut transfer = TransferTransaction::new();
    transfer
        .add_hbar_transfer(OPERATOR, Hbar::new(-10))
        .expect("debit")
        .add_hbar_transfer(bob, Hbar::new(10))
        .expect("credit");
    let response = transfer.execute(&sim.client).await.expect("submitted");
    let receipt = response.get_receipt(&sim.client).await.expect("receipt");

    assert_eq!(receipt.status, Status::Success);
    assert_eq!(sim.balance(&bob), Hbar::new(10));
    assert_eq!(sim.balance(&OPERATOR), Hbar::new(1_000) - Hbar::new(10) - fee());
    assert_eq!(sim.balance(&response.node_id), fee());
}

#[tokio::test]
async fn unsigned_debit_fails_at_consensus() {
    let sim = Harness::new(SimConfig::default());
    let (bob, _) = sim.account(2001, Hbar::new(50));

    let mut transfer = TransferTransaction::new();
    transfer
        .add_hbar_transfer(bob, Hbar::new(-10))
        .expect("debit")
        .add_hbar_transfer(OPERATOR, Hbar::new(10))
        .expect("credit");
    let response = transfer.execute(&sim.client).await.expect("submitted");
    let err = response
        .get_receipt(&sim.client)
        .await
        .expect_err("bob never signed");

    assert_eq!(err.status(), Some(Status::InvalidSignature));
    assert_eq!(sim.balance(&bob), Hbar::new(50));
    // The payer is charged regardless.
    assert_eq!(sim.balance(&OPERATOR), Hbar::new(1_000) - fee());
}

#[tokio::test]
async fn created_account_can_pay_for_its_own_transactions() {
    let sim = Harness::new(SimConfig::default());
    let new_key = PrivateKey::generate();

    let mut create = AccountCreateTransaction::new();
    create
        .set_key(new_key.public_key())
        .expect("key")
        .set_initial_balance(Hbar::new(5))
        .expect("balance");
    let receipt = create
        .execute(&sim.client)
        .await
        .expect("submitted")
        .get_receipt(&sim.client)
        .await
        .expect("receipt");
    let created = receipt.account_id.expect("receipt names the new account");
    assert_eq!(sim.balance(&created), Hbar::new(5));

    let mut transfer = TransferTransaction::new();
    transfer
        .add_hbar_transfer(created, Hbar::new(-1))
        .expect("debit")
        .add_hbar_transfer(OPERATOR, Hbar::new(1))
        .expect("credit")
        .set_transaction_id(TransactionId::generate(created))
        .expect("id")
        .freeze_with(&sim.client)
        .expect("freeze")
        .sign(new_key.clone())
        .expect("sign");
    transfer
        .execute(&sim.client)
        .await
        .expect("submitted")
        .get_receipt(&sim.client)
        .await
        .expect("receipt");

    assert_eq!(sim.balance(&created), Hbar::new(4) - fee());
}

#[tokio::test]
async fn payer_signature_is_checked_at_precheck() {
    let sim = Harness::new(SimConfig::default());
    let (bob, _) = sim.account(2001, Hbar::new(50));

    // Bob pays, but only the operator signs.
    let mut transfer = TransferTransaction::new();
    transfer
        .add_hbar_transfer(OPERATOR, Hbar::new(-1))
        .expect("debit")
        .add_hbar_transfer(bob, Hbar::new(1))
        .expect("credit")
        .set_transaction_id(TransactionId::generate(bob))
        .expect("id")
        .freeze_with(&sim.client)
        .expect("freeze")
        .sign(sim.operator_key.clone())
        .expect("sign");
    let err = transfer.execute(&sim.client).await.expect_err("payer unsigned");

    assert_eq!(err.status(), Some(Status::InvalidSignature));
    assert!(matches!(err, Error::PrecheckStatus { .. }));
    assert_eq!(sim.network.submissions(), 0);
}

#[tokio::test]
async fn spender_draws_on_an_allowance_until_it_runs_out() {
    let sim = Harness::new(SimConfig::default());
    let (spender, spender_key) = sim.account(2001, Hbar::new(10));
    let (carol, _) = sim.account(2002, Hbar::ZERO);

    let approve = |amount: Hbar| {
        let mut approve = AccountAllowanceApproveTransaction::new();
        approve
            .approve_hbar_allowance(OPERATOR, spender, amount)
            .expect("approve");
        approve
    };
    let spend = |amount: Hbar| {
        let mut transfer = TransferTransaction::new();
        transfer
            .add_approved_hbar_transfer(OPERATOR, -amount)
            .expect("approved debit")
            .add_hbar_transfer(carol, amount)
            .expect("credit")
            .set_transaction_id(TransactionId::generate(spender))
            .expect("id")
            .freeze_with(&sim.client)
            .expect("freeze")
            .sign(spender_key.clone())
            .expect("sign");
        transfer
    };

    approve(Hbar::new(2))
        .execute(&sim.client)
        .await
        .expect("submitted")
        .get_receipt(&sim.client)
        .await
        .expect("receipt");
    assert_eq!(sim.network.ledger().allowance(&OPERATOR, &spender), Hbar::new(2));

    spend(Hbar::new(1))
        .execute(&sim.client)
        .await
        .expect("submitted")
        .get_receipt(&sim.client)
        .await
        .expect("within the allowance");
    assert_eq!(sim.balance(&carol), Hbar::new(1));
    assert_eq!(sim.network.ledger().allowance(&OPERATOR, &spender), Hbar::new(1));

    let err = spend(Hbar::new(2))
        .execute(&sim.client)
        .await
        .expect("submitted")
        .get_receipt(&sim.client)
        .await
        .expect_err("beyond the allowance");
    assert!(matches!(
        err,
        Error::ReceiptStatus {
            status: Status::AmountExceedsAllowance,
            ..
        }
    ));
    assert_eq!(sim.balance(&carol), Hbar::new(1));
    assert_eq!(sim.network.ledger().allowance(&OPERATOR, &spender), Hbar::new(1));

    // A new approval replaces what was left rather than adding to it.
    approve(Hbar::new(3))
        .execute(&sim.client)
        .await
        .expect("submitted")
        .get_receipt(&sim.client)
        .await
        .expect("receipt");
    assert_eq!(sim.network.ledger().allowance(&OPERATOR, &spender), Hbar::new(3));

    spend(Hbar::new(2))
        .execute(&sim.client)
        .await
        .expect("submitted")
        .get_receipt(&sim.client)
        .await
        .expect("within the raised allowance");
    assert_eq!(sim.balance(&carol), Hbar::new(3));
    assert_eq!(sim.network.ledger().allowance(&OPERATOR, &spender), Hbar::new(1));
}

// ---------------------------------------------------------------------------
// Files and topics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn file_contents_arrive_in_chunk_order() {
    let sim = Harness::new(SimConfig {
        receipt_lag: 1,
        ..SimConfig::default()
    });

    let mut create = FileCreateTransaction::new();
    create
        .set_keys(vec![sim.operator_key.public_key()])
        .expect("keys")
        .set_contents(b"head:".to_vec())
        .expect("contents");
    let file_id = create
        .execute(&sim.client)
        .await
        .expect("submitted")
        .get_receipt(&sim.client)
        .await
        .expect("receipt")
        .file_id
        .expect("receipt names the file");

    let body: Vec<u8> = (0..2_500u32).map(|i| b'a' + (i % 26) as u8).collect();
    let mut append = FileAppendTransaction::new();
    append
        .set_file_id(file_id)
        .expect("file")
        .set_contents(body.clone())
        .expect("contents")
        .set_chunk_size(1_000)
        .expect("chunk size");
    let responses = append.execute_all(&sim.client).await.expect("all chunks");
    assert_eq!(responses.len(), 3);
    responses[2]
        .get_receipt(&sim.client)
        .await
        .expect("last chunk");

    let file = sim.network.ledger().file(&file_id).expect("file exists");
    let mut expected = b"head:".to_vec();
    expected.extend_from_slice(&body);
    assert_eq!(file.contents, expected);
}

#[tokio::test]
async fn chunked_message_advances_the_topic_once_per_chunk() {
    let sim = Harness::new(SimConfig::default());

    let mut create = TopicCreateTransaction::new();
    create
        .set_topic_memo("e2e")
        .expect("memo")
        .set_admin_key(sim.operator_key.public_key())
        .expect("admin key");
    let topic_id = create
        .execute(&sim.client)
        .await
        .expect("submitted")
        .get_receipt(&sim.client)
        .await
        .expect("receipt")
        .topic_id
        .expect("receipt names the topic");

    let mut submit = TopicMessageSubmitTransaction::new();
    submit
        .set_topic_id(topic_id)
        .expect("topic")
        .set_message(vec![7u8; 2_100])
        .expect("message")
        .set_chunk_size(1_024)
        .expect("chunk size");
    let responses = submit.execute_all(&sim.client).await.expect("all chunks");
    assert_eq!(responses.len(), 3);

    let last = responses[2]
        .get_receipt(&sim.client)
        .await
        .expect("receipt");
    assert_eq!(last.topic_sequence_number, 3);

    let topic = sim.network.ledger().topic(&topic_id).expect("topic exists");
    assert_eq!(topic.messages.len(), 3);
    assert_eq!(last.topic_running_hash, Some(topic.running_hash.clone()));
    let first_id = responses[0].transaction_id;
    for (i, response) in responses.iter().enumerate() {
        assert_eq!(response.transaction_id, first_id.chunk_id(i));
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn balance_query_is_free() {
    let sim = Harness::new(SimConfig::default());
    let (bob, _) = sim.account(2001, Hbar::new(42));

    let mut query = AccountBalanceQuery::new();
    query.set_account_id(bob);
    let balance = query.execute(&sim.client).await.expect("balance");

    assert_eq!(balance.account_id, bob);
    assert_eq!(balance.hbars, Hbar::new(42));
    assert_eq!(sim.balance(&OPERATOR), Hbar::new(1_000));
}

#[tokio::test]
async fn balance_of_unknown_account_is_rejected() {
    let sim = Harness::new(SimConfig::default());

    let mut query = AccountBalanceQuery::new();
    query.set_account_id(AccountId::new(0, 0, 9_999));
    let err = query.execute(&sim.client).await.expect_err("no such account");

    assert_eq!(err.status(), Some(Status::InvalidAccountId));
}

#[tokio::test]
async fn record_query_is_paid_for_and_waits_for_consensus() {
    let sim = Harness::new(SimConfig {
        receipt_lag: 2,
        ..SimConfig::default()
    });

    let mut prng = PrngTransaction::new();
    prng.set_range(100).expect("range");
    let response = prng.execute(&sim.client).await.expect("submitted");
    let before = sim.balance(&OPERATOR);

    let record = response.get_record(&sim.client).await.expect("record");

    assert_eq!(record.receipt.status, Status::Success);
    assert_eq!(record.transaction_id, Some(response.transaction_id));
    assert_eq!(record.transaction_fee, fee());
    assert_eq!(record.transaction_hash, response.transaction_hash.to_vec());
    match record.prng {
        Some(strata_sdk::PrngOutput::Number(n)) => assert!((0..100).contains(&n)),
        other => panic!("expected a number, got {other:?}"),
    }

    // One payment, covering the cost plus its own fee, however many polls.
    let cost = SimConfig::default().record_query_cost;
    assert_eq!(sim.balance(&OPERATOR), before - cost - fee());
}

#[tokio::test]
async fn record_query_over_the_payment_cap_pays_nothing() {
    let sim = Harness::new(SimConfig::default());
    let mut prng = PrngTransaction::new();
    let response = prng.execute(&sim.client).await.expect("submitted");
    response.get_receipt(&sim.client).await.expect("receipt");
    let before = sim.balance(&OPERATOR);

    let mut query = TransactionRecordQuery::new();
    query
        .set_transaction_id(response.transaction_id)
        .set_max_query_payment(Hbar::from_tinybars(10))
        .expect("cap");
    let err = query.execute(&sim.client).await.expect_err("too expensive");

    assert!(matches!(err, Error::MaxQueryPaymentExceeded { .. }));
    assert_eq!(sim.balance(&OPERATOR), before);
}

// ---------------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn busy_node_hands_over_to_the_next() {
    let sim = Harness::new(SimConfig::default());
    sim.network.faults().inject(NODE_3, Fault::Precheck(Status::Busy));

    let mut transfer = TransferTransaction::new();
    transfer
        .add_hbar_transfer(OPERATOR, Hbar::new(-1))
        .expect("debit")
        .add_hbar_transfer(NODE_4, Hbar::new(1))
        .expect("credit")
        .set_node_account_ids(vec![NODE_3, NODE_4])
        .expect("nodes");
    let response = transfer.execute(&sim.client).await.expect("submitted");

    assert_eq!(response.node_id, NODE_4);
    assert_eq!(sim.network.requests_to(&NODE_3), 1);
    assert_eq!(sim.network.submissions(), 1);
}

#[tokio::test(start_paused = true)]
async fn downed_node_is_routed_around() {
    let sim = Harness::new(SimConfig::default());
    sim.network.faults().take_down(NODE_3);

    let mut prng = PrngTransaction::new();
    prng.set_node_account_ids(vec![NODE_3, NODE_4]).expect("nodes");
    let response = prng.execute(&sim.client).await.expect("submitted");
    assert_eq!(response.node_id, NODE_4);

    sim.network.faults().restore(NODE_3);
    let mut again = PrngTransaction::new();
    again.set_node_account_ids(vec![NODE_3]).expect("nodes");
    let response = again.execute(&sim.client).await.expect("node is back");
    assert_eq!(response.node_id, NODE_3);
}

#[tokio::test(start_paused = true)]
async fn node_that_never_recovers_exhausts_attempts() {
    let sim = Harness::new(SimConfig::default());
    sim.network.faults().take_down(NODE_3);

    let mut prng = PrngTransaction::new();
    prng.set_node_account_ids(vec![NODE_3])
        .expect("nodes")
        .set_max_attempts(4)
        .expect("attempts");
    let err = prng.execute(&sim.client).await.expect_err("always down");

    assert!(matches!(
        err,
        Error::MaxAttemptsExceeded {
            max_attempts: 4,
            last: strata_sdk::LastOutcome::Transport(TransportError::Unavailable(_)),
        }
    ));
    assert_eq!(sim.network.requests_to(&NODE_3), 4);
}

#[tokio::test(start_paused = true)]
async fn expired_precheck_is_resubmitted_under_a_new_id() {
    let sim = Harness::new(SimConfig::default());
    sim.network
        .faults()
        .inject(NODE_3, Fault::Precheck(Status::TransactionExpired));

    let mut prng = PrngTransaction::new();
    prng.set_node_account_ids(vec![NODE_3]).expect("nodes");
    prng.freeze_with(&sim.client).expect("freeze");
    let first_id = prng.transaction_id().expect("frozen");

    let response = prng.execute(&sim.client).await.expect("submitted");

    assert_ne!(response.transaction_id, first_id);
    assert!(sim.network.ledger().has_outcome(&response.transaction_id));
    assert!(!sim.network.ledger().has_outcome(&first_id));
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transfers_all_settle() {
    let sim = Harness::new(SimConfig::default());
    let recipients: Vec<AccountId> = (0..16)
        .map(|i| sim.account(3000 + i, Hbar::ZERO).0)
        .collect();

    let submissions = recipients.iter().map(|&recipient| {
        let client = sim.client.clone();
        async move {
            let mut transfer = TransferTransaction::new();
            transfer
                .add_hbar_transfer(OPERATOR, Hbar::new(-2))?
                .add_hbar_transfer(recipient, Hbar::new(2))?;
            let response = transfer.execute(&client).await?;
            Ok::<_, Error>(response.get_receipt(&client).await?)
        }
    });
    let receipts = futures::future::join_all(submissions).await;

    for receipt in receipts {
        assert_eq!(receipt.expect("settled").status, Status::Success);
    }
    for recipient in &recipients {
        assert_eq!(sim.balance(recipient), Hbar::new(2));
    }
    let spent = Hbar::from_tinybars((Hbar::new(2) + fee()).to_tinybars() * 16);
    assert_eq!(sim.balance(&OPERATOR), Hbar::new(1_000) - spent);
}
