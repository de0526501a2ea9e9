//! The transaction state machine and the envelope codec, per kind.

mod common;

use std::time::Duration;

use prost::Message;

use common::{node, OPERATOR};
use strata_sdk::proto;
use strata_sdk::transaction::{self, KINDS};
use strata_sdk::{
    AccountAllowanceApproveTransaction, AccountId, AccountAllowanceDeleteTransaction,
    AccountCreateTransaction, AccountDeleteTransaction, Error, FileAppendTransaction,
    FileCreateTransaction, Hbar, PrivateKey, PrngTransaction, ScheduleDeleteTransaction,
    TokenAssociateTransaction, TokenDissociateTransaction, TokenId, TopicCreateTransaction,
    TopicDeleteTransaction, TopicId, TopicMessageSubmitTransaction, Transaction, TransactionData,
    TransactionId, TransferTransaction, WrappedTransaction,
};

fn freeze<D: TransactionData>(tx: &mut Transaction<D>) {
    tx.set_transaction_id(TransactionId::generate(OPERATOR))
        .expect("id")
        .set_node_account_ids(vec![node(3), node(4)])
        .expect("nodes");
    tx.freeze().expect("freeze");
}

fn transfer() -> TransferTransaction {
    let mut tx = TransferTransaction::new();
    tx.add_hbar_transfer(OPERATOR, Hbar::new(-3))
        .expect("debit")
        .add_hbar_transfer(node(2000), Hbar::new(3))
        .expect("credit");
    tx
}

// ---------------------------------------------------------------------------
// Freeze and sign
// ---------------------------------------------------------------------------

#[test]
fn setters_fail_once_frozen() {
    let mut tx = transfer();
    freeze(&mut tx);

    assert!(matches!(
        tx.add_hbar_transfer(node(9), Hbar::new(1)),
        Err(Error::IllegalState(_))
    ));
    assert!(tx.set_memo("late").is_err());
    assert!(tx.set_max_transaction_fee(Hbar::new(1)).is_err());
    assert!(tx.set_node_account_ids(vec![node(3)]).is_err());
    assert!(tx.freeze().is_err());
}

#[test]
fn execution_settings_stay_mutable_after_freeze() {
    let mut tx = transfer();
    freeze(&mut tx);

    tx.set_max_attempts(2).expect("attempts");
    tx.set_request_timeout(Duration::from_secs(5));
    tx.set_regenerate_transaction_id(false);
    assert_eq!(tx.regenerate_transaction_id(), Some(false));
}

#[test]
fn freeze_needs_an_id_and_nodes() {
    let mut missing_id = transfer();
    missing_id
        .set_node_account_ids(vec![node(3)])
        .expect("nodes");
    assert!(missing_id.freeze().is_err());
    assert!(!missing_id.is_frozen());

    let mut missing_nodes = transfer();
    missing_nodes
        .set_transaction_id(TransactionId::generate(OPERATOR))
        .expect("id");
    assert!(missing_nodes.freeze().is_err());
}

#[test]
fn ids_beyond_the_wire_range_refuse_to_freeze() {
    let just_over = i64::MAX as u64 + 1;

    let mut payer_over = transfer();
    payer_over
        .set_transaction_id(TransactionId::generate(AccountId::new(just_over, 0, 1001)))
        .expect("id")
        .set_node_account_ids(vec![node(3)])
        .expect("nodes");
    assert!(matches!(payer_over.freeze(), Err(Error::Validation { .. })));
    assert!(!payer_over.is_frozen());

    let mut node_over = transfer();
    node_over
        .set_transaction_id(TransactionId::generate(OPERATOR))
        .expect("id")
        .set_node_account_ids(vec![node(just_over)])
        .expect("nodes");
    assert!(node_over.freeze().is_err());

    let mut topic_over = TopicDeleteTransaction::new();
    topic_over
        .set_topic_id(TopicId::new(0, just_over, 7))
        .expect("topic");
    topic_over
        .set_transaction_id(TransactionId::generate(OPERATOR))
        .expect("id")
        .set_node_account_ids(vec![node(3)])
        .expect("nodes");
    assert!(topic_over.freeze().is_err());

    let mut at_the_edge = transfer();
    at_the_edge
        .set_transaction_id(TransactionId::generate(AccountId::new(0, 0, i64::MAX as u64)))
        .expect("id")
        .set_node_account_ids(vec![node(3)])
        .expect("nodes");
    at_the_edge.freeze().expect("largest id freezes");
    let decoded = TransferTransaction::from_bytes(&at_the_edge.to_bytes().expect("bytes"))
        .expect("decode");
    assert_eq!(decoded.transaction_id(), at_the_edge.transaction_id());
}

#[test]
fn signing_requires_freezing() {
    let mut tx = transfer();
    assert!(matches!(
        tx.sign(PrivateKey::generate()),
        Err(Error::IllegalState(_))
    ));
    assert!(tx.to_bytes().is_err());
    assert!(tx.transaction_hash().is_err());
}

#[test]
fn signing_twice_with_one_key_changes_nothing() {
    let key = PrivateKey::generate();
    let mut tx = transfer();
    freeze(&mut tx);

    tx.sign(key.clone()).expect("sign");
    let once = tx.to_bytes_all().expect("bytes");
    tx.sign(key.clone()).expect("sign again");
    assert_eq!(tx.to_bytes_all().expect("bytes"), once);

    let signatures = tx.signatures().expect("signatures");
    assert_eq!(signatures.len(), 2);
    assert!(signatures.values().all(|by_key| by_key.len() == 1));
}

#[test]
fn every_node_body_is_signed_by_every_key() {
    let (alice, bob) = (PrivateKey::generate(), PrivateKey::generate());
    let mut tx = transfer();
    freeze(&mut tx);
    tx.sign(alice.clone()).expect("alice").sign(bob.clone()).expect("bob");

    assert!(tx.is_signed_by(&alice.public_key()));
    assert!(tx.is_signed_by(&bob.public_key()));
    for by_key in tx.signatures().expect("signatures").values() {
        assert_eq!(by_key.len(), 2);
    }

    let hashes = tx.transaction_hash_per_node().expect("hashes");
    assert_eq!(hashes.len(), 2);
    assert_ne!(hashes[&node(3)], hashes[&node(4)]);
    assert_eq!(tx.transaction_hash().expect("hash"), hashes[&node(3)]);
}

#[test]
fn raw_signature_needs_a_single_body() {
    let key = PrivateKey::generate();

    let mut two_nodes = transfer();
    freeze(&mut two_nodes);
    assert!(two_nodes.add_signature(key.public_key(), vec![0u8; 64]).is_err());

    let mut one_node = transfer();
    one_node
        .set_transaction_id(TransactionId::generate(OPERATOR))
        .expect("id")
        .set_node_account_ids(vec![node(3)])
        .expect("nodes");
    one_node.freeze().expect("freeze");
    one_node
        .add_signature(key.public_key(), vec![0u8; 64])
        .expect("one body");
    assert!(one_node.is_signed_by(&key.public_key()));
}

#[test]
fn chunks_get_consecutive_ids() {
    let mut tx = TopicMessageSubmitTransaction::new();
    tx.set_topic_id(TopicId::new(0, 0, 7))
        .expect("topic")
        .set_message(vec![1u8; 3000])
        .expect("message");
    freeze(&mut tx);

    let initial = tx.transaction_id().expect("id");
    let ids = tx.chunk_transaction_ids().expect("ids");
    assert_eq!(ids, vec![initial, initial.chunk_id(1), initial.chunk_id(2)]);
}

#[test]
fn too_many_chunks_refuse_to_freeze() {
    let mut tx = TopicMessageSubmitTransaction::new();
    tx.set_topic_id(TopicId::new(0, 0, 7))
        .expect("topic")
        .set_message(vec![1u8; 100])
        .expect("message")
        .set_chunk_size(10)
        .expect("chunk size")
        .set_max_chunks(5)
        .expect("max chunks");
    tx.set_transaction_id(TransactionId::generate(OPERATOR))
        .expect("id")
        .set_node_account_ids(vec![node(3)])
        .expect("nodes");

    assert!(matches!(
        tx.freeze(),
        Err(Error::MaxChunksExceeded { .. })
    ));
    assert!(!tx.is_frozen());
}

// ---------------------------------------------------------------------------
// Round trips, one per kind
// ---------------------------------------------------------------------------

/// Freeze, sign, encode as a full list and as the first envelope at each
/// depth (body, signed transaction, outer wrapper), decode all of them
/// through the kind table, and compare.
fn round_trip<D>(mut tx: Transaction<D>)
where
    D: TransactionData + PartialEq,
    WrappedTransaction: From<Transaction<D>>,
{
    freeze(&mut tx);
    let key = PrivateKey::generate();
    tx.sign(key.clone()).expect("sign");

    let expected_index = WrappedTransaction::from(tx.clone()).kind_index();
    let single_chunk = tx.chunk_transaction_ids().expect("chunk ids").len() == 1;

    let all = tx.to_bytes_all().expect("list bytes");
    let (index, wrapped) = transaction::decode(&all).expect("decode list");
    assert_eq!(index, expected_index);
    assert!(wrapped.is_frozen());
    assert_eq!(wrapped.transaction_id(), tx.transaction_id());
    assert_eq!(wrapped.node_account_ids(), Some(vec![node(3), node(4)]));
    assert_eq!(wrapped.transaction_hash().expect("hash"), tx.transaction_hash().expect("hash"));

    let decoded = Transaction::<D>::from_bytes(&all).expect("typed decode");
    assert_eq!(decoded.data(), tx.data());
    assert_eq!(decoded.memo(), tx.memo());
    assert_eq!(decoded.max_transaction_fee(), tx.max_transaction_fee());
    assert_eq!(decoded.to_bytes_all().expect("re-encode"), all);

    let outer = tx.to_bytes().expect("single bytes");
    let signed = proto::Transaction::decode(outer.as_slice())
        .expect("outer wrapper")
        .signed_transaction_bytes;
    let body = proto::SignedTransaction::decode(signed.as_slice())
        .expect("signed transaction")
        .body_bytes;

    let first_envelope = Transaction::<D>::from_bytes(&outer).expect("typed single decode");
    if single_chunk {
        assert_eq!(first_envelope.data(), tx.data());
    }

    for (depth, bytes) in [("outer", &outer), ("signed", &signed), ("body", &body)] {
        let (index, wrapped) = transaction::decode(bytes).expect(depth);
        assert_eq!(index, expected_index, "{depth}");
        assert_eq!(wrapped.transaction_id(), tx.transaction_id(), "{depth}");
        assert_eq!(wrapped.node_account_ids(), Some(vec![node(3)]), "{depth}");

        let typed = Transaction::<D>::from_bytes(bytes).expect(depth);
        assert_eq!(typed.data(), first_envelope.data(), "{depth}");
        assert_eq!(typed.memo(), tx.memo(), "{depth}");
        assert_eq!(typed.max_transaction_fee(), tx.max_transaction_fee(), "{depth}");
        assert_eq!(typed.is_signed_by(&key.public_key()), depth != "body", "{depth}");
    }
    assert_eq!(
        transaction::decode(&outer).expect("outer").1.to_bytes().expect("re-encode"),
        outer
    );
}

#[test]
fn account_create_round_trips() {
    let mut tx = AccountCreateTransaction::new();
    tx.set_key(PrivateKey::generate().public_key())
        .expect("key")
        .set_initial_balance(Hbar::new(10))
        .expect("balance")
        .set_account_memo("savings")
        .expect("memo")
        .set_max_automatic_token_associations(10)
        .expect("associations")
        .set_alias([0xAB; 20])
        .expect("alias")
        .set_memo("create")
        .expect("tx memo");
    round_trip(tx);
}

#[test]
fn account_delete_round_trips() {
    let mut tx = AccountDeleteTransaction::new();
    tx.set_account_id(node(1500))
        .expect("account")
        .set_transfer_account_id(OPERATOR)
        .expect("beneficiary");
    round_trip(tx);
}

#[test]
fn allowance_approve_round_trips() {
    let mut tx = AccountAllowanceApproveTransaction::new();
    tx.approve_hbar_allowance(OPERATOR, node(1600), Hbar::new(2))
        .expect("hbar")
        .approve_token_allowance(TokenId::new(0, 0, 800), OPERATOR, node(1600), 500)
        .expect("token");
    round_trip(tx);
}

#[test]
fn allowance_delete_round_trips() {
    let mut tx = AccountAllowanceDeleteTransaction::new();
    tx.delete_all_token_nft_allowances(TokenId::new(0, 0, 900), 1, OPERATOR)
        .expect("first serial")
        .delete_all_token_nft_allowances(TokenId::new(0, 0, 900), 2, OPERATOR)
        .expect("second serial");
    assert_eq!(tx.data().nft_removals().len(), 1);
    round_trip(tx);
}

#[test]
fn file_create_round_trips() {
    let mut tx = FileCreateTransaction::new();
    tx.set_keys(vec![PrivateKey::generate().public_key()])
        .expect("keys")
        .set_contents(b"hello".to_vec())
        .expect("contents")
        .set_file_memo("greeting")
        .expect("memo");
    round_trip(tx);
}

#[test]
fn file_append_round_trips_across_chunks() {
    let mut tx = FileAppendTransaction::new();
    tx.set_file_id(strata_sdk::FileId::new(0, 0, 150))
        .expect("file")
        .set_contents((0..10_000u32).map(|i| i as u8).collect::<Vec<_>>())
        .expect("contents");
    round_trip(tx);
}

#[test]
fn prng_round_trips() {
    let mut ranged = PrngTransaction::new();
    ranged.set_range(100).expect("range");
    round_trip(ranged);
    round_trip(PrngTransaction::new());
}

#[test]
fn schedule_delete_round_trips() {
    let mut tx = ScheduleDeleteTransaction::new();
    tx.set_schedule_id(strata_sdk::ScheduleId::new(0, 0, 444))
        .expect("schedule");
    round_trip(tx);
}

#[test]
fn token_association_round_trips() {
    let mut associate = TokenAssociateTransaction::new();
    associate
        .set_account_id(OPERATOR)
        .expect("account")
        .set_token_ids(vec![TokenId::new(0, 0, 10), TokenId::new(0, 0, 11)])
        .expect("tokens");
    round_trip(associate);

    let mut dissociate = TokenDissociateTransaction::new();
    dissociate
        .set_account_id(OPERATOR)
        .expect("account")
        .set_token_ids(vec![TokenId::new(0, 0, 10)])
        .expect("tokens");
    round_trip(dissociate);
}

#[test]
fn topic_transactions_round_trip() {
    let mut create = TopicCreateTransaction::new();
    create
        .set_topic_memo("news")
        .expect("memo")
        .set_admin_key(PrivateKey::generate().public_key())
        .expect("admin")
        .set_auto_renew_account_id(OPERATOR)
        .expect("renewer");
    round_trip(create);

    let mut delete = TopicDeleteTransaction::new();
    delete.set_topic_id(TopicId::new(0, 0, 77)).expect("topic");
    round_trip(delete);

    let mut submit = TopicMessageSubmitTransaction::new();
    submit
        .set_topic_id(TopicId::new(0, 0, 77))
        .expect("topic")
        .set_message(vec![9u8; 2048 + 17])
        .expect("message");
    round_trip(submit);
}

#[test]
fn transfer_round_trips() {
    let mut tx = transfer();
    tx.add_approved_hbar_transfer(node(2100), Hbar::new(-1))
        .expect("approved debit")
        .add_hbar_transfer(node(2000), Hbar::new(1))
        .expect("merged credit");
    round_trip(tx);
}

#[test]
fn decoding_as_the_wrong_kind_fails() {
    let mut tx = transfer();
    freeze(&mut tx);
    let bytes = tx.to_bytes().expect("bytes");
    assert!(matches!(
        AccountDeleteTransaction::from_bytes(&bytes),
        Err(Error::Decode(_))
    ));
}

#[test]
fn kind_names_match_the_table() {
    let mut tx = transfer();
    freeze(&mut tx);
    let wrapped = WrappedTransaction::from(tx);
    assert_eq!(KINDS[wrapped.kind_index()].name, "Transfer");
    assert_eq!(wrapped.kind_name(), "Transfer");
}
