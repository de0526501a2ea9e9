//! # Ledger State
//!
//! The in-memory world the simulated nodes agree on: accounts, files,
//! topics, and the outcome of every transaction that reached consensus.
//!
//! ## Design
//!
//! - `DashMap` per entity kind, so queries from many client tasks never
//!   contend with each other.
//! - Consensus itself is sequential. A single `parking_lot::Mutex` is held
//!   for the whole of `apply`, which makes multi-account effects (a transfer
//!   touching five balances) atomic without per-entry locking gymnastics.
//! - Effects are computed first and committed only when every check has
//!   passed. A failed transaction still pays its fee and still gets a
//!   receipt, carrying the failure status.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use strata_sdk::crypto::sha384;
use strata_sdk::proto::{self, transaction_body::Data, transaction_record::Entropy};
use strata_sdk::{AccountId, FileId, Hbar, PublicKey, Status, TokenId, TopicId, TransactionId};

/// Entity numbers below this are reserved for nodes and system accounts.
const FIRST_USER_ENTITY: u64 = 1001;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimError {
    #[error("account {0} does not exist")]
    UnknownAccount(AccountId),

    #[error("account {0} already exists")]
    AccountExists(AccountId),
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Account {
    pub key: Option<PublicKey>,
    /// Tinybars.
    pub balance: i64,
    pub deleted: bool,
    /// Hbar allowances this account granted, by spender, in tinybars.
    pub allowances: HashMap<AccountId, i64>,
    pub tokens: BTreeSet<TokenId>,
    pub memo: String,
}

#[derive(Debug, Clone, Default)]
pub struct File {
    pub keys: Vec<PublicKey>,
    pub contents: Vec<u8>,
    pub memo: String,
}

#[derive(Debug, Clone, Default)]
pub struct Topic {
    pub memo: String,
    pub admin_key: Option<PublicKey>,
    pub submit_key: Option<PublicKey>,
    pub sequence_number: u64,
    pub running_hash: Vec<u8>,
    pub messages: Vec<Vec<u8>>,
}

/// What consensus made of one transaction.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub receipt: proto::TransactionReceipt,
    pub record: proto::TransactionRecord,
}

impl Outcome {
    pub fn status(&self) -> Status {
        Status::from_code(self.receipt.status)
    }
}

/// A transaction that passed precheck, ready for consensus.
#[derive(Debug, Clone)]
pub struct Submission {
    pub transaction_id: TransactionId,
    pub node: AccountId,
    pub body: proto::TransactionBody,
    pub signers: HashSet<PublicKey>,
    pub transaction_hash: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Ledger {
    accounts: DashMap<AccountId, Account>,
    files: DashMap<FileId, File>,
    topics: DashMap<TopicId, Topic>,
    outcomes: DashMap<TransactionId, Outcome>,
    next_entity: AtomicU64,
    last_consensus_nanos: AtomicI64,
    /// Flat fee charged for every transaction, in tinybars.
    transaction_fee: i64,
    consensus: Mutex<()>,
}

/// Balance deltas staged by one transaction, applied all at once.
#[derive(Debug, Default)]
struct Staged {
    deltas: Vec<(AccountId, i64)>,
    allowance_spends: Vec<(AccountId, AccountId, i64)>,
}

impl Staged {
    fn credit(&mut self, account: AccountId, amount: i64) {
        match self.deltas.iter_mut().find(|(id, _)| *id == account) {
            Some((_, delta)) => *delta += amount,
            None => self.deltas.push((account, amount)),
        }
    }
}

impl Ledger {
    pub fn new(transaction_fee: Hbar) -> Self {
        Self {
            accounts: DashMap::new(),
            files: DashMap::new(),
            topics: DashMap::new(),
            outcomes: DashMap::new(),
            next_entity: AtomicU64::new(FIRST_USER_ENTITY),
            last_consensus_nanos: AtomicI64::new(0),
            transaction_fee: transaction_fee.to_tinybars(),
            consensus: Mutex::new(()),
        }
    }

    pub fn transaction_fee(&self) -> Hbar {
        Hbar::from_tinybars(self.transaction_fee)
    }

    // -----------------------------------------------------------------------
    // Genesis and inspection
    // -----------------------------------------------------------------------

    /// Create an account outside of consensus, for test setup.
    pub fn create_genesis_account(
        &self,
        id: AccountId,
        key: Option<PublicKey>,
        balance: Hbar,
    ) -> Result<(), SimError> {
        if self.accounts.contains_key(&id) {
            return Err(SimError::AccountExists(id));
        }
        if let Some(num) = id.num() {
            // Keep consensus-created entities clear of genesis ones.
            self.next_entity.fetch_max(num + 1, Ordering::Relaxed);
        }
        self.accounts.insert(
            id,
            Account {
                key,
                balance: balance.to_tinybars(),
                ..Account::default()
            },
        );
        Ok(())
    }

    pub fn account(&self, id: &AccountId) -> Option<Account> {
        self.accounts.get(id).map(|a| a.clone())
    }

    pub fn balance(&self, id: &AccountId) -> Option<Hbar> {
        self.accounts
            .get(id)
            .filter(|a| !a.deleted)
            .map(|a| Hbar::from_tinybars(a.balance))
    }

    pub fn fund(&self, id: &AccountId, amount: Hbar) -> Result<(), SimError> {
        let mut account = self
            .accounts
            .get_mut(id)
            .ok_or(SimError::UnknownAccount(*id))?;
        account.balance += amount.to_tinybars();
        Ok(())
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Hbar {
        Hbar::from_tinybars(
            self.accounts
                .get(owner)
                .and_then(|a| a.allowances.get(spender).copied())
                .unwrap_or(0),
        )
    }

    pub fn file(&self, id: &FileId) -> Option<File> {
        self.files.get(id).map(|f| f.clone())
    }

    pub fn topic(&self, id: &TopicId) -> Option<Topic> {
        self.topics.get(id).map(|t| t.clone())
    }

    pub fn outcome(&self, id: &TransactionId) -> Option<Outcome> {
        self.outcomes.get(id).map(|o| o.clone())
    }

    pub fn has_outcome(&self, id: &TransactionId) -> bool {
        self.outcomes.contains_key(id)
    }

    /// Whether `key` controls `account`.
    pub fn is_controlled_by(&self, account: &AccountId, key: &PublicKey) -> bool {
        self.accounts
            .get(account)
            .and_then(|a| a.key)
            .map_or(false, |k| k == *key)
    }

    // -----------------------------------------------------------------------
    // Consensus
    // -----------------------------------------------------------------------

    /// Run one transaction through consensus and remember the outcome.
    pub fn apply(&self, submission: Submission) -> Outcome {
        let _consensus = self.consensus.lock();
        let payer = submission.transaction_id.account_id;
        let consensus_nanos = self.next_consensus_nanos();

        let mut receipt = proto::TransactionReceipt::default();
        let mut staged = Staged::default();
        let mut entropy = None;

        let fee = self.transaction_fee;
        let status = match self.accounts.get(&payer).map(|a| (a.balance, a.deleted)) {
            None => Status::PayerAccountNotFound,
            Some((_, true)) => Status::AccountDeleted,
            Some((balance, _)) if balance < fee => Status::InsufficientPayerBalance,
            Some(_) => {
                staged.credit(payer, -fee);
                staged.credit(submission.node, fee);
                match self.execute(&submission, &mut staged, &mut receipt, &mut entropy) {
                    Ok(()) => Status::Success,
                    Err(status) => {
                        // Only the fee survives a failure.
                        staged = Staged::default();
                        staged.credit(payer, -fee);
                        staged.credit(submission.node, fee);
                        receipt = proto::TransactionReceipt::default();
                        entropy = None;
                        status
                    }
                }
            }
        };
        self.commit(&staged);
        receipt.status = status.code();

        let record = proto::TransactionRecord {
            receipt: Some(receipt.clone()),
            transaction_hash: submission.transaction_hash.clone(),
            consensus_timestamp: Some(proto::Timestamp {
                seconds: consensus_nanos.div_euclid(1_000_000_000),
                nanos: consensus_nanos.rem_euclid(1_000_000_000) as i32,
            }),
            transaction_id: submission.transaction_id.to_proto().ok(),
            memo: submission.body.memo.clone(),
            transaction_fee: fee as u64,
            transfer_list: Some(proto::TransferList {
                account_amounts: staged
                    .deltas
                    .iter()
                    .filter(|(_, amount)| *amount != 0)
                    .map(|(id, amount)| proto::AccountAmount {
                        account_id: id.to_account_proto().ok(),
                        amount: *amount,
                        is_approval: false,
                    })
                    .collect(),
            }),
            entropy,
        };

        info!(
            transaction_id = %submission.transaction_id,
            node = %submission.node,
            %status,
            "reached consensus"
        );
        let outcome = Outcome { receipt, record };
        self.outcomes
            .insert(submission.transaction_id, outcome.clone());
        outcome
    }

    fn next_consensus_nanos(&self) -> i64 {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX - 1);
        let mut previous = self.last_consensus_nanos.load(Ordering::Relaxed);
        loop {
            let next = now.max(previous + 1);
            match self.last_consensus_nanos.compare_exchange_weak(
                previous,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => previous = actual,
            }
        }
    }

    fn next_entity(&self) -> u64 {
        self.next_entity.fetch_add(1, Ordering::Relaxed)
    }

    fn commit(&self, staged: &Staged) {
        for (id, delta) in &staged.deltas {
            if let Some(mut account) = self.accounts.get_mut(id) {
                account.balance += delta;
            }
        }
        for (owner, spender, amount) in &staged.allowance_spends {
            if let Some(mut account) = self.accounts.get_mut(owner) {
                if let Some(remaining) = account.allowances.get_mut(spender) {
                    *remaining -= amount;
                }
            }
        }
    }

    fn require_live(&self, id: &AccountId) -> Result<(), Status> {
        match self.accounts.get(id) {
            None => Err(Status::InvalidAccountId),
            Some(a) if a.deleted => Err(Status::AccountDeleted),
            Some(_) => Ok(()),
        }
    }

    fn require_signed_by_account(
        &self,
        id: &AccountId,
        signers: &HashSet<PublicKey>,
    ) -> Result<(), Status> {
        match self.accounts.get(id).and_then(|a| a.key) {
            Some(key) if signers.contains(&key) => Ok(()),
            Some(_) => Err(Status::InvalidSignature),
            None => Err(Status::KeyRequired),
        }
    }

    /// Stage the effects of the body's `data`. Errors leave `staged` to be
    /// thrown away by the caller.
    fn execute(
        &self,
        submission: &Submission,
        staged: &mut Staged,
        receipt: &mut proto::TransactionReceipt,
        entropy: &mut Option<Entropy>,
    ) -> Result<(), Status> {
        let payer = submission.transaction_id.account_id;
        let signers = &submission.signers;
        let data = submission
            .body
            .data
            .as_ref()
            .ok_or(Status::InvalidTransactionBody)?;

        match data {
            Data::CryptoTransfer(body) => {
                let legs = body.transfers.clone().unwrap_or_default().account_amounts;
                if legs.iter().map(|l| l.amount).sum::<i64>() != 0 {
                    return Err(Status::InvalidAccountAmounts);
                }
                let mut seen = HashSet::new();
                for leg in &legs {
                    let account = account_id(leg.account_id.as_ref())?;
                    if !seen.insert((account, leg.is_approval)) {
                        return Err(Status::AccountRepeatedInAccountAmounts);
                    }
                    self.require_live(&account)?;
                    if leg.amount < 0 {
                        if leg.is_approval {
                            let granted = self
                                .accounts
                                .get(&account)
                                .and_then(|a| a.allowances.get(&payer).copied())
                                .ok_or(Status::SpenderDoesNotHaveAllowance)?;
                            if granted < -leg.amount {
                                return Err(Status::AmountExceedsAllowance);
                            }
                            staged.allowance_spends.push((account, payer, -leg.amount));
                        } else {
                            self.require_signed_by_account(&account, signers)?;
                        }
                    }
                    staged.credit(account, leg.amount);
                }
                self.check_balances(staged)
            }

            Data::CryptoCreateAccount(body) => {
                let key = body
                    .key
                    .as_ref()
                    .map(PublicKey::from_key_proto)
                    .transpose()
                    .map_err(|_| Status::InvalidKeyEncoding)?
                    .ok_or(Status::KeyRequired)?;
                let initial = i64::try_from(body.initial_balance)
                    .map_err(|_| Status::InvalidInitialBalance)?;
                staged.credit(payer, -initial);
                self.check_balances(staged)?;

                let id = AccountId::new(0, 0, self.next_entity());
                self.accounts.insert(
                    id,
                    Account {
                        key: Some(key),
                        memo: body.memo.clone(),
                        ..Account::default()
                    },
                );
                staged.credit(id, initial);
                receipt.account_id = id.to_account_proto().ok();
                debug!(account = %id, "account created");
                Ok(())
            }

            Data::CryptoDelete(body) => {
                let target = account_id(body.delete_account_id.as_ref())?;
                let beneficiary = account_id(body.transfer_account_id.as_ref())?;
                self.require_live(&target)?;
                self.require_live(&beneficiary)?;
                self.require_signed_by_account(&target, signers)?;
                let balance = self.accounts.get(&target).map_or(0, |a| a.balance);
                let pending: i64 = staged
                    .deltas
                    .iter()
                    .filter(|(id, _)| *id == target)
                    .map(|(_, d)| *d)
                    .sum();
                staged.credit(target, -(balance + pending));
                staged.credit(beneficiary, balance + pending);
                if let Some(mut account) = self.accounts.get_mut(&target) {
                    account.deleted = true;
                }
                Ok(())
            }

            Data::CryptoApproveAllowance(body) => {
                if body.crypto_allowances.is_empty() && body.token_allowances.is_empty() {
                    return Err(Status::EmptyAllowances);
                }
                let mut grants = Vec::with_capacity(body.crypto_allowances.len());
                for allowance in &body.crypto_allowances {
                    let owner = match &allowance.owner {
                        Some(owner) => account_id(Some(owner))
                            .map_err(|_| Status::InvalidAllowanceOwnerId)?,
                        None => payer,
                    };
                    let spender = account_id(allowance.spender.as_ref())
                        .map_err(|_| Status::InvalidAllowanceSpenderId)?;
                    if allowance.amount < 0 {
                        return Err(Status::NegativeAllowanceAmount);
                    }
                    self.require_live(&owner)
                        .map_err(|_| Status::InvalidAllowanceOwnerId)?;
                    if owner != payer {
                        self.require_signed_by_account(&owner, signers)?;
                    }
                    grants.push((owner, spender, allowance.amount));
                }
                for (owner, spender, amount) in grants {
                    if let Some(mut account) = self.accounts.get_mut(&owner) {
                        if amount == 0 {
                            account.allowances.remove(&spender);
                        } else {
                            account.allowances.insert(spender, amount);
                        }
                    }
                }
                Ok(())
            }

            Data::CryptoDeleteAllowance(body) => {
                if body.nft_allowances.is_empty() {
                    return Err(Status::EmptyAllowances);
                }
                Ok(())
            }

            Data::FileCreate(body) => {
                let keys = body
                    .keys
                    .as_ref()
                    .map(|list| {
                        list.keys
                            .iter()
                            .map(PublicKey::from_key_proto)
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .transpose()
                    .map_err(|_| Status::InvalidKeyEncoding)?
                    .unwrap_or_default();
                let id = FileId::new(0, 0, self.next_entity());
                self.files.insert(
                    id,
                    File {
                        keys,
                        contents: body.contents.clone(),
                        memo: body.memo.clone(),
                    },
                );
                receipt.file_id = id.to_num_proto().ok();
                Ok(())
            }

            Data::FileAppend(body) => {
                let id = entity_id(body.file_id.as_ref(), Status::InvalidFileId)?;
                let mut file = self.files.get_mut(&id).ok_or(Status::InvalidFileId)?;
                if !file.keys.iter().all(|k| signers.contains(k)) {
                    return Err(Status::InvalidSignature);
                }
                if body.contents.is_empty() {
                    return Err(Status::FileContentEmpty);
                }
                file.contents.extend_from_slice(&body.contents);
                Ok(())
            }

            Data::ConsensusCreateTopic(body) => {
                let key = |k: &Option<proto::Key>| {
                    k.as_ref()
                        .map(PublicKey::from_key_proto)
                        .transpose()
                        .map_err(|_| Status::InvalidKeyEncoding)
                };
                let topic = Topic {
                    memo: body.memo.clone(),
                    admin_key: key(&body.admin_key)?,
                    submit_key: key(&body.submit_key)?,
                    ..Topic::default()
                };
                if let Some(admin) = &topic.admin_key {
                    if !signers.contains(admin) {
                        return Err(Status::InvalidSignature);
                    }
                }
                let id = TopicId::new(0, 0, self.next_entity());
                self.topics.insert(id, topic);
                receipt.topic_id = id.to_num_proto().ok();
                Ok(())
            }

            Data::ConsensusDeleteTopic(body) => {
                let id = entity_id(body.topic_id.as_ref(), Status::InvalidTopicId)?;
                let admin = self
                    .topics
                    .get(&id)
                    .ok_or(Status::InvalidTopicId)?
                    .admin_key;
                match admin {
                    Some(key) if signers.contains(&key) => {}
                    Some(_) => return Err(Status::InvalidSignature),
                    None => return Err(Status::AuthorizationFailed),
                }
                self.topics.remove(&id);
                Ok(())
            }

            Data::ConsensusSubmitMessage(body) => {
                let id = entity_id(body.topic_id.as_ref(), Status::InvalidTopicId)?;
                let mut topic = self.topics.get_mut(&id).ok_or(Status::InvalidTopicId)?;
                if let Some(key) = &topic.submit_key {
                    if !signers.contains(key) {
                        return Err(Status::InvalidSignature);
                    }
                }
                let mut preimage = topic.running_hash.clone();
                preimage.extend_from_slice(&body.message);
                topic.running_hash = sha384(&preimage).to_vec();
                topic.sequence_number += 1;
                topic.messages.push(body.message.clone());
                receipt.topic_sequence_number = topic.sequence_number;
                receipt.topic_running_hash = topic.running_hash.clone();
                Ok(())
            }

            Data::TokenAssociate(body) => {
                let (account, tokens) =
                    self.token_relation(body.account.as_ref(), &body.tokens, signers)?;
                let mut entry = self
                    .accounts
                    .get_mut(&account)
                    .ok_or(Status::InvalidAccountId)?;
                if tokens.iter().any(|t| entry.tokens.contains(t)) {
                    return Err(Status::TokenAlreadyAssociatedToAccount);
                }
                entry.tokens.extend(tokens);
                Ok(())
            }

            Data::TokenDissociate(body) => {
                let (account, tokens) =
                    self.token_relation(body.account.as_ref(), &body.tokens, signers)?;
                let mut entry = self
                    .accounts
                    .get_mut(&account)
                    .ok_or(Status::InvalidAccountId)?;
                if !tokens.iter().all(|t| entry.tokens.contains(t)) {
                    return Err(Status::TokenNotAssociatedToAccount);
                }
                for token in &tokens {
                    entry.tokens.remove(token);
                }
                Ok(())
            }

            // Nothing is ever scheduled here.
            Data::ScheduleDelete(_) => Err(Status::InvalidScheduleId),

            Data::UtilPrng(body) => {
                let seed = sha384(&submission.transaction_hash);
                *entropy = Some(if body.range > 0 {
                    let mut word = [0u8; 8];
                    word.copy_from_slice(&seed[..8]);
                    let value = u64::from_be_bytes(word) % body.range as u64;
                    Entropy::PrngNumber(value as i32)
                } else {
                    Entropy::PrngBytes(seed.to_vec())
                });
                Ok(())
            }
        }
    }

    fn token_relation(
        &self,
        account: Option<&proto::AccountId>,
        tokens: &[proto::EntityNum],
        signers: &HashSet<PublicKey>,
    ) -> Result<(AccountId, Vec<TokenId>), Status> {
        let account = account_id(account)?;
        self.require_live(&account)?;
        self.require_signed_by_account(&account, signers)?;
        let tokens = tokens
            .iter()
            .map(|t| entity_id(Some(t), Status::InvalidTokenId))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((account, tokens))
    }

    fn check_balances(&self, staged: &Staged) -> Result<(), Status> {
        for (id, delta) in &staged.deltas {
            let balance = self.accounts.get(id).map_or(0, |a| a.balance);
            if balance + delta < 0 {
                return Err(Status::InsufficientAccountBalance);
            }
        }
        Ok(())
    }
}

fn account_id(id: Option<&proto::AccountId>) -> Result<AccountId, Status> {
    id.ok_or(Status::InvalidAccountId)
        .and_then(|id| AccountId::from_account_proto(id).map_err(|_| Status::InvalidAccountId))
}

fn entity_id(
    id: Option<&proto::EntityNum>,
    invalid: Status,
) -> Result<strata_sdk::EntityId, Status> {
    id.ok_or(invalid)
        .and_then(|id| strata_sdk::EntityId::from_num_proto(id).map_err(|_| invalid))
}
