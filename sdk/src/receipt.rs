//! Receipts and records: what consensus decided about a transaction.
//!
//! A receipt is small and free to fetch: the final status plus whatever
//! entity the transaction created. A record is the full accounting (fee
//! charged, transfers made, random output) and costs a query payment.

use chrono::{DateTime, Utc};

use crate::crypto::TRANSACTION_HASH_LENGTH;
use crate::error::{Error, Result};
use crate::hbar::Hbar;
use crate::id::transaction_id::timestamp_from_proto;
use crate::id::{AccountId, EntityId, FileId, ScheduleId, TokenId, TopicId, TransactionId};
use crate::proto;
use crate::status::Status;
use crate::transaction::{DecodeError, HbarTransfer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub status: Status,
    pub account_id: Option<AccountId>,
    pub file_id: Option<FileId>,
    pub topic_id: Option<TopicId>,
    pub topic_sequence_number: u64,
    pub topic_running_hash: Option<Vec<u8>>,
    pub token_id: Option<TokenId>,
    pub schedule_id: Option<ScheduleId>,
    pub scheduled_transaction_id: Option<TransactionId>,
    pub serial_numbers: Vec<i64>,
    /// Receipts of duplicate submissions, when asked for.
    pub duplicates: Vec<TransactionReceipt>,
    /// Receipts of child transactions, when asked for.
    pub children: Vec<TransactionReceipt>,
}

impl TransactionReceipt {
    /// Fail with [`Error::ReceiptStatus`] unless the status is `SUCCESS`.
    pub fn validate_status(&self, transaction_id: TransactionId) -> Result<&Self> {
        if self.status != Status::Success {
            return Err(Error::ReceiptStatus {
                status: self.status,
                transaction_id,
            });
        }
        Ok(self)
    }

    pub(crate) fn from_proto(
        receipt: &proto::TransactionReceipt,
    ) -> std::result::Result<Self, DecodeError> {
        let num = |id: &Option<proto::EntityNum>, field: &'static str| {
            id.as_ref()
                .map(EntityId::from_num_proto)
                .transpose()
                .map_err(|e| DecodeError::malformed(field, e.to_string()))
        };
        Ok(Self {
            status: Status::from_code(receipt.status),
            account_id: receipt
                .account_id
                .as_ref()
                .map(AccountId::from_account_proto)
                .transpose()
                .map_err(|e| DecodeError::malformed("receipt account_id", e.to_string()))?,
            file_id: num(&receipt.file_id, "receipt file_id")?,
            topic_id: num(&receipt.topic_id, "receipt topic_id")?,
            topic_sequence_number: receipt.topic_sequence_number,
            topic_running_hash: (!receipt.topic_running_hash.is_empty())
                .then(|| receipt.topic_running_hash.clone()),
            token_id: num(&receipt.token_id, "receipt token_id")?,
            schedule_id: num(&receipt.schedule_id, "receipt schedule_id")?,
            scheduled_transaction_id: receipt
                .scheduled_transaction_id
                .as_ref()
                .map(TransactionId::from_proto)
                .transpose()
                .map_err(|e| DecodeError::malformed("scheduled_transaction_id", e.to_string()))?,
            serial_numbers: receipt.serial_numbers.clone(),
            duplicates: Vec::new(),
            children: Vec::new(),
        })
    }

    pub(crate) fn from_response(
        response: &proto::TransactionGetReceiptResponse,
    ) -> std::result::Result<Self, DecodeError> {
        let receipt = response
            .receipt
            .as_ref()
            .ok_or_else(|| DecodeError::malformed("receipt", "missing from response"))?;
        let mut out = Self::from_proto(receipt)?;
        out.duplicates = response
            .duplicate_transaction_receipts
            .iter()
            .map(Self::from_proto)
            .collect::<std::result::Result<_, _>>()?;
        out.children = response
            .child_transaction_receipts
            .iter()
            .map(Self::from_proto)
            .collect::<std::result::Result<_, _>>()?;
        Ok(out)
    }
}

/// Random output of a PRNG transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrngOutput {
    Bytes(Vec<u8>),
    Number(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub receipt: TransactionReceipt,
    pub transaction_hash: Vec<u8>,
    pub consensus_timestamp: Option<DateTime<Utc>>,
    pub transaction_id: Option<TransactionId>,
    pub memo: String,
    pub transaction_fee: Hbar,
    pub transfers: Vec<HbarTransfer>,
    pub prng: Option<PrngOutput>,
}

impl TransactionRecord {
    pub(crate) fn from_proto(
        record: &proto::TransactionRecord,
    ) -> std::result::Result<Self, DecodeError> {
        let receipt = record
            .receipt
            .as_ref()
            .ok_or_else(|| DecodeError::malformed("record receipt", "missing"))?;
        if !record.transaction_hash.is_empty()
            && record.transaction_hash.len() != TRANSACTION_HASH_LENGTH
        {
            return Err(DecodeError::malformed(
                "transaction_hash",
                format!("{} bytes", record.transaction_hash.len()),
            ));
        }

        let mut transfers = Vec::new();
        if let Some(list) = &record.transfer_list {
            for amount in &list.account_amounts {
                let account_id = amount
                    .account_id
                    .as_ref()
                    .map(AccountId::from_account_proto)
                    .transpose()
                    .map_err(|e| DecodeError::malformed("record transfer", e.to_string()))?
                    .ok_or_else(|| DecodeError::malformed("record transfer", "missing account"))?;
                transfers.push(HbarTransfer {
                    account_id,
                    amount: Hbar::from_tinybars(amount.amount),
                    is_approval: amount.is_approval,
                });
            }
        }

        Ok(Self {
            receipt: TransactionReceipt::from_proto(receipt)?,
            transaction_hash: record.transaction_hash.clone(),
            consensus_timestamp: record
                .consensus_timestamp
                .as_ref()
                .map(timestamp_from_proto)
                .transpose()
                .map_err(|e| DecodeError::malformed("consensus_timestamp", e.to_string()))?,
            transaction_id: record
                .transaction_id
                .as_ref()
                .map(TransactionId::from_proto)
                .transpose()
                .map_err(|e| DecodeError::malformed("record transaction_id", e.to_string()))?,
            memo: record.memo.clone(),
            transaction_fee: Hbar::from_tinybars(
                i64::try_from(record.transaction_fee).unwrap_or(i64::MAX),
            ),
            transfers,
            prng: record.entropy.as_ref().map(|e| match e {
                proto::transaction_record::Entropy::PrngBytes(b) => PrngOutput::Bytes(b.clone()),
                proto::transaction_record::Entropy::PrngNumber(n) => PrngOutput::Number(*n),
            }),
        })
    }
}
