//! What a node hands back when it accepts a transaction.
//!
//! Acceptance only means the transaction passed precheck and was passed on
//! to consensus. Whether it succeeded is in the receipt, which this handle
//! knows how to fetch: from the same node that accepted it, since that is
//! the node guaranteed to have seen it.

use std::fmt;

use tracing::debug;

use crate::client::Client;
use crate::crypto::TRANSACTION_HASH_LENGTH;
use crate::error::{Error, Result};
use crate::id::{AccountId, TransactionId};
use crate::query::{TransactionReceiptQuery, TransactionRecordQuery};
use crate::receipt::{TransactionReceipt, TransactionRecord};
use crate::status::{Status, StatusBucket};

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TransactionResponse {
    /// The node that accepted the transaction.
    pub node_id: AccountId,
    pub transaction_id: TransactionId,
    /// SHA-384 of the signed transaction as submitted to `node_id`.
    pub transaction_hash: [u8; TRANSACTION_HASH_LENGTH],
    pub precheck_status: Status,
}

impl TransactionResponse {
    /// A receipt query aimed at the accepting node.
    pub fn get_receipt_query(&self) -> TransactionReceiptQuery {
        let mut query = TransactionReceiptQuery::new();
        query.set_transaction_id(self.transaction_id);
        query.restrict_to(self.node_id);
        query
    }

    /// A record query aimed at the accepting node.
    pub fn get_record_query(&self) -> TransactionRecordQuery {
        let mut query = TransactionRecordQuery::new();
        query.set_transaction_id(self.transaction_id);
        query.restrict_to(self.node_id);
        query
    }

    /// Wait for consensus and return the receipt.
    ///
    /// A receipt whose status the client's table calls a terminal failure
    /// becomes [`Error::ReceiptStatus`].
    pub async fn get_receipt(&self, client: &Client) -> Result<TransactionReceipt> {
        let receipt = self.get_receipt_query().execute(client).await?;
        debug!(
            transaction_id = %self.transaction_id,
            status = %receipt.status,
            "receipt resolved"
        );
        if client.status_table().classify_consensus(receipt.status) == StatusBucket::TerminalFailure
        {
            return Err(Error::ReceiptStatus {
                status: receipt.status,
                transaction_id: self.transaction_id,
            });
        }
        Ok(receipt)
    }

    /// Wait for consensus and return the record. The receipt is checked
    /// first, so a failed transaction is never paid for twice.
    pub async fn get_record(&self, client: &Client) -> Result<TransactionRecord> {
        self.get_receipt(client).await?;
        self.get_record_query().execute(client).await
    }
}

impl fmt::Debug for TransactionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionResponse")
            .field("node_id", &self.node_id)
            .field("transaction_id", &self.transaction_id)
            .field("transaction_hash", &hex::encode(self.transaction_hash))
            .field("precheck_status", &self.precheck_status)
            .finish()
    }
}
