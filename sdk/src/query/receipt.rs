//! Fetching a transaction's receipt.
//!
//! Receipts are free and stay available for a few minutes after
//! consensus. Until consensus the node answers either `RECEIPT_NOT_FOUND`
//! at precheck or a receipt whose own status is still pending; both are
//! polled, not retried.

use super::{Query, QueryData};
use crate::error::{Error, Result};
use crate::id::TransactionId;
use crate::proto::{self, query::query, response};
use crate::receipt::TransactionReceipt;
use crate::status::{Status, StatusBucket, StatusTable};
use crate::transaction::DecodeError;

pub type TransactionReceiptQuery = Query<TransactionReceiptQueryData>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionReceiptQueryData {
    transaction_id: Option<TransactionId>,
    include_duplicates: bool,
    include_children: bool,
}

impl Query<TransactionReceiptQueryData> {
    pub fn set_transaction_id(&mut self, id: TransactionId) -> &mut Self {
        self.data_mut().transaction_id = Some(id);
        self
    }

    pub fn set_include_duplicates(&mut self, include: bool) -> &mut Self {
        self.data_mut().include_duplicates = include;
        self
    }

    pub fn set_include_children(&mut self, include: bool) -> &mut Self {
        self.data_mut().include_children = include;
        self
    }
}

fn receipt_of(response: &proto::Response) -> Option<&proto::TransactionGetReceiptResponse> {
    match response.response.as_ref()? {
        response::Response::TransactionGetReceipt(r) => Some(r),
        _ => None,
    }
}

impl QueryData for TransactionReceiptQueryData {
    type Output = TransactionReceipt;

    fn method(&self) -> &'static str {
        proto::methods::GET_RECEIPT
    }

    fn is_payment_required(&self) -> bool {
        false
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    fn validate(&self) -> Result<()> {
        if self.transaction_id.is_none() {
            return Err(Error::validation("transaction_id", "a receipt query needs one"));
        }
        Ok(())
    }

    fn to_query(&self, header: proto::QueryHeader) -> Result<proto::Query> {
        Ok(proto::Query {
            query: Some(query::Query::TransactionGetReceipt(
                proto::TransactionGetReceiptQuery {
                    header: Some(header),
                    transaction_id: self.transaction_id.map(TransactionId::to_proto).transpose()?,
                    include_duplicates: self.include_duplicates,
                    include_child_receipts: self.include_children,
                },
            )),
        })
    }

    /// The receipt's own status decides: pending statuses keep polling,
    /// anything else (failures included) is the answer.
    fn classify_answer(
        &self,
        response: &proto::Response,
        table: &StatusTable,
    ) -> Option<(Status, StatusBucket)> {
        let receipt = receipt_of(response)?.receipt.as_ref()?;
        let status = Status::from_code(receipt.status);
        match table.classify_consensus(status) {
            StatusBucket::StillProcessing => Some((status, StatusBucket::StillProcessing)),
            _ => Some((status, StatusBucket::Success)),
        }
    }

    fn make_output(&self, response: proto::Response) -> Result<TransactionReceipt> {
        let receipt = receipt_of(&response)
            .ok_or_else(|| DecodeError::malformed("response", "expected a receipt"))?;
        Ok(TransactionReceipt::from_response(receipt)?)
    }
}
