//! Fetching a transaction's record. Paid.

use super::{Query, QueryData};
use crate::error::{Error, Result};
use crate::id::TransactionId;
use crate::proto::{self, query::query, response};
use crate::receipt::TransactionRecord;
use crate::status::{Status, StatusBucket, StatusTable};
use crate::transaction::DecodeError;

pub type TransactionRecordQuery = Query<TransactionRecordQueryData>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionRecordQueryData {
    transaction_id: Option<TransactionId>,
    include_duplicates: bool,
}

impl Query<TransactionRecordQueryData> {
    pub fn set_transaction_id(&mut self, id: TransactionId) -> &mut Self {
        self.data_mut().transaction_id = Some(id);
        self
    }

    pub fn set_include_duplicates(&mut self, include: bool) -> &mut Self {
        self.data_mut().include_duplicates = include;
        self
    }
}

fn record_of(response: &proto::Response) -> Option<&proto::TransactionRecord> {
    match response.response.as_ref()? {
        response::Response::TransactionGetRecord(r) => r.transaction_record.as_ref(),
        _ => None,
    }
}

impl QueryData for TransactionRecordQueryData {
    type Output = TransactionRecord;

    fn method(&self) -> &'static str {
        proto::methods::GET_RECORD
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    fn validate(&self) -> Result<()> {
        if self.transaction_id.is_none() {
            return Err(Error::validation("transaction_id", "a record query needs one"));
        }
        Ok(())
    }

    fn to_query(&self, header: proto::QueryHeader) -> Result<proto::Query> {
        Ok(proto::Query {
            query: Some(query::Query::TransactionGetRecord(
                proto::TransactionGetRecordQuery {
                    header: Some(header),
                    transaction_id: self.transaction_id.map(TransactionId::to_proto).transpose()?,
                    include_duplicates: self.include_duplicates,
                    include_child_records: false,
                },
            )),
        })
    }

    fn classify_answer(
        &self,
        response: &proto::Response,
        table: &StatusTable,
    ) -> Option<(Status, StatusBucket)> {
        let receipt = record_of(response)?.receipt.as_ref()?;
        let status = Status::from_code(receipt.status);
        match table.classify_consensus(status) {
            StatusBucket::StillProcessing => Some((status, StatusBucket::StillProcessing)),
            _ => Some((status, StatusBucket::Success)),
        }
    }

    fn make_output(&self, response: proto::Response) -> Result<TransactionRecord> {
        let record = record_of(&response)
            .ok_or_else(|| DecodeError::malformed("response", "expected a record"))?;
        Ok(TransactionRecord::from_proto(record)?)
    }
}
