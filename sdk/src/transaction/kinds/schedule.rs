//! Deleting a scheduled transaction before it executes.

use super::{entity_from_proto, entity_to_proto, wrong_kind};
use crate::error::Result;
use crate::hbar::Hbar;
use crate::id::ScheduleId;
use crate::proto::{self, transaction_body::Data};
use crate::transaction::{ChunkInfo, DecodeError, Transaction, TransactionData};

pub type ScheduleDeleteTransaction = Transaction<ScheduleDeleteTransactionData>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleDeleteTransactionData {
    schedule_id: Option<ScheduleId>,
}

impl ScheduleDeleteTransactionData {
    pub fn schedule_id(&self) -> Option<ScheduleId> {
        self.schedule_id
    }
}

impl Transaction<ScheduleDeleteTransactionData> {
    pub fn set_schedule_id(&mut self, id: ScheduleId) -> Result<&mut Self> {
        id.require_num("schedule_id")?;
        self.data_mut()?.schedule_id = Some(id);
        Ok(self)
    }
}

impl TransactionData for ScheduleDeleteTransactionData {
    fn method(&self) -> &'static str {
        proto::methods::DELETE_SCHEDULE
    }

    fn default_max_transaction_fee(&self) -> Hbar {
        Hbar::new(5)
    }

    fn to_body_data(&self, _chunk: Option<&ChunkInfo<'_>>) -> Result<Data> {
        Ok(Data::ScheduleDelete(proto::ScheduleDeleteTransactionBody {
            schedule_id: entity_to_proto(self.schedule_id)?,
        }))
    }

    fn from_body_data(data: Data) -> std::result::Result<Self, DecodeError> {
        let Data::ScheduleDelete(body) = data else {
            return Err(wrong_kind("schedule delete"));
        };
        Ok(Self {
            schedule_id: entity_from_proto(body.schedule_id.as_ref(), "schedule_id")?,
        })
    }
}
