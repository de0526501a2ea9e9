//! Asking the network for a pseudo-random number.
//!
//! With a range the record carries a number in `[0, range)`. Without one it
//! carries 48 random bytes.

use super::wrong_kind;
use crate::error::{Error, Result};
use crate::proto::{self, transaction_body::Data};
use crate::transaction::{ChunkInfo, DecodeError, Transaction, TransactionData};

pub type PrngTransaction = Transaction<PrngTransactionData>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrngTransactionData {
    range: Option<u32>,
}

impl PrngTransactionData {
    pub fn range(&self) -> Option<u32> {
        self.range
    }
}

impl Transaction<PrngTransactionData> {
    pub fn set_range(&mut self, range: u32) -> Result<&mut Self> {
        if range == 0 || i32::try_from(range).is_err() {
            return Err(Error::validation("range", "must be in 1..=i32::MAX"));
        }
        self.data_mut()?.range = Some(range);
        Ok(self)
    }
}

impl TransactionData for PrngTransactionData {
    fn method(&self) -> &'static str {
        proto::methods::PRNG
    }

    fn to_body_data(&self, _chunk: Option<&ChunkInfo<'_>>) -> Result<Data> {
        Ok(Data::UtilPrng(proto::UtilPrngTransactionBody {
            range: self.range.map(|r| r as i32).unwrap_or(0),
        }))
    }

    fn from_body_data(data: Data) -> std::result::Result<Self, DecodeError> {
        let Data::UtilPrng(body) = data else {
            return Err(wrong_kind("prng"));
        };
        let range = match body.range {
            0 => None,
            r => Some(
                u32::try_from(r).map_err(|_| DecodeError::malformed("range", "negative"))?,
            ),
        };
        Ok(Self { range })
    }
}
