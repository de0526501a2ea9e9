//! Hbar transfers between accounts.

use super::{account_from_proto, wrong_kind};
use crate::error::{Error, Result};
use crate::hbar::Hbar;
use crate::id::AccountId;
use crate::proto::{self, transaction_body::Data};
use crate::transaction::{ChunkInfo, DecodeError, Transaction, TransactionData};

pub type TransferTransaction = Transaction<TransferTransactionData>;

/// One leg of a transfer. Negative amounts are debits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HbarTransfer {
    pub account_id: AccountId,
    pub amount: Hbar,
    /// The debit is drawn from an allowance the account granted the payer.
    pub is_approval: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferTransactionData {
    hbar_transfers: Vec<HbarTransfer>,
}

impl TransferTransactionData {
    pub fn hbar_transfers(&self) -> &[HbarTransfer] {
        &self.hbar_transfers
    }

    /// Legs for the same account and approval flag are merged.
    fn add(&mut self, account_id: AccountId, amount: Hbar, is_approval: bool) {
        match self
            .hbar_transfers
            .iter_mut()
            .find(|t| t.account_id == account_id && t.is_approval == is_approval)
        {
            Some(existing) => existing.amount = existing.amount + amount,
            None => self.hbar_transfers.push(HbarTransfer {
                account_id,
                amount,
                is_approval,
            }),
        }
    }
}

impl Transaction<TransferTransactionData> {
    pub fn hbar_transfers(&self) -> &[HbarTransfer] {
        self.data().hbar_transfers()
    }

    pub fn add_hbar_transfer(&mut self, account_id: AccountId, amount: Hbar) -> Result<&mut Self> {
        self.data_mut()?.add(account_id, amount, false);
        Ok(self)
    }

    /// Debit `owner` through an allowance it granted to this transaction's
    /// payer. Only debits can be approved.
    pub fn add_approved_hbar_transfer(
        &mut self,
        owner: AccountId,
        amount: Hbar,
    ) -> Result<&mut Self> {
        if !amount.is_negative() {
            return Err(Error::validation(
                "approved transfer",
                "only debits can be drawn from an allowance",
            ));
        }
        self.data_mut()?.add(owner, amount, true);
        Ok(self)
    }
}

impl TransactionData for TransferTransactionData {
    fn method(&self) -> &'static str {
        proto::methods::CRYPTO_TRANSFER
    }

    fn to_body_data(&self, _chunk: Option<&ChunkInfo<'_>>) -> Result<Data> {
        let account_amounts = self
            .hbar_transfers
            .iter()
            .map(|t| {
                Ok(proto::AccountAmount {
                    account_id: Some(t.account_id.to_account_proto()?),
                    amount: t.amount.to_tinybars(),
                    is_approval: t.is_approval,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Data::CryptoTransfer(proto::CryptoTransferTransactionBody {
            transfers: Some(proto::TransferList { account_amounts }),
        }))
    }

    fn from_body_data(data: Data) -> std::result::Result<Self, DecodeError> {
        let Data::CryptoTransfer(body) = data else {
            return Err(wrong_kind("crypto transfer"));
        };
        let mut hbar_transfers = Vec::new();
        for amount in body.transfers.unwrap_or_default().account_amounts {
            let account_id = account_from_proto(amount.account_id.as_ref(), "transfer account")?
                .ok_or_else(|| DecodeError::malformed("transfer account", "missing"))?;
            hbar_transfers.push(HbarTransfer {
                account_id,
                amount: Hbar::from_tinybars(amount.amount),
                is_approval: amount.is_approval,
            });
        }
        Ok(Self { hbar_transfers })
    }
}

