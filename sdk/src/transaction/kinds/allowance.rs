//! Granting and revoking spending allowances.
//!
//! An allowance lets a spender move an owner's funds without the owner
//! signing each transfer. Approval covers hbar and fungible tokens; deletion
//! here covers NFT serials, which is the only kind of allowance that is
//! removed rather than overwritten with zero.

use super::{account_from_proto, account_to_proto, entity_from_proto, wrong_kind};
use crate::error::{Error, Result};
use crate::hbar::Hbar;
use crate::id::{AccountId, TokenId};
use crate::proto::{self, transaction_body::Data};
use crate::transaction::{ChunkInfo, DecodeError, Transaction, TransactionData};

pub type AccountAllowanceApproveTransaction = Transaction<AccountAllowanceApproveTransactionData>;
pub type AccountAllowanceDeleteTransaction = Transaction<AccountAllowanceDeleteTransactionData>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HbarAllowance {
    /// `None` means the transaction's payer.
    pub owner: Option<AccountId>,
    pub spender: AccountId,
    pub amount: Hbar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAllowance {
    pub token_id: TokenId,
    pub owner: Option<AccountId>,
    pub spender: AccountId,
    pub amount: u64,
}

/// Revokes every allowance on the listed serials of one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftAllowanceRemoval {
    pub token_id: TokenId,
    pub owner: Option<AccountId>,
    pub serials: Vec<i64>,
}

fn required_account(
    id: Option<&proto::AccountId>,
    field: &'static str,
) -> std::result::Result<AccountId, DecodeError> {
    account_from_proto(id, field)?.ok_or_else(|| DecodeError::malformed(field, "missing"))
}

fn required_token(
    id: Option<&proto::TokenId>,
    field: &'static str,
) -> std::result::Result<TokenId, DecodeError> {
    entity_from_proto(id, field)?.ok_or_else(|| DecodeError::malformed(field, "missing"))
}

// ---------------------------------------------------------------------------
// Approve
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountAllowanceApproveTransactionData {
    hbar_approvals: Vec<HbarAllowance>,
    token_approvals: Vec<TokenAllowance>,
}

impl AccountAllowanceApproveTransactionData {
    pub fn hbar_approvals(&self) -> &[HbarAllowance] {
        &self.hbar_approvals
    }

    pub fn token_approvals(&self) -> &[TokenAllowance] {
        &self.token_approvals
    }
}

impl Transaction<AccountAllowanceApproveTransactionData> {
    /// Let `spender` spend up to `amount` of `owner`'s hbar. Approving zero
    /// removes an existing allowance.
    pub fn approve_hbar_allowance(
        &mut self,
        owner: AccountId,
        spender: AccountId,
        amount: Hbar,
    ) -> Result<&mut Self> {
        if amount.is_negative() {
            return Err(Error::validation("allowance amount", "must not be negative"));
        }
        self.data_mut()?.hbar_approvals.push(HbarAllowance {
            owner: Some(owner),
            spender,
            amount,
        });
        Ok(self)
    }

    pub fn approve_token_allowance(
        &mut self,
        token_id: TokenId,
        owner: AccountId,
        spender: AccountId,
        amount: u64,
    ) -> Result<&mut Self> {
        token_id.require_num("token_id")?;
        if i64::try_from(amount).is_err() {
            return Err(Error::validation("allowance amount", "exceeds i64::MAX"));
        }
        self.data_mut()?.token_approvals.push(TokenAllowance {
            token_id,
            owner: Some(owner),
            spender,
            amount,
        });
        Ok(self)
    }
}

impl TransactionData for AccountAllowanceApproveTransactionData {
    fn method(&self) -> &'static str {
        proto::methods::APPROVE_ALLOWANCES
    }

    fn to_body_data(&self, _chunk: Option<&ChunkInfo<'_>>) -> Result<Data> {
        Ok(Data::CryptoApproveAllowance(proto::CryptoApproveAllowanceTransactionBody {
            crypto_allowances: self
                .hbar_approvals
                .iter()
                .map(|a| {
                    Ok(proto::CryptoAllowance {
                        owner: account_to_proto(a.owner)?,
                        spender: Some(a.spender.to_account_proto()?),
                        amount: a.amount.to_tinybars(),
                    })
                })
                .collect::<Result<_>>()?,
            token_allowances: self
                .token_approvals
                .iter()
                .map(|a| {
                    Ok(proto::TokenAllowance {
                        token_id: Some(a.token_id.to_num_proto()?),
                        owner: account_to_proto(a.owner)?,
                        spender: Some(a.spender.to_account_proto()?),
                        amount: a.amount as i64,
                    })
                })
                .collect::<Result<_>>()?,
        }))
    }

    fn from_body_data(data: Data) -> std::result::Result<Self, DecodeError> {
        let Data::CryptoApproveAllowance(body) = data else {
            return Err(wrong_kind("allowance approve"));
        };

        let mut hbar_approvals = Vec::with_capacity(body.crypto_allowances.len());
        for a in &body.crypto_allowances {
            hbar_approvals.push(HbarAllowance {
                owner: account_from_proto(a.owner.as_ref(), "allowance owner")?,
                spender: required_account(a.spender.as_ref(), "allowance spender")?,
                amount: Hbar::from_tinybars(a.amount),
            });
        }

        let mut token_approvals = Vec::with_capacity(body.token_allowances.len());
        for a in &body.token_allowances {
            token_approvals.push(TokenAllowance {
                token_id: required_token(a.token_id.as_ref(), "allowance token")?,
                owner: account_from_proto(a.owner.as_ref(), "allowance owner")?,
                spender: required_account(a.spender.as_ref(), "allowance spender")?,
                amount: u64::try_from(a.amount)
                    .map_err(|_| DecodeError::malformed("allowance amount", "negative"))?,
            });
        }

        Ok(Self {
            hbar_approvals,
            token_approvals,
        })
    }
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountAllowanceDeleteTransactionData {
    nft_removals: Vec<NftAllowanceRemoval>,
}

impl AccountAllowanceDeleteTransactionData {
    pub fn nft_removals(&self) -> &[NftAllowanceRemoval] {
        &self.nft_removals
    }
}

impl Transaction<AccountAllowanceDeleteTransactionData> {
    /// Revoke every spender's allowance on one NFT. Serials of the same
    /// token and owner are grouped into one removal.
    pub fn delete_all_token_nft_allowances(
        &mut self,
        token_id: TokenId,
        serial: i64,
        owner: AccountId,
    ) -> Result<&mut Self> {
        token_id.require_num("token_id")?;
        if serial <= 0 {
            return Err(Error::validation("serial", "must be positive"));
        }
        let removals = &mut self.data_mut()?.nft_removals;
        match removals
            .iter_mut()
            .find(|r| r.token_id == token_id && r.owner == Some(owner))
        {
            Some(removal) => removal.serials.push(serial),
            None => removals.push(NftAllowanceRemoval {
                token_id,
                owner: Some(owner),
                serials: vec![serial],
            }),
        }
        Ok(self)
    }
}

impl TransactionData for AccountAllowanceDeleteTransactionData {
    fn method(&self) -> &'static str {
        proto::methods::DELETE_ALLOWANCES
    }

    fn to_body_data(&self, _chunk: Option<&ChunkInfo<'_>>) -> Result<Data> {
        Ok(Data::CryptoDeleteAllowance(proto::CryptoDeleteAllowanceTransactionBody {
            nft_allowances: self
                .nft_removals
                .iter()
                .map(|r| {
                    Ok(proto::NftRemoveAllowance {
                        token_id: Some(r.token_id.to_num_proto()?),
                        owner: account_to_proto(r.owner)?,
                        serial_numbers: r.serials.clone(),
                    })
                })
                .collect::<Result<_>>()?,
        }))
    }

    fn from_body_data(data: Data) -> std::result::Result<Self, DecodeError> {
        let Data::CryptoDeleteAllowance(body) = data else {
            return Err(wrong_kind("allowance delete"));
        };
        let mut nft_removals = Vec::with_capacity(body.nft_allowances.len());
        for r in body.nft_allowances {
            nft_removals.push(NftAllowanceRemoval {
                token_id: required_token(r.token_id.as_ref(), "nft token")?,
                owner: account_from_proto(r.owner.as_ref(), "nft owner")?,
                serials: r.serial_numbers,
            });
        }
        Ok(Self { nft_removals })
    }
}
