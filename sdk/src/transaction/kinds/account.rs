//! Creating and deleting accounts.

use std::time::Duration;

use super::{
    account_from_proto, account_to_proto, duration_from_proto, duration_to_proto, key_from_proto,
    key_to_proto, wrong_kind,
};
use crate::config::{DEFAULT_AUTO_RENEW_PERIOD, MAX_AUTOMATIC_TOKEN_ASSOCIATIONS, MAX_MEMO_LENGTH};
use crate::crypto::PublicKey;
use crate::error::{Error, Result};
use crate::hbar::Hbar;
use crate::id::{AccountId, EVM_ADDRESS_LENGTH};
use crate::proto::{self, transaction_body::Data};
use crate::transaction::{ChunkInfo, DecodeError, Transaction, TransactionData};

pub type AccountCreateTransaction = Transaction<AccountCreateTransactionData>;
pub type AccountDeleteTransaction = Transaction<AccountDeleteTransactionData>;

// ---------------------------------------------------------------------------
// AccountCreate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCreateTransactionData {
    key: Option<PublicKey>,
    initial_balance: Hbar,
    receiver_signature_required: bool,
    auto_renew_period: Duration,
    account_memo: String,
    max_automatic_token_associations: i32,
    decline_staking_reward: bool,
    alias: Option<[u8; EVM_ADDRESS_LENGTH]>,
}

impl Default for AccountCreateTransactionData {
    fn default() -> Self {
        Self {
            key: None,
            initial_balance: Hbar::ZERO,
            receiver_signature_required: false,
            auto_renew_period: DEFAULT_AUTO_RENEW_PERIOD,
            account_memo: String::new(),
            max_automatic_token_associations: 0,
            decline_staking_reward: false,
            alias: None,
        }
    }
}

impl AccountCreateTransactionData {
    pub fn key(&self) -> Option<&PublicKey> {
        self.key.as_ref()
    }

    pub fn initial_balance(&self) -> Hbar {
        self.initial_balance
    }

    pub fn receiver_signature_required(&self) -> bool {
        self.receiver_signature_required
    }

    pub fn auto_renew_period(&self) -> Duration {
        self.auto_renew_period
    }

    pub fn account_memo(&self) -> &str {
        &self.account_memo
    }

    pub fn max_automatic_token_associations(&self) -> i32 {
        self.max_automatic_token_associations
    }

    pub fn decline_staking_reward(&self) -> bool {
        self.decline_staking_reward
    }

    pub fn alias(&self) -> Option<&[u8; EVM_ADDRESS_LENGTH]> {
        self.alias.as_ref()
    }
}

impl Transaction<AccountCreateTransactionData> {
    pub fn set_key(&mut self, key: PublicKey) -> Result<&mut Self> {
        self.data_mut()?.key = Some(key);
        Ok(self)
    }

    pub fn set_initial_balance(&mut self, balance: Hbar) -> Result<&mut Self> {
        if balance.is_negative() {
            return Err(Error::validation("initial_balance", "must not be negative"));
        }
        self.data_mut()?.initial_balance = balance;
        Ok(self)
    }

    pub fn set_receiver_signature_required(&mut self, required: bool) -> Result<&mut Self> {
        self.data_mut()?.receiver_signature_required = required;
        Ok(self)
    }

    pub fn set_auto_renew_period(&mut self, period: Duration) -> Result<&mut Self> {
        self.data_mut()?.auto_renew_period = period;
        Ok(self)
    }

    pub fn set_account_memo(&mut self, memo: impl Into<String>) -> Result<&mut Self> {
        let memo = memo.into();
        if memo.len() > MAX_MEMO_LENGTH {
            return Err(Error::validation(
                "account_memo",
                format!("{} bytes, at most {MAX_MEMO_LENGTH} allowed", memo.len()),
            ));
        }
        self.data_mut()?.account_memo = memo;
        Ok(self)
    }

    pub fn set_max_automatic_token_associations(&mut self, max: i32) -> Result<&mut Self> {
        if !(0..=MAX_AUTOMATIC_TOKEN_ASSOCIATIONS).contains(&max) {
            return Err(Error::validation(
                "max_automatic_token_associations",
                format!("{max} is outside 0..={MAX_AUTOMATIC_TOKEN_ASSOCIATIONS}"),
            ));
        }
        self.data_mut()?.max_automatic_token_associations = max;
        Ok(self)
    }

    pub fn set_decline_staking_reward(&mut self, decline: bool) -> Result<&mut Self> {
        self.data_mut()?.decline_staking_reward = decline;
        Ok(self)
    }

    /// An EVM address the new account can also be reached by.
    pub fn set_alias(&mut self, alias: [u8; EVM_ADDRESS_LENGTH]) -> Result<&mut Self> {
        self.data_mut()?.alias = Some(alias);
        Ok(self)
    }
}

impl TransactionData for AccountCreateTransactionData {
    fn method(&self) -> &'static str {
        proto::methods::CREATE_ACCOUNT
    }

    fn default_max_transaction_fee(&self) -> Hbar {
        Hbar::new(5)
    }

    fn to_body_data(&self, _chunk: Option<&ChunkInfo<'_>>) -> Result<Data> {
        Ok(Data::CryptoCreateAccount(proto::CryptoCreateTransactionBody {
            key: key_to_proto(self.key),
            initial_balance: u64::try_from(self.initial_balance.to_tinybars()).unwrap_or(0),
            receiver_sig_required: self.receiver_signature_required,
            auto_renew_period: Some(duration_to_proto(self.auto_renew_period)),
            memo: self.account_memo.clone(),
            max_automatic_token_associations: self.max_automatic_token_associations,
            decline_reward: self.decline_staking_reward,
            alias: self.alias.map(|a| a.to_vec()).unwrap_or_default(),
        }))
    }

    fn from_body_data(data: Data) -> std::result::Result<Self, DecodeError> {
        let Data::CryptoCreateAccount(body) = data else {
            return Err(wrong_kind("account create"));
        };
        let alias = match body.alias.len() {
            0 => None,
            EVM_ADDRESS_LENGTH => {
                let mut address = [0u8; EVM_ADDRESS_LENGTH];
                address.copy_from_slice(&body.alias);
                Some(address)
            }
            n => {
                return Err(DecodeError::malformed(
                    "alias",
                    format!("{n} bytes, expected {EVM_ADDRESS_LENGTH}"),
                ))
            }
        };
        let initial_balance = i64::try_from(body.initial_balance)
            .map_err(|_| DecodeError::malformed("initial_balance", "exceeds i64::MAX"))?;

        Ok(Self {
            key: key_from_proto(body.key.as_ref(), "key")?,
            initial_balance: Hbar::from_tinybars(initial_balance),
            receiver_signature_required: body.receiver_sig_required,
            auto_renew_period: duration_from_proto(body.auto_renew_period.as_ref())
                .unwrap_or(DEFAULT_AUTO_RENEW_PERIOD),
            account_memo: body.memo,
            max_automatic_token_associations: body.max_automatic_token_associations,
            decline_staking_reward: body.decline_reward,
            alias,
        })
    }
}

// ---------------------------------------------------------------------------
// AccountDelete
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountDeleteTransactionData {
    account_id: Option<AccountId>,
    transfer_account_id: Option<AccountId>,
}

impl AccountDeleteTransactionData {
    pub fn account_id(&self) -> Option<AccountId> {
        self.account_id
    }

    pub fn transfer_account_id(&self) -> Option<AccountId> {
        self.transfer_account_id
    }
}

impl Transaction<AccountDeleteTransactionData> {
    /// The account to delete.
    pub fn set_account_id(&mut self, id: AccountId) -> Result<&mut Self> {
        self.data_mut()?.account_id = Some(id);
        Ok(self)
    }

    /// Where the deleted account's remaining balance goes.
    pub fn set_transfer_account_id(&mut self, id: AccountId) -> Result<&mut Self> {
        self.data_mut()?.transfer_account_id = Some(id);
        Ok(self)
    }
}

impl TransactionData for AccountDeleteTransactionData {
    fn method(&self) -> &'static str {
        proto::methods::CRYPTO_DELETE
    }

    fn to_body_data(&self, _chunk: Option<&ChunkInfo<'_>>) -> Result<Data> {
        Ok(Data::CryptoDelete(proto::CryptoDeleteTransactionBody {
            transfer_account_id: account_to_proto(self.transfer_account_id)?,
            delete_account_id: account_to_proto(self.account_id)?,
        }))
    }

    fn from_body_data(data: Data) -> std::result::Result<Self, DecodeError> {
        let Data::CryptoDelete(body) = data else {
            return Err(wrong_kind("account delete"));
        };
        Ok(Self {
            account_id: account_from_proto(body.delete_account_id.as_ref(), "delete_account_id")?,
            transfer_account_id: account_from_proto(
                body.transfer_account_id.as_ref(),
                "transfer_account_id",
            )?,
        })
    }
}
