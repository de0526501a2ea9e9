//! An account's hbar balance. Free.

use super::{Query, QueryData};
use crate::error::{Error, Result};
use crate::hbar::Hbar;
use crate::id::AccountId;
use crate::proto::{self, query::query, response};
use crate::transaction::DecodeError;

pub type AccountBalanceQuery = Query<AccountBalanceQueryData>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountBalance {
    pub account_id: AccountId,
    pub hbars: Hbar,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountBalanceQueryData {
    account_id: Option<AccountId>,
}

impl Query<AccountBalanceQueryData> {
    pub fn set_account_id(&mut self, id: AccountId) -> &mut Self {
        self.data_mut().account_id = Some(id);
        self
    }
}

impl QueryData for AccountBalanceQueryData {
    type Output = AccountBalance;

    fn method(&self) -> &'static str {
        proto::methods::GET_BALANCE
    }

    fn is_payment_required(&self) -> bool {
        false
    }

    fn validate(&self) -> Result<()> {
        if self.account_id.is_none() {
            return Err(Error::validation("account_id", "a balance query needs one"));
        }
        Ok(())
    }

    fn to_query(&self, header: proto::QueryHeader) -> Result<proto::Query> {
        Ok(proto::Query {
            query: Some(query::Query::CryptogetAccountBalance(
                proto::CryptoGetAccountBalanceQuery {
                    header: Some(header),
                    account_id: self.account_id.map(AccountId::to_account_proto).transpose()?,
                },
            )),
        })
    }

    fn make_output(&self, response: proto::Response) -> Result<AccountBalance> {
        let Some(response::Response::CryptogetAccountBalance(balance)) = response.response else {
            return Err(DecodeError::malformed("response", "expected a balance").into());
        };
        let account_id = match &balance.account_id {
            Some(id) => AccountId::from_account_proto(id)?,
            None => self
                .account_id
                .ok_or_else(|| DecodeError::malformed("account_id", "missing"))?,
        };
        Ok(AccountBalance {
            account_id,
            hbars: Hbar::from_tinybars(i64::try_from(balance.balance).unwrap_or(i64::MAX)),
        })
    }
}
