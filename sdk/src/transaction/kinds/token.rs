//! Associating an account with tokens, and undoing it.
//!
//! The two kinds are mirror images on the wire, so they share one macro.

use super::{account_from_proto, account_to_proto, wrong_kind};
use crate::error::Result;
use crate::hbar::Hbar;
use crate::id::{AccountId, EntityId, TokenId};
use crate::proto::{self, transaction_body::Data};
use crate::transaction::{ChunkInfo, DecodeError, Transaction, TransactionData};

pub type TokenAssociateTransaction = Transaction<TokenAssociateTransactionData>;
pub type TokenDissociateTransaction = Transaction<TokenDissociateTransactionData>;

macro_rules! token_relation {
    ($data:ident, $variant:ident, $body:ident, $method:ident, $label:literal) => {
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $data {
            account_id: Option<AccountId>,
            token_ids: Vec<TokenId>,
        }

        impl $data {
            pub fn account_id(&self) -> Option<AccountId> {
                self.account_id
            }

            pub fn token_ids(&self) -> &[TokenId] {
                &self.token_ids
            }
        }

        impl Transaction<$data> {
            pub fn set_account_id(&mut self, id: AccountId) -> Result<&mut Self> {
                self.data_mut()?.account_id = Some(id);
                Ok(self)
            }

            pub fn set_token_ids(&mut self, ids: Vec<TokenId>) -> Result<&mut Self> {
                for id in &ids {
                    id.require_num("token_ids")?;
                }
                self.data_mut()?.token_ids = ids;
                Ok(self)
            }
        }

        impl TransactionData for $data {
            fn method(&self) -> &'static str {
                proto::methods::$method
            }

            fn default_max_transaction_fee(&self) -> Hbar {
                Hbar::new(5)
            }

            fn to_body_data(&self, _chunk: Option<&ChunkInfo<'_>>) -> Result<Data> {
                Ok(Data::$variant(proto::$body {
                    account: account_to_proto(self.account_id)?,
                    tokens: self
                        .token_ids
                        .iter()
                        .map(|t| t.to_num_proto())
                        .collect::<Result<_>>()?,
                }))
            }

            fn from_body_data(data: Data) -> std::result::Result<Self, DecodeError> {
                let Data::$variant(body) = data else {
                    return Err(wrong_kind($label));
                };
                let token_ids = body
                    .tokens
                    .iter()
                    .map(EntityId::from_num_proto)
                    .collect::<Result<Vec<_>>>()
                    .map_err(|e| DecodeError::malformed("tokens", e.to_string()))?;
                Ok(Self {
                    account_id: account_from_proto(body.account.as_ref(), "account")?,
                    token_ids,
                })
            }
        }
    };
}

token_relation!(
    TokenAssociateTransactionData,
    TokenAssociate,
    TokenAssociateTransactionBody,
    ASSOCIATE_TOKENS,
    "token associate"
);

token_relation!(
    TokenDissociateTransactionData,
    TokenDissociate,
    TokenDissociateTransactionBody,
    DISSOCIATE_TOKENS,
    "token dissociate"
);
