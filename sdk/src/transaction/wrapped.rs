//! Decoding bytes of unknown kind.
//!
//! [`KINDS`] is the closed table of transaction kinds this SDK understands,
//! ordered by name. A kind's position in the table is its kind index, which
//! is stable and is what [`decode`] reports alongside the transaction.
//! [`WrappedTransaction`] has one variant per table entry, in the same
//! order, so `KINDS[w.kind_index()]` always describes `w`.

use std::fmt;
use std::sync::Arc;

use super::codec::{decode_entries, DecodedEntry};
use super::kinds::*;
use super::{DecodeError, Transaction, TransactionData};
use crate::client::Client;
use crate::crypto::{Signer, TRANSACTION_HASH_LENGTH};
use crate::error::Result;
use crate::id::{AccountId, TransactionId};
use crate::proto::transaction_body::Data;
use crate::response::TransactionResponse;

/// One row of the kind table.
pub struct KindEntry {
    /// Field number of the kind's slot in the body's `data` oneof.
    pub tag: u32,
    pub name: &'static str,
    decode: fn(Vec<DecodedEntry>) -> std::result::Result<WrappedTransaction, DecodeError>,
}

impl fmt::Debug for KindEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindEntry")
            .field("tag", &self.tag)
            .field("name", &self.name)
            .finish()
    }
}

fn decode_as<D>(entries: Vec<DecodedEntry>) -> std::result::Result<WrappedTransaction, DecodeError>
where
    D: TransactionData,
    WrappedTransaction: From<Transaction<D>>,
{
    Transaction::<D>::from_entries(entries).map(WrappedTransaction::from)
}

macro_rules! kind_table {
    ($($index:literal => $variant:ident($data:ty) = $tag:literal;)*) => {
        /// Every kind the SDK can decode, ordered by name.
        pub static KINDS: [KindEntry; 14] = [
            $(KindEntry {
                tag: $tag,
                name: stringify!($variant),
                decode: decode_as::<$data>,
            },)*
        ];

        /// A transaction of any known kind.
        #[derive(Debug, Clone)]
        pub enum WrappedTransaction {
            $($variant(Transaction<$data>),)*
        }

        $(
            impl From<Transaction<$data>> for WrappedTransaction {
                fn from(tx: Transaction<$data>) -> Self {
                    Self::$variant(tx)
                }
            }
        )*

        impl WrappedTransaction {
            /// Position of this transaction's kind in [`KINDS`].
            pub fn kind_index(&self) -> usize {
                match self {
                    $(Self::$variant(_) => $index,)*
                }
            }

            pub fn transaction_id(&self) -> Option<TransactionId> {
                match self {
                    $(Self::$variant(tx) => tx.transaction_id(),)*
                }
            }

            pub fn node_account_ids(&self) -> Option<Vec<AccountId>> {
                match self {
                    $(Self::$variant(tx) => tx.node_account_ids().map(<[_]>::to_vec),)*
                }
            }

            pub fn is_frozen(&self) -> bool {
                match self {
                    $(Self::$variant(tx) => tx.is_frozen(),)*
                }
            }

            pub fn to_bytes(&self) -> Result<Vec<u8>> {
                match self {
                    $(Self::$variant(tx) => tx.to_bytes(),)*
                }
            }

            pub fn transaction_hash(&self) -> Result<[u8; TRANSACTION_HASH_LENGTH]> {
                match self {
                    $(Self::$variant(tx) => tx.transaction_hash(),)*
                }
            }

            pub fn sign(&mut self, signer: impl Signer + 'static) -> Result<&mut Self> {
                let signer: Arc<dyn Signer> = Arc::new(signer);
                match self {
                    $(Self::$variant(tx) => { tx.sign_arc(signer)?; })*
                }
                Ok(self)
            }

            pub async fn execute(&mut self, client: &Client) -> Result<TransactionResponse> {
                match self {
                    $(Self::$variant(tx) => tx.execute(client).await,)*
                }
            }

            pub async fn execute_all(&mut self, client: &Client) -> Result<Vec<TransactionResponse>> {
                match self {
                    $(Self::$variant(tx) => tx.execute_all(client).await,)*
                }
            }
        }
    };
}

kind_table! {
    0 => AccountAllowanceApprove(AccountAllowanceApproveTransactionData) = 48;
    1 => AccountAllowanceDelete(AccountAllowanceDeleteTransactionData) = 49;
    2 => AccountCreate(AccountCreateTransactionData) = 11;
    3 => AccountDelete(AccountDeleteTransactionData) = 12;
    4 => FileAppend(FileAppendTransactionData) = 16;
    5 => FileCreate(FileCreateTransactionData) = 17;
    6 => Prng(PrngTransactionData) = 52;
    7 => ScheduleDelete(ScheduleDeleteTransactionData) = 43;
    8 => TokenAssociate(TokenAssociateTransactionData) = 40;
    9 => TokenDissociate(TokenDissociateTransactionData) = 41;
    10 => TopicCreate(TopicCreateTransactionData) = 24;
    11 => TopicDelete(TopicDeleteTransactionData) = 26;
    12 => TopicMessageSubmit(TopicMessageSubmitTransactionData) = 27;
    13 => Transfer(TransferTransactionData) = 14;
}

fn data_tag(data: &Data) -> u32 {
    match data {
        Data::CryptoCreateAccount(_) => 11,
        Data::CryptoDelete(_) => 12,
        Data::CryptoTransfer(_) => 14,
        Data::FileAppend(_) => 16,
        Data::FileCreate(_) => 17,
        Data::ConsensusCreateTopic(_) => 24,
        Data::ConsensusDeleteTopic(_) => 26,
        Data::ConsensusSubmitMessage(_) => 27,
        Data::TokenAssociate(_) => 40,
        Data::TokenDissociate(_) => 41,
        Data::ScheduleDelete(_) => 43,
        Data::CryptoApproveAllowance(_) => 48,
        Data::CryptoDeleteAllowance(_) => 49,
        Data::UtilPrng(_) => 52,
    }
}

impl WrappedTransaction {
    pub fn kind_name(&self) -> &'static str {
        KINDS[self.kind_index()].name
    }

    /// Decode bytes of any known kind.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(decode(bytes)?.1)
    }
}

/// Decode any of the three envelope layers (or a list of outer
/// transactions) into a transaction, together with its kind index.
pub fn decode(bytes: &[u8]) -> std::result::Result<(usize, WrappedTransaction), DecodeError> {
    let entries = decode_entries(bytes)?;
    let tag = entries
        .first()
        .and_then(|entry| entry.body.data.as_ref())
        .map(data_tag)
        .ok_or(DecodeError::UnrecognizedEnvelope)?;
    let index = KINDS
        .iter()
        .position(|kind| kind.tag == tag)
        .ok_or(DecodeError::UnrecognizedEnvelope)?;
    let transaction = (KINDS[index].decode)(entries)?;
    Ok((index, transaction))
}
