//! Consensus topics: create, delete, and submit messages.
//!
//! A message larger than one chunk is split into a chain of submissions.
//! Each chunk names the chain's first transaction id, the chunk count and
//! its own one-based position, so subscribers can reassemble the message
//! even if they see the chunks interleaved with other traffic.

use std::time::Duration;

use super::{
    account_from_proto, account_to_proto, duration_from_proto, duration_to_proto,
    entity_from_proto, entity_to_proto, key_from_proto, key_to_proto, wrong_kind,
};
use crate::config::{DEFAULT_AUTO_RENEW_PERIOD, DEFAULT_TOPIC_CHUNK_SIZE, MAX_MEMO_LENGTH};
use crate::crypto::PublicKey;
use crate::error::{Error, Result};
use crate::hbar::Hbar;
use crate::id::{AccountId, TopicId, TransactionId};
use crate::proto::{self, transaction_body::Data};
use crate::transaction::{ChunkConfig, ChunkInfo, DecodeError, Transaction, TransactionData};

pub type TopicCreateTransaction = Transaction<TopicCreateTransactionData>;
pub type TopicDeleteTransaction = Transaction<TopicDeleteTransactionData>;
pub type TopicMessageSubmitTransaction = Transaction<TopicMessageSubmitTransactionData>;

// ---------------------------------------------------------------------------
// TopicCreate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicCreateTransactionData {
    topic_memo: String,
    admin_key: Option<PublicKey>,
    submit_key: Option<PublicKey>,
    auto_renew_period: Duration,
    auto_renew_account_id: Option<AccountId>,
}

impl Default for TopicCreateTransactionData {
    fn default() -> Self {
        Self {
            topic_memo: String::new(),
            admin_key: None,
            submit_key: None,
            auto_renew_period: DEFAULT_AUTO_RENEW_PERIOD,
            auto_renew_account_id: None,
        }
    }
}

impl TopicCreateTransactionData {
    pub fn topic_memo(&self) -> &str {
        &self.topic_memo
    }

    pub fn admin_key(&self) -> Option<&PublicKey> {
        self.admin_key.as_ref()
    }

    pub fn submit_key(&self) -> Option<&PublicKey> {
        self.submit_key.as_ref()
    }

    pub fn auto_renew_period(&self) -> Duration {
        self.auto_renew_period
    }

    pub fn auto_renew_account_id(&self) -> Option<AccountId> {
        self.auto_renew_account_id
    }
}

impl Transaction<TopicCreateTransactionData> {
    pub fn set_topic_memo(&mut self, memo: impl Into<String>) -> Result<&mut Self> {
        let memo = memo.into();
        if memo.len() > MAX_MEMO_LENGTH {
            return Err(Error::validation(
                "topic_memo",
                format!("{} bytes, at most {MAX_MEMO_LENGTH} allowed", memo.len()),
            ));
        }
        self.data_mut()?.topic_memo = memo;
        Ok(self)
    }

    /// Without an admin key the topic can never be updated or deleted.
    pub fn set_admin_key(&mut self, key: PublicKey) -> Result<&mut Self> {
        self.data_mut()?.admin_key = Some(key);
        Ok(self)
    }

    /// Without a submit key anyone may submit messages.
    pub fn set_submit_key(&mut self, key: PublicKey) -> Result<&mut Self> {
        self.data_mut()?.submit_key = Some(key);
        Ok(self)
    }

    pub fn set_auto_renew_period(&mut self, period: Duration) -> Result<&mut Self> {
        self.data_mut()?.auto_renew_period = period;
        Ok(self)
    }

    pub fn set_auto_renew_account_id(&mut self, id: AccountId) -> Result<&mut Self> {
        self.data_mut()?.auto_renew_account_id = Some(id);
        Ok(self)
    }
}

impl TransactionData for TopicCreateTransactionData {
    fn method(&self) -> &'static str {
        proto::methods::CREATE_TOPIC
    }

    fn default_max_transaction_fee(&self) -> Hbar {
        Hbar::new(25)
    }

    fn to_body_data(&self, _chunk: Option<&ChunkInfo<'_>>) -> Result<Data> {
        Ok(Data::ConsensusCreateTopic(proto::ConsensusCreateTopicTransactionBody {
            memo: self.topic_memo.clone(),
            admin_key: key_to_proto(self.admin_key),
            submit_key: key_to_proto(self.submit_key),
            auto_renew_period: Some(duration_to_proto(self.auto_renew_period)),
            auto_renew_account: account_to_proto(self.auto_renew_account_id)?,
        }))
    }

    fn from_body_data(data: Data) -> std::result::Result<Self, DecodeError> {
        let Data::ConsensusCreateTopic(body) = data else {
            return Err(wrong_kind("topic create"));
        };
        Ok(Self {
            topic_memo: body.memo,
            admin_key: key_from_proto(body.admin_key.as_ref(), "admin_key")?,
            submit_key: key_from_proto(body.submit_key.as_ref(), "submit_key")?,
            auto_renew_period: duration_from_proto(body.auto_renew_period.as_ref())
                .unwrap_or(DEFAULT_AUTO_RENEW_PERIOD),
            auto_renew_account_id: account_from_proto(
                body.auto_renew_account.as_ref(),
                "auto_renew_account",
            )?,
        })
    }
}

// ---------------------------------------------------------------------------
// TopicDelete
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicDeleteTransactionData {
    topic_id: Option<TopicId>,
}

impl TopicDeleteTransactionData {
    pub fn topic_id(&self) -> Option<TopicId> {
        self.topic_id
    }
}

impl Transaction<TopicDeleteTransactionData> {
    pub fn set_topic_id(&mut self, id: TopicId) -> Result<&mut Self> {
        id.require_num("topic_id")?;
        self.data_mut()?.topic_id = Some(id);
        Ok(self)
    }
}

impl TransactionData for TopicDeleteTransactionData {
    fn method(&self) -> &'static str {
        proto::methods::DELETE_TOPIC
    }

    fn to_body_data(&self, _chunk: Option<&ChunkInfo<'_>>) -> Result<Data> {
        Ok(Data::ConsensusDeleteTopic(proto::ConsensusDeleteTopicTransactionBody {
            topic_id: entity_to_proto(self.topic_id)?,
        }))
    }

    fn from_body_data(data: Data) -> std::result::Result<Self, DecodeError> {
        let Data::ConsensusDeleteTopic(body) = data else {
            return Err(wrong_kind("topic delete"));
        };
        Ok(Self {
            topic_id: entity_from_proto(body.topic_id.as_ref(), "topic_id")?,
        })
    }
}

// ---------------------------------------------------------------------------
// TopicMessageSubmit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMessageSubmitTransactionData {
    topic_id: Option<TopicId>,
    message: Vec<u8>,
    chunking: ChunkConfig,
}

impl Default for TopicMessageSubmitTransactionData {
    fn default() -> Self {
        Self {
            topic_id: None,
            message: Vec::new(),
            chunking: ChunkConfig::with_chunk_size(DEFAULT_TOPIC_CHUNK_SIZE),
        }
    }
}

impl TopicMessageSubmitTransactionData {
    pub fn topic_id(&self) -> Option<TopicId> {
        self.topic_id
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    pub fn chunk_config(&self) -> ChunkConfig {
        self.chunking
    }
}

impl Transaction<TopicMessageSubmitTransactionData> {
    pub fn set_topic_id(&mut self, id: TopicId) -> Result<&mut Self> {
        id.require_num("topic_id")?;
        self.data_mut()?.topic_id = Some(id);
        Ok(self)
    }

    pub fn set_message(&mut self, message: impl Into<Vec<u8>>) -> Result<&mut Self> {
        self.data_mut()?.message = message.into();
        Ok(self)
    }

    pub fn set_chunk_size(&mut self, size: usize) -> Result<&mut Self> {
        self.data_mut()?.chunking.set_chunk_size(size)?;
        Ok(self)
    }

    pub fn set_max_chunks(&mut self, max: usize) -> Result<&mut Self> {
        self.data_mut()?.chunking.set_max_chunks(max)?;
        Ok(self)
    }
}

impl TransactionData for TopicMessageSubmitTransactionData {
    fn method(&self) -> &'static str {
        proto::methods::SUBMIT_MESSAGE
    }

    fn to_body_data(&self, chunk: Option<&ChunkInfo<'_>>) -> Result<Data> {
        let (message, chunk_info) = match chunk {
            Some(info) => {
                let chunk_info = if info.is_multi_chunk() {
                    Some(proto::ConsensusMessageChunkInfo {
                        initial_transaction_id: Some(info.initial_transaction_id.to_proto()?),
                        total: info.total as i32,
                        number: info.index as i32 + 1,
                    })
                } else {
                    None
                };
                (info.slice.to_vec(), chunk_info)
            }
            None => (self.message.clone(), None),
        };
        Ok(Data::ConsensusSubmitMessage(proto::ConsensusSubmitMessageTransactionBody {
            topic_id: entity_to_proto(self.topic_id)?,
            message,
            chunk_info,
        }))
    }

    fn from_body_data(data: Data) -> std::result::Result<Self, DecodeError> {
        let Data::ConsensusSubmitMessage(body) = data else {
            return Err(wrong_kind("topic message submit"));
        };
        if let Some(info) = &body.chunk_info {
            check_chunk_info(info)?;
        }
        Ok(Self {
            topic_id: entity_from_proto(body.topic_id.as_ref(), "topic_id")?,
            message: body.message,
            ..Self::default()
        })
    }

    fn chunking(&self) -> Option<(&[u8], ChunkConfig)> {
        Some((&self.message, self.chunking))
    }

    fn append_chunk(&mut self, data: Data) -> std::result::Result<(), DecodeError> {
        let next = Self::from_body_data(data)?;
        if next.topic_id != self.topic_id {
            return Err(DecodeError::malformed("topic_id", "chunks target different topics"));
        }
        self.message.extend_from_slice(&next.message);
        Ok(())
    }
}

fn check_chunk_info(info: &proto::ConsensusMessageChunkInfo) -> std::result::Result<(), DecodeError> {
    if info.total < 1 || info.number < 1 || info.number > info.total {
        return Err(DecodeError::malformed(
            "chunk_info",
            format!("chunk {} of {}", info.number, info.total),
        ));
    }
    if let Some(id) = &info.initial_transaction_id {
        TransactionId::from_proto(id)
            .map_err(|e| DecodeError::malformed("chunk_info", e.to_string()))?;
    }
    Ok(())
}
