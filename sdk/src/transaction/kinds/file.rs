//! Creating files and appending to them.
//!
//! A file append larger than one chunk becomes a chain of appends that must
//! land in order, so execution waits for each chunk's receipt before
//! sending the next. Unlike topic messages the chunks carry no chunk info:
//! the ledger simply concatenates whatever arrives.

use chrono::{DateTime, Utc};

use super::{entity_from_proto, entity_to_proto, wrong_kind};
use crate::config::{DEFAULT_FILE_CHUNK_SIZE, MAX_MEMO_LENGTH};
use crate::crypto::keys::{key_list_from_proto, key_list_to_proto};
use crate::crypto::PublicKey;
use crate::error::{Error, Result};
use crate::hbar::Hbar;
use crate::id::transaction_id::{timestamp_from_proto, timestamp_to_proto};
use crate::id::FileId;
use crate::proto::{self, transaction_body::Data};
use crate::transaction::{ChunkConfig, ChunkInfo, DecodeError, Transaction, TransactionData};

pub type FileCreateTransaction = Transaction<FileCreateTransactionData>;
pub type FileAppendTransaction = Transaction<FileAppendTransactionData>;

// ---------------------------------------------------------------------------
// FileCreate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileCreateTransactionData {
    keys: Vec<PublicKey>,
    contents: Vec<u8>,
    expiration_time: Option<DateTime<Utc>>,
    file_memo: String,
}

impl FileCreateTransactionData {
    pub fn keys(&self) -> &[PublicKey] {
        &self.keys
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn expiration_time(&self) -> Option<DateTime<Utc>> {
        self.expiration_time
    }

    pub fn file_memo(&self) -> &str {
        &self.file_memo
    }
}

impl Transaction<FileCreateTransactionData> {
    /// Every key in the list must sign updates to the file.
    pub fn set_keys(&mut self, keys: Vec<PublicKey>) -> Result<&mut Self> {
        self.data_mut()?.keys = keys;
        Ok(self)
    }

    pub fn set_contents(&mut self, contents: impl Into<Vec<u8>>) -> Result<&mut Self> {
        self.data_mut()?.contents = contents.into();
        Ok(self)
    }

    pub fn set_expiration_time(&mut self, time: DateTime<Utc>) -> Result<&mut Self> {
        self.data_mut()?.expiration_time = Some(time);
        Ok(self)
    }

    pub fn set_file_memo(&mut self, memo: impl Into<String>) -> Result<&mut Self> {
        let memo = memo.into();
        if memo.len() > MAX_MEMO_LENGTH {
            return Err(Error::validation(
                "file_memo",
                format!("{} bytes, at most {MAX_MEMO_LENGTH} allowed", memo.len()),
            ));
        }
        self.data_mut()?.file_memo = memo;
        Ok(self)
    }
}

impl TransactionData for FileCreateTransactionData {
    fn method(&self) -> &'static str {
        proto::methods::CREATE_FILE
    }

    fn default_max_transaction_fee(&self) -> Hbar {
        Hbar::new(5)
    }

    fn to_body_data(&self, _chunk: Option<&ChunkInfo<'_>>) -> Result<Data> {
        Ok(Data::FileCreate(proto::FileCreateTransactionBody {
            expiration_time: self.expiration_time.map(timestamp_to_proto),
            keys: Some(key_list_to_proto(&self.keys)),
            contents: self.contents.clone(),
            memo: self.file_memo.clone(),
        }))
    }

    fn from_body_data(data: Data) -> std::result::Result<Self, DecodeError> {
        let Data::FileCreate(body) = data else {
            return Err(wrong_kind("file create"));
        };
        let keys = match &body.keys {
            Some(list) => key_list_from_proto(list)
                .map_err(|e| DecodeError::malformed("file keys", e.to_string()))?,
            None => Vec::new(),
        };
        let expiration_time = body
            .expiration_time
            .as_ref()
            .map(timestamp_from_proto)
            .transpose()
            .map_err(|e| DecodeError::malformed("expiration_time", e.to_string()))?;
        Ok(Self {
            keys,
            contents: body.contents,
            expiration_time,
            file_memo: body.memo,
        })
    }
}

// ---------------------------------------------------------------------------
// FileAppend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAppendTransactionData {
    file_id: Option<FileId>,
    contents: Vec<u8>,
    chunking: ChunkConfig,
}

impl Default for FileAppendTransactionData {
    fn default() -> Self {
        Self {
            file_id: None,
            contents: Vec::new(),
            chunking: ChunkConfig::with_chunk_size(DEFAULT_FILE_CHUNK_SIZE),
        }
    }
}

impl FileAppendTransactionData {
    pub fn file_id(&self) -> Option<FileId> {
        self.file_id
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn chunk_config(&self) -> ChunkConfig {
        self.chunking
    }
}

impl Transaction<FileAppendTransactionData> {
    pub fn set_file_id(&mut self, id: FileId) -> Result<&mut Self> {
        id.require_num("file_id")?;
        self.data_mut()?.file_id = Some(id);
        Ok(self)
    }

    pub fn set_contents(&mut self, contents: impl Into<Vec<u8>>) -> Result<&mut Self> {
        self.data_mut()?.contents = contents.into();
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

impl TransactionData for FileAppendTransactionData {
    fn method(&self) -> &'static str {
        proto::methods::APPEND_CONTENT
    }

    fn default_max_transaction_fee(&self) -> Hbar {
        Hbar::new(5)
    }

    fn to_body_data(&self, chunk: Option<&ChunkInfo<'_>>) -> Result<Data> {
        let contents = match chunk {
            Some(info) => info.slice.to_vec(),
            None => self.contents.clone(),
        };
        Ok(Data::FileAppend(proto::FileAppendTransactionBody {
            file_id: entity_to_proto(self.file_id)?,
            contents,
        }))
    }

    fn from_body_data(data: Data) -> std::result::Result<Self, DecodeError> {
        let Data::FileAppend(body) = data else {
            return Err(wrong_kind("file append"));
        };
        Ok(Self {
            file_id: entity_from_proto(body.file_id.as_ref(), "file_id")?,
            contents: body.contents,
            ..Self::default()
        })
    }

    fn chunking(&self) -> Option<(&[u8], ChunkConfig)> {
        Some((&self.contents, self.chunking))
    }

    fn append_chunk(&mut self, data: Data) -> std::result::Result<(), DecodeError> {
        let next = Self::from_body_data(data)?;
        if next.file_id != self.file_id {
            return Err(DecodeError::malformed("file_id", "chunks target different files"));
        }
        self.contents.extend_from_slice(&next.contents);
        Ok(())
    }

    fn wait_for_receipt_between_chunks(&self) -> bool {
        true
    }
}
