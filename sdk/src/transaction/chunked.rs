//! Splitting oversized payloads into ordered chunks.
//!
//! Only two kinds chunk: topic messages and file appends. Each chunk is an
//! ordinary transaction in every respect except that it carries one slice of
//! the payload. Chunk `i` uses `initial.chunk_id(i)` as its id, so the whole
//! chain can be recomputed from the first id alone.

use crate::config::DEFAULT_MAX_CHUNKS;
use crate::error::{Error, Result};
use crate::id::TransactionId;

/// Chunking limits for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    chunk_size: usize,
    max_chunks: usize,
}

impl ChunkConfig {
    pub const fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            max_chunks: DEFAULT_MAX_CHUNKS,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn max_chunks(&self) -> usize {
        self.max_chunks
    }

    pub fn set_chunk_size(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(Error::validation("chunk_size", "must be at least 1 byte"));
        }
        self.chunk_size = size;
        Ok(())
    }

    pub fn set_max_chunks(&mut self, max: usize) -> Result<()> {
        if max == 0 {
            return Err(Error::validation("max_chunks", "must be at least 1"));
        }
        self.max_chunks = max;
        Ok(())
    }

    /// Number of chunks `len` bytes need. An empty payload still takes one.
    pub fn required_chunks(&self, len: usize) -> usize {
        len.div_ceil(self.chunk_size).max(1)
    }

    /// Like [`required_chunks`](Self::required_chunks), failing if the
    /// result is over the limit.
    pub(crate) fn plan(&self, len: usize) -> Result<usize> {
        let required = self.required_chunks(len);
        if required > self.max_chunks {
            return Err(Error::MaxChunksExceeded {
                required,
                max: self.max_chunks,
            });
        }
        Ok(required)
    }

    /// The `index`-th slice of `payload`.
    pub(crate) fn slice<'a>(&self, payload: &'a [u8], index: usize) -> &'a [u8] {
        let start = (index * self.chunk_size).min(payload.len());
        let end = (start + self.chunk_size).min(payload.len());
        &payload[start..end]
    }
}

/// What a chunked kind needs to know to encode one chunk's body.
#[derive(Debug, Clone, Copy)]
pub struct ChunkInfo<'a> {
    /// Zero-based.
    pub index: usize,
    pub total: usize,
    pub initial_transaction_id: TransactionId,
    pub transaction_id: TransactionId,
    pub slice: &'a [u8],
}

impl ChunkInfo<'_> {
    pub fn is_multi_chunk(&self) -> bool {
        self.total > 1
    }
}
