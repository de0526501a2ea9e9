//! The three-layer envelope.
//!
//! ```text
//! Transaction        { signed_transaction_bytes = 5 }
//!   SignedTransaction  { body_bytes = 1, sig_map = 2 }
//!     TransactionBody    { transaction_id, node_account_id, fee, duration, memo, data }
//! ```
//!
//! Encoding always produces the outermost form. Decoding accepts any layer,
//! tried innermost first, and also a `TransactionList` of outer envelopes
//! (what `to_bytes_all` emits). A layer counts as a match only if it yields
//! a body whose `data` oneof is set: prost happily "decodes" most byte
//! strings as some message, so a successful parse alone proves nothing.
//!
//! Signatures are carried through untouched. Nothing here verifies them.

use std::collections::BTreeMap;
use std::time::Duration;

use prost::Message;
use thiserror::Error;

use super::{FrozenChunk, FrozenState, Transaction, TransactionData};
use crate::crypto::{sha384, PublicKey, TRANSACTION_HASH_LENGTH};
use crate::error::{Error, Result};
use crate::hbar::Hbar;
use crate::id::{AccountId, TransactionId};
use crate::proto;

/// Why a byte string is not a transaction.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No layer produced a body with a recognized kind.
    #[error("not a transaction envelope: no layer yields a body with a known kind")]
    UnrecognizedEnvelope,

    /// The envelope parsed but its contents are inconsistent.
    #[error("malformed {field}: {reason}")]
    Malformed { field: &'static str, reason: String },

    #[error("protobuf decode failed: {0}")]
    Protobuf(#[from] prost::DecodeError),
}

impl DecodeError {
    pub(crate) fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            field,
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// One serialized body addressed to one node, plus the signatures over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SignedBody {
    pub node_id: AccountId,
    pub body_bytes: Vec<u8>,
    /// Insertion order is wire order, so re-encoding is deterministic.
    pub signatures: Vec<(PublicKey, Vec<u8>)>,
}

impl SignedBody {
    pub fn new(node_id: AccountId, body_bytes: Vec<u8>) -> Self {
        Self {
            node_id,
            body_bytes,
            signatures: Vec::new(),
        }
    }

    /// Add a signature, replacing any earlier one by the same key.
    pub fn insert_signature(&mut self, public_key: PublicKey, signature: Vec<u8>) {
        match self.signatures.iter_mut().find(|(pk, _)| *pk == public_key) {
            Some(slot) => slot.1 = signature,
            None => self.signatures.push((public_key, signature)),
        }
    }

    pub fn is_signed_by(&self, public_key: &PublicKey) -> bool {
        self.signatures.iter().any(|(pk, _)| pk == public_key)
    }

    pub fn to_signed_transaction(&self) -> proto::SignedTransaction {
        let sig_pair = self
            .signatures
            .iter()
            .map(|(pk, sig)| proto::SignaturePair {
                pub_key_prefix: pk.to_bytes_vec(),
                signature: Some(proto::signature_pair::Signature::Ed25519(sig.clone())),
            })
            .collect();
        proto::SignedTransaction {
            body_bytes: self.body_bytes.clone(),
            sig_map: Some(proto::SignatureMap { sig_pair }),
        }
    }

    pub fn signed_transaction_bytes(&self) -> Vec<u8> {
        self.to_signed_transaction().encode_to_vec()
    }

    pub fn to_transaction(&self) -> proto::Transaction {
        proto::Transaction {
            signed_transaction_bytes: self.signed_transaction_bytes(),
        }
    }

    /// SHA-384 of the signed-transaction bytes: the id the network indexes
    /// records under.
    pub fn hash(&self) -> [u8; TRANSACTION_HASH_LENGTH] {
        sha384(&self.signed_transaction_bytes())
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// One body recovered from the wire, with whatever signatures came with it.
#[derive(Debug, Clone)]
pub(crate) struct DecodedEntry {
    pub body: proto::TransactionBody,
    pub body_bytes: Vec<u8>,
    pub signatures: Vec<(PublicKey, Vec<u8>)>,
}

/// Peel envelopes until a body with a known kind appears.
pub(crate) fn decode_entries(bytes: &[u8]) -> std::result::Result<Vec<DecodedEntry>, DecodeError> {
    // (a) bare body
    if let Ok(body) = proto::TransactionBody::decode(bytes) {
        if body.data.is_some() {
            return Ok(vec![DecodedEntry {
                body,
                body_bytes: bytes.to_vec(),
                signatures: Vec::new(),
            }]);
        }
    }

    // (b) signed transaction
    if let Ok(signed) = proto::SignedTransaction::decode(bytes) {
        if let Some(entry) = entry_from_signed(signed)? {
            return Ok(vec![entry]);
        }
    }

    // (c) outer wrapper
    if let Ok(outer) = proto::Transaction::decode(bytes) {
        if let Some(entry) = entry_from_outer(&outer)? {
            return Ok(vec![entry]);
        }
    }

    // (d) a list of outer wrappers; every entry must hold a body
    if let Ok(list) = proto::TransactionList::decode(bytes) {
        if !list.transaction_list.is_empty() {
            let mut entries = Vec::with_capacity(list.transaction_list.len());
            for outer in &list.transaction_list {
                match entry_from_outer(outer)? {
                    Some(entry) => entries.push(entry),
                    None => return Err(DecodeError::UnrecognizedEnvelope),
                }
            }
            return Ok(entries);
        }
    }

    Err(DecodeError::UnrecognizedEnvelope)
}

fn entry_from_outer(outer: &proto::Transaction) -> std::result::Result<Option<DecodedEntry>, DecodeError> {
    if outer.signed_transaction_bytes.is_empty() {
        return Ok(None);
    }
    match proto::SignedTransaction::decode(outer.signed_transaction_bytes.as_slice()) {
        Ok(signed) => entry_from_signed(signed),
        Err(_) => Ok(None),
    }
}

fn entry_from_signed(
    signed: proto::SignedTransaction,
) -> std::result::Result<Option<DecodedEntry>, DecodeError> {
    let body = match proto::TransactionBody::decode(signed.body_bytes.as_slice()) {
        Ok(body) if body.data.is_some() => body,
        _ => return Ok(None),
    };
    let signatures = signed
        .sig_map
        .map(|map| signatures_from_map(&map))
        .transpose()?
        .unwrap_or_default();
    Ok(Some(DecodedEntry {
        body,
        body_bytes: signed.body_bytes,
        signatures,
    }))
}

fn signatures_from_map(
    map: &proto::SignatureMap,
) -> std::result::Result<Vec<(PublicKey, Vec<u8>)>, DecodeError> {
    map.sig_pair
        .iter()
        .map(|pair| {
            let key = PublicKey::from_bytes(&pair.pub_key_prefix).map_err(|_| {
                DecodeError::malformed(
                    "signature map",
                    format!("{}-byte key prefix is not a full ed25519 key", pair.pub_key_prefix.len()),
                )
            })?;
            match &pair.signature {
                Some(proto::signature_pair::Signature::Ed25519(sig)) => Ok((key, sig.clone())),
                None => Err(DecodeError::malformed("signature map", "pair without a signature")),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Transaction <-> bytes
// ---------------------------------------------------------------------------

impl<D: TransactionData> Transaction<D> {
    /// The first chunk's envelope for the first node, with every signature
    /// collected so far.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self
            .require_frozen()?
            .first_body()?
            .to_transaction()
            .encode_to_vec())
    }

    /// The first chunk's envelope for one specific node.
    pub fn to_bytes_for_node(&self, node: AccountId) -> Result<Vec<u8>> {
        Ok(self.to_proto_for_node(node)?.encode_to_vec())
    }

    /// The first chunk's outer envelope for `node`, unencoded. Query
    /// payments embed this directly in the query header.
    pub(crate) fn to_proto_for_node(&self, node: AccountId) -> Result<proto::Transaction> {
        let frozen = self.require_frozen()?;
        let chunk = frozen
            .chunks
            .first()
            .ok_or_else(|| Error::illegal_state("frozen transaction has no chunks"))?;
        Ok(chunk.body_for(node)?.to_transaction())
    }

    /// Every chunk for every node, as a `TransactionList`, chunk-major.
    pub fn to_bytes_all(&self) -> Result<Vec<u8>> {
        let frozen = self.require_frozen()?;
        let list = proto::TransactionList {
            transaction_list: frozen.bodies().map(SignedBody::to_transaction).collect(),
        };
        Ok(list.encode_to_vec())
    }

    /// SHA-384 of the first node's signed transaction.
    pub fn transaction_hash(&self) -> Result<[u8; TRANSACTION_HASH_LENGTH]> {
        Ok(self.require_frozen()?.first_body()?.hash())
    }

    /// The first chunk's hash, per node.
    pub fn transaction_hash_per_node(
        &self,
    ) -> Result<BTreeMap<AccountId, [u8; TRANSACTION_HASH_LENGTH]>> {
        let frozen = self.require_frozen()?;
        Ok(frozen
            .chunks
            .first()
            .map(|chunk| chunk.bodies.iter().map(|b| (b.node_id, b.hash())).collect())
            .unwrap_or_default())
    }

    /// Transaction ids of every chunk, in submission order.
    pub fn chunk_transaction_ids(&self) -> Result<Vec<TransactionId>> {
        Ok(self
            .require_frozen()?
            .chunks
            .iter()
            .map(|c| c.transaction_id)
            .collect())
    }

    /// Decode bytes that must hold a transaction of kind `D`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_entries(decode_entries(bytes)?)?)
    }

    /// Rebuild a transaction from decoded bodies.
    ///
    /// Entries are grouped by transaction id into chunks. If every body has
    /// both a transaction id and a node id the result is frozen with the
    /// original body bytes and signatures; otherwise it is a builder.
    pub(crate) fn from_entries(
        entries: Vec<DecodedEntry>,
    ) -> std::result::Result<Self, DecodeError> {
        let malformed = |field, err: Error| DecodeError::malformed(field, err.to_string());

        let mut groups: Vec<(Option<TransactionId>, Vec<DecodedEntry>)> = Vec::new();
        for entry in entries {
            let id = entry
                .body
                .transaction_id
                .as_ref()
                .map(TransactionId::from_proto)
                .transpose()
                .map_err(|e| malformed("transaction_id", e))?;
            match groups.iter_mut().find(|(group_id, _)| *group_id == id) {
                Some((_, group)) => group.push(entry),
                None => groups.push((id, vec![entry])),
            }
        }

        let mut groups = groups.into_iter();
        let (first_id, first_group) = groups.next().ok_or(DecodeError::UnrecognizedEnvelope)?;
        let head = first_group
            .first()
            .map(|e| e.body.clone())
            .ok_or(DecodeError::UnrecognizedEnvelope)?;

        let node_ids_of = |group: &[DecodedEntry]| -> std::result::Result<Vec<Option<AccountId>>, DecodeError> {
            group
                .iter()
                .map(|e| {
                    e.body
                        .node_account_id
                        .as_ref()
                        .map(AccountId::from_account_proto)
                        .transpose()
                        .map_err(|err| malformed("node_account_id", err))
                })
                .collect()
        };
        let first_nodes = node_ids_of(&first_group)?;

        let data = head
            .data
            .clone()
            .ok_or(DecodeError::UnrecognizedEnvelope)?;
        let mut tx = Self::from_data(D::from_body_data(data)?);
        tx.transaction_id = first_id;
        tx.max_transaction_fee = Some(Hbar::from_tinybars(
            i64::try_from(head.transaction_fee).unwrap_or(i64::MAX),
        ));
        if let Some(duration) = &head.transaction_valid_duration {
            tx.valid_duration = Duration::from_secs(u64::try_from(duration.seconds).unwrap_or(0));
        }
        tx.memo = head.memo.clone();

        let mut chunks = vec![(first_id, first_group)];
        for (id, group) in groups {
            if node_ids_of(&group)? != first_nodes {
                return Err(DecodeError::malformed(
                    "transaction list",
                    "chunks are addressed to different nodes",
                ));
            }
            let data = group
                .first()
                .and_then(|e| e.body.data.clone())
                .ok_or(DecodeError::UnrecognizedEnvelope)?;
            tx.data.append_chunk(data)?;
            chunks.push((id, group));
        }

        let node_ids: Option<Vec<AccountId>> = first_nodes.iter().copied().collect();
        let chunk_ids: Option<Vec<TransactionId>> = chunks.iter().map(|(id, _)| *id).collect();
        match (chunk_ids, node_ids) {
            (Some(chunk_ids), Some(node_ids)) if !node_ids.is_empty() => {
                let frozen_chunks = chunks
                    .into_iter()
                    .zip(chunk_ids)
                    .map(|((_, group), transaction_id)| FrozenChunk {
                        transaction_id,
                        bodies: group
                            .into_iter()
                            .zip(&node_ids)
                            .map(|(entry, node)| SignedBody {
                                node_id: *node,
                                body_bytes: entry.body_bytes,
                                signatures: entry.signatures,
                            })
                            .collect(),
                    })
                    .collect();
                tx.frozen = Some(FrozenState {
                    node_ids,
                    chunks: frozen_chunks,
                });
            }
            (_, node_ids) => {
                tx.node_account_ids = node_ids.filter(|ids| !ids.is_empty());
            }
        }
        Ok(tx)
    }
}
