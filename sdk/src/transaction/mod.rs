//! # Transaction Module
//!
//! Building, freezing, signing, encoding and submitting ledger transactions.
//!
//! ## Architecture
//!
//! ```text
//! mod.rs     : Transaction<D>: the builder / frozen state machine, execution
//! chunked.rs : ChunkConfig, ChunkInfo: splitting oversized payloads
//! codec.rs   : the three-layer envelope, SignedBody, DecodeError
//! signing.rs : sign, sign_with, add_signature, signatures
//! wrapped.rs : WrappedTransaction + the kind table (decode any bytes)
//! kinds/     : one TransactionData impl per transaction kind
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build**: set fields. Every body setter fails once frozen.
//! 2. **Freeze**: fix the transaction id and node list, and serialize one
//!    body per `(transaction id, node)` pair. There is no unfreeze.
//! 3. **Sign**: any number of times, with any number of keys. Each
//!    signature is computed over every body.
//! 4. **Execute**: send to one node at a time until one accepts. Chunked
//!    kinds send their chunks strictly in order.
//! 5. **Resolve**: poll for the receipt through the returned
//!    [`TransactionResponse`].
//!
//! ## Design Decisions
//!
//! - One generic `Transaction<D>` holds everything that is common (ids,
//!   fee, memo, signatures, frozen bodies). A kind only says how to turn its
//!   own fields into the body's `data` oneof and back.
//! - Frozen bodies are kept as bytes. Signatures are over those exact
//!   bytes, so the bodies are never re-encoded after freezing except when an
//!   expired id is regenerated, which re-signs with every known signer.

pub mod chunked;
mod codec;
pub mod kinds;
mod signing;
pub mod wrapped;

pub use chunked::{ChunkConfig, ChunkInfo};
pub use codec::DecodeError;
pub use kinds::*;
pub use wrapped::{decode, KindEntry, WrappedTransaction, KINDS};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use prost::Message;
use tracing::{debug, info};

use crate::client::Client;
use crate::config::{
    ExecutionOverrides, DEFAULT_MAX_TRANSACTION_FEE, DEFAULT_TRANSACTION_VALID_DURATION,
    MAX_MEMO_LENGTH,
};
use crate::crypto::Signer;
use crate::error::{Error, Result};
use crate::execute::{self, Execute};
use crate::hbar::Hbar;
use crate::id::{AccountId, TransactionId};
use crate::network::TransportRequest;
use crate::proto;
use crate::response::TransactionResponse;
use crate::status::{Status, StatusBucket, StatusTable};
use codec::SignedBody;

// ---------------------------------------------------------------------------
// TransactionData
// ---------------------------------------------------------------------------

/// The kind-specific half of a transaction.
pub trait TransactionData: Clone + fmt::Debug + Send + Sync + 'static {
    /// gRPC method this kind is submitted through.
    fn method(&self) -> &'static str;

    fn default_max_transaction_fee(&self) -> Hbar {
        DEFAULT_MAX_TRANSACTION_FEE
    }

    /// Encode into the body's `data` oneof. Chunked kinds receive the chunk
    /// being encoded; everyone else gets `None`. Fails when an id does not
    /// fit the wire format.
    fn to_body_data(&self, chunk: Option<&ChunkInfo<'_>>) -> Result<proto::transaction_body::Data>;

    /// The inverse of `to_body_data` for a single body.
    fn from_body_data(data: proto::transaction_body::Data) -> std::result::Result<Self, DecodeError>;

    /// The payload to split and the limits to split it with. `None` for
    /// kinds that never chunk.
    fn chunking(&self) -> Option<(&[u8], ChunkConfig)> {
        None
    }

    /// Fold a later chunk's body back into `self` when decoding a list.
    fn append_chunk(
        &mut self,
        _data: proto::transaction_body::Data,
    ) -> std::result::Result<(), DecodeError> {
        Err(DecodeError::malformed(
            "transaction list",
            "several transaction ids for a kind that does not chunk",
        ))
    }

    /// File appends must land in order on-ledger, not just be accepted in
    /// order, so they wait for each chunk's receipt.
    fn wait_for_receipt_between_chunks(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Frozen state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FrozenChunk {
    pub transaction_id: TransactionId,
    /// One per node, in node order.
    pub bodies: Vec<SignedBody>,
}

impl FrozenChunk {
    fn body_for(&self, node: AccountId) -> Result<&SignedBody> {
        self.bodies
            .iter()
            .find(|b| b.node_id == node)
            .ok_or_else(|| Error::illegal_state(format!("no body frozen for node {node}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FrozenState {
    pub node_ids: Vec<AccountId>,
    /// Never empty.
    pub chunks: Vec<FrozenChunk>,
}

impl FrozenState {
    fn first_body(&self) -> Result<&SignedBody> {
        self.chunks
            .first()
            .and_then(|c| c.bodies.first())
            .ok_or_else(|| Error::illegal_state("frozen transaction has no bodies"))
    }

    fn bodies(&self) -> impl Iterator<Item = &SignedBody> {
        self.chunks.iter().flat_map(|c| c.bodies.iter())
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A ledger transaction of kind `D`.
///
/// ```
/// use strata_sdk::{AccountId, Hbar, PrivateKey, TransactionId, TransferTransaction};
///
/// let alice = AccountId::new(0, 0, 1001);
/// let bob = AccountId::new(0, 0, 1002);
/// let key = PrivateKey::generate();
///
/// let mut tx = TransferTransaction::new();
/// tx.add_hbar_transfer(alice, Hbar::new(-1))?
///     .add_hbar_transfer(bob, Hbar::new(1))?
///     .set_transaction_id(TransactionId::generate(alice))?
///     .set_node_account_ids(vec![AccountId::new(0, 0, 3)])?
///     .freeze()?
///     .sign(key)?;
///
/// let bytes = tx.to_bytes()?;
/// assert!(!bytes.is_empty());
/// # Ok::<(), strata_sdk::Error>(())
/// ```
#[derive(Clone)]
pub struct Transaction<D> {
    data: D,
    transaction_id: Option<TransactionId>,
    node_account_ids: Option<Vec<AccountId>>,
    max_transaction_fee: Option<Hbar>,
    valid_duration: Duration,
    memo: String,
    regenerate_transaction_id: Option<bool>,
    overrides: ExecutionOverrides,
    /// Everyone who signed through `sign`, kept so an id regeneration can
    /// re-sign. Signatures added as raw bytes cannot be recomputed.
    signers: Vec<Arc<dyn Signer>>,
    frozen: Option<FrozenState>,
}

impl<D: TransactionData + Default> Default for Transaction<D> {
    fn default() -> Self {
        Self::from_data(D::default())
    }
}

impl<D: TransactionData + Default> Transaction<D> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<D: TransactionData> Transaction<D> {
    pub(crate) fn from_data(data: D) -> Self {
        Self {
            data,
            transaction_id: None,
            node_account_ids: None,
            max_transaction_fee: None,
            valid_duration: DEFAULT_TRANSACTION_VALID_DURATION,
            memo: String::new(),
            regenerate_transaction_id: None,
            overrides: ExecutionOverrides::default(),
            signers: Vec::new(),
            frozen: None,
        }
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    fn require_not_frozen(&self) -> Result<()> {
        if self.is_frozen() {
            return Err(Error::illegal_state(
                "transaction is frozen and can no longer be modified",
            ));
        }
        Ok(())
    }

    pub(crate) fn require_frozen(&self) -> Result<&FrozenState> {
        self.frozen
            .as_ref()
            .ok_or_else(|| Error::illegal_state("transaction must be frozen first"))
    }

    /// Mutable access to the kind's fields, refused once frozen.
    pub(crate) fn data_mut(&mut self) -> Result<&mut D> {
        self.require_not_frozen()?;
        Ok(&mut self.data)
    }

    // -----------------------------------------------------------------------
    // Body fields
    // -----------------------------------------------------------------------

    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    pub fn set_transaction_id(&mut self, id: TransactionId) -> Result<&mut Self> {
        self.require_not_frozen()?;
        self.transaction_id = Some(id);
        Ok(self)
    }

    /// The frozen node list, or the explicitly set one before freezing.
    pub fn node_account_ids(&self) -> Option<&[AccountId]> {
        match &self.frozen {
            Some(frozen) => Some(&frozen.node_ids),
            None => self.node_account_ids.as_deref(),
        }
    }

    /// Restrict submission to exactly these nodes, tried in this order.
    pub fn set_node_account_ids(&mut self, ids: Vec<AccountId>) -> Result<&mut Self> {
        self.require_not_frozen()?;
        if ids.is_empty() {
            return Err(Error::validation("node_account_ids", "must not be empty"));
        }
        for id in &ids {
            id.require_num("node_account_ids")?;
        }
        self.node_account_ids = Some(ids);
        Ok(self)
    }

    pub fn max_transaction_fee(&self) -> Option<Hbar> {
        self.max_transaction_fee
    }

    pub fn set_max_transaction_fee(&mut self, fee: Hbar) -> Result<&mut Self> {
        self.require_not_frozen()?;
        if fee.is_negative() {
            return Err(Error::validation("max_transaction_fee", "must not be negative"));
        }
        self.max_transaction_fee = Some(fee);
        Ok(self)
    }

    pub fn transaction_valid_duration(&self) -> Duration {
        self.valid_duration
    }

    /// Carried on the wire in whole seconds.
    pub fn set_transaction_valid_duration(&mut self, duration: Duration) -> Result<&mut Self> {
        self.require_not_frozen()?;
        if duration.as_secs() == 0 {
            return Err(Error::validation(
                "transaction_valid_duration",
                "must be at least one second",
            ));
        }
        self.valid_duration = duration;
        Ok(self)
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    pub fn set_memo(&mut self, memo: impl Into<String>) -> Result<&mut Self> {
        self.require_not_frozen()?;
        let memo = memo.into();
        if memo.len() > MAX_MEMO_LENGTH {
            return Err(Error::validation(
                "memo",
                format!("{} bytes, at most {MAX_MEMO_LENGTH} allowed", memo.len()),
            ));
        }
        self.memo = memo;
        Ok(self)
    }

    // -----------------------------------------------------------------------
    // Execution settings (not part of the body, so not frozen-gated)
    // -----------------------------------------------------------------------

    pub fn regenerate_transaction_id(&self) -> Option<bool> {
        self.regenerate_transaction_id
    }

    /// Overrides the client's policy for this transaction.
    pub fn set_regenerate_transaction_id(&mut self, regenerate: bool) -> &mut Self {
        self.regenerate_transaction_id = Some(regenerate);
        self
    }

    pub fn set_max_attempts(&mut self, attempts: u32) -> Result<&mut Self> {
        self.overrides.set_max_attempts(attempts)?;
        Ok(self)
    }

    pub fn set_min_backoff(&mut self, min: Duration) -> Result<&mut Self> {
        self.overrides.set_min_backoff(min)?;
        Ok(self)
    }

    pub fn set_max_backoff(&mut self, max: Duration) -> Result<&mut Self> {
        self.overrides.set_max_backoff(max)?;
        Ok(self)
    }

    pub fn set_request_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.overrides.request_timeout = Some(timeout);
        self
    }

    pub fn set_grpc_deadline(&mut self, deadline: Duration) -> &mut Self {
        self.overrides.grpc_deadline = Some(deadline);
        self
    }

    // -----------------------------------------------------------------------
    // Freeze
    // -----------------------------------------------------------------------

    /// Freeze with an explicitly set transaction id and node list.
    pub fn freeze(&mut self) -> Result<&mut Self> {
        self.freeze_inner(None)
    }

    /// Freeze, filling in whatever is unset from `client`: a transaction id
    /// generated for the operator, nodes picked from the network, the
    /// client's default max fee.
    pub fn freeze_with(&mut self, client: &Client) -> Result<&mut Self> {
        self.freeze_inner(Some(client))
    }

    fn freeze_inner(&mut self, client: Option<&Client>) -> Result<&mut Self> {
        self.require_not_frozen()?;

        let transaction_id = match (self.transaction_id, client.and_then(Client::operator_account_id)) {
            (Some(id), _) => id,
            (None, Some(payer)) => TransactionId::generate(payer),
            (None, None) => {
                return Err(Error::illegal_state(
                    "no transaction id set and no operator to generate one for",
                ))
            }
        };

        let node_ids = match (&self.node_account_ids, client) {
            (Some(ids), _) => ids.clone(),
            (None, Some(client)) => client
                .network()
                .node_ids_for_execute(client.max_nodes_per_transaction()),
            (None, None) => {
                return Err(Error::illegal_state(
                    "no node account ids set and no client to pick them from",
                ))
            }
        };
        if node_ids.is_empty() {
            return Err(Error::illegal_state("no nodes to freeze the transaction for"));
        }

        let fee = self
            .max_transaction_fee
            .or_else(|| client.and_then(Client::default_max_transaction_fee))
            .unwrap_or_else(|| self.data.default_max_transaction_fee());

        // Nothing is written back until every chunk has been built.
        let chunks = self.build_chunks(transaction_id, &node_ids, fee)?;
        debug!(
            transaction_id = %transaction_id,
            nodes = node_ids.len(),
            chunks = chunks.len(),
            "transaction frozen"
        );

        self.transaction_id = Some(transaction_id);
        self.max_transaction_fee = Some(fee);
        self.frozen = Some(FrozenState { node_ids, chunks });
        Ok(self)
    }

    fn build_chunks(
        &self,
        initial: TransactionId,
        node_ids: &[AccountId],
        fee: Hbar,
    ) -> Result<Vec<FrozenChunk>> {
        let Some((payload, config)) = self.data.chunking() else {
            return Ok(vec![self.build_chunk(initial, node_ids, fee, None)?]);
        };

        let total = config.plan(payload.len())?;
        (0..total)
            .map(|index| {
                let info = ChunkInfo {
                    index,
                    total,
                    initial_transaction_id: initial,
                    transaction_id: initial.chunk_id(index),
                    slice: config.slice(payload, index),
                };
                self.build_chunk(info.transaction_id, node_ids, fee, Some(&info))
            })
            .collect()
    }

    fn build_chunk(
        &self,
        transaction_id: TransactionId,
        node_ids: &[AccountId],
        fee: Hbar,
        chunk: Option<&ChunkInfo<'_>>,
    ) -> Result<FrozenChunk> {
        let data = self.data.to_body_data(chunk)?;
        let wire_id = transaction_id.to_proto()?;
        let bodies = node_ids
            .iter()
            .map(|node| {
                let body = proto::TransactionBody {
                    transaction_id: Some(wire_id.clone()),
                    node_account_id: Some(node.to_account_proto()?),
                    transaction_fee: u64::try_from(fee.to_tinybars()).unwrap_or(0),
                    transaction_valid_duration: Some(proto::Duration {
                        seconds: self.valid_duration.as_secs() as i64,
                    }),
                    memo: self.memo.clone(),
                    data: Some(data.clone()),
                };
                Ok(SignedBody::new(*node, body.encode_to_vec()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(FrozenChunk {
            transaction_id,
            bodies,
        })
    }

    /// Swap an expired id for a fresh one and rebuild every body.
    ///
    /// Signers registered through `sign` re-sign the new bodies; signatures
    /// that were added as raw bytes are gone.
    fn regenerate(&mut self) -> Result<TransactionId> {
        let frozen = self.require_frozen()?;
        let node_ids = frozen.node_ids.clone();
        let old = frozen
            .chunks
            .first()
            .map(|c| c.transaction_id)
            .ok_or_else(|| Error::illegal_state("frozen transaction has no chunks"))?;

        let mut fresh = TransactionId::generate(old.account_id);
        if fresh.valid_start <= old.valid_start {
            fresh.valid_start = old.valid_start + ChronoDuration::nanoseconds(1);
        }

        let fee = self
            .max_transaction_fee
            .unwrap_or_else(|| self.data.default_max_transaction_fee());
        let mut chunks = self.build_chunks(fresh, &node_ids, fee)?;
        for signer in &self.signers {
            let public_key = signer.public_key();
            for body in chunks.iter_mut().flat_map(|c| c.bodies.iter_mut()) {
                let signature = signer.sign(&body.body_bytes);
                body.insert_signature(public_key, signature);
            }
        }

        self.transaction_id = Some(fresh);
        self.frozen = Some(FrozenState { node_ids, chunks });
        Ok(fresh)
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Freeze (if needed), sign with the operator when it is the payer,
    /// submit, and return the first chunk's response.
    pub async fn execute(&mut self, client: &Client) -> Result<TransactionResponse> {
        self.execute_all(client)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::illegal_state("no chunks were submitted"))
    }

    /// Submit every chunk in order and return one response per chunk.
    ///
    /// The first chunk that cannot be submitted fails the whole call; later
    /// chunks are never sent.
    pub async fn execute_all(&mut self, client: &Client) -> Result<Vec<TransactionResponse>> {
        if !self.is_frozen() {
            self.freeze_with(client)?;
        }
        self.sign_with_operator_if_payer(client)?;

        let total = self.require_frozen()?.chunks.len();
        let wait_between = self.data.wait_for_receipt_between_chunks();
        let mut responses = Vec::with_capacity(total);

        for index in 0..total {
            let mut chunk = ChunkExecution {
                transaction: &mut *self,
                index,
            };
            let response = execute::execute(client, &mut chunk).await?;
            info!(
                transaction_id = %response.transaction_id,
                node = %response.node_id,
                chunk = index + 1,
                total,
                "transaction accepted"
            );
            if wait_between && index + 1 < total {
                response.get_receipt(client).await?;
            }
            responses.push(response);
        }
        Ok(responses)
    }

    fn sign_with_operator_if_payer(&mut self, client: &Client) -> Result<()> {
        let Some(operator) = client.operator() else {
            return Ok(());
        };
        if self.transaction_id.map(|id| id.account_id) != Some(operator.account_id) {
            return Ok(());
        }
        let public_key = operator.public_key();
        if self.signers.iter().any(|s| s.public_key() == public_key) {
            return Ok(());
        }
        self.sign_arc(operator.signer())?;
        Ok(())
    }
}

impl<D: fmt::Debug> fmt::Debug for Transaction<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let signers: Vec<String> = self
            .signers
            .iter()
            .map(|s| s.public_key().to_string())
            .collect();
        f.debug_struct("Transaction")
            .field("data", &self.data)
            .field("transaction_id", &self.transaction_id)
            .field("node_account_ids", &self.node_account_ids)
            .field("max_transaction_fee", &self.max_transaction_fee)
            .field("memo", &self.memo)
            .field("signers", &signers)
            .field("frozen", &self.frozen.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Engine glue
// ---------------------------------------------------------------------------

/// One chunk of a frozen transaction, as seen by the engine.
struct ChunkExecution<'a, D> {
    transaction: &'a mut Transaction<D>,
    index: usize,
}

impl<D: TransactionData> ChunkExecution<'_, D> {
    fn chunk(&self) -> Result<&FrozenChunk> {
        self.transaction
            .require_frozen()?
            .chunks
            .get(self.index)
            .ok_or_else(|| Error::illegal_state(format!("no chunk {}", self.index)))
    }
}

impl<D: TransactionData> Execute for ChunkExecution<'_, D> {
    type Response = proto::TransactionResponse;
    type Output = TransactionResponse;

    fn candidates(&self) -> Vec<AccountId> {
        self.transaction
            .frozen
            .as_ref()
            .map(|f| f.node_ids.clone())
            .unwrap_or_default()
    }

    fn overrides(&self) -> &ExecutionOverrides {
        &self.transaction.overrides
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        self.chunk().ok().map(|c| c.transaction_id)
    }

    fn make_request(&self, node: AccountId) -> Result<TransportRequest> {
        let body = self.chunk()?.body_for(node)?;
        Ok(TransportRequest::new(
            self.transaction.data.method(),
            body.to_transaction().encode_to_vec(),
        ))
    }

    fn classify(&self, response: &Self::Response, table: &StatusTable) -> (Status, StatusBucket) {
        let status = Status::from_code(response.node_transaction_precheck_code);
        (status, table.classify_precheck(status))
    }

    fn regenerate_transaction_id(&mut self, client: &Client) -> Result<bool> {
        let allowed = self
            .transaction
            .regenerate_transaction_id
            .unwrap_or_else(|| client.execution_config().regenerate_transaction_ids());
        // A chained chunk id cannot move without moving every other chunk.
        let single_chunk = self.transaction.require_frozen()?.chunks.len() == 1;
        if !allowed || !single_chunk {
            return Ok(false);
        }
        self.transaction.regenerate()?;
        Ok(true)
    }

    fn make_output(
        &self,
        _response: Self::Response,
        node: AccountId,
        status: Status,
    ) -> Result<TransactionResponse> {
        let chunk = self.chunk()?;
        Ok(TransactionResponse {
            node_id: node,
            transaction_id: chunk.transaction_id,
            transaction_hash: chunk.body_for(node)?.hash(),
            precheck_status: status,
        })
    }
}
