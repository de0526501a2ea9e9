//! Signing frozen transactions.
//!
//! Signing comes after freezing because the signature covers the exact
//! body bytes, and those only exist once the transaction id and node list
//! are fixed. Every body (every node, every chunk) gets its own signature
//! from each key.
//!
//! Signing is additive and idempotent per key: a second signature by the
//! same key replaces the first, so the output bytes do not change.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Transaction, TransactionData};
use crate::client::Client;
use crate::crypto::{FnSigner, PublicKey, Signer};
use crate::error::{Error, Result};
use crate::id::AccountId;

impl<D: TransactionData> Transaction<D> {
    /// Sign every body with `signer`.
    pub fn sign(&mut self, signer: impl Signer + 'static) -> Result<&mut Self> {
        self.sign_arc(Arc::new(signer))
    }

    /// Sign with an external signing function, e.g. a hardware wallet.
    pub fn sign_with<F>(&mut self, public_key: PublicKey, sign_fn: F) -> Result<&mut Self>
    where
        F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
    {
        self.sign_arc(Arc::new(FnSigner::new(public_key, sign_fn)))
    }

    /// Sign with the client's operator key.
    pub fn sign_with_operator(&mut self, client: &Client) -> Result<&mut Self> {
        let operator = client
            .operator()
            .ok_or_else(|| Error::illegal_state("client has no operator to sign with"))?;
        self.sign_arc(operator.signer())
    }

    pub(crate) fn sign_arc(&mut self, signer: Arc<dyn Signer>) -> Result<&mut Self> {
        let frozen = self
            .frozen
            .as_mut()
            .ok_or_else(|| Error::illegal_state("transaction must be frozen before signing"))?;

        let public_key = signer.public_key();
        for body in frozen.chunks.iter_mut().flat_map(|c| c.bodies.iter_mut()) {
            let signature = signer.sign(&body.body_bytes);
            body.insert_signature(public_key, signature);
        }

        match self
            .signers
            .iter()
            .position(|s| s.public_key() == public_key)
        {
            Some(i) => self.signers[i] = signer,
            None => self.signers.push(signer),
        }
        Ok(self)
    }

    /// Attach a signature produced elsewhere.
    ///
    /// A raw signature covers one body, so this only works when there is
    /// exactly one: one node, one chunk.
    pub fn add_signature(&mut self, public_key: PublicKey, signature: Vec<u8>) -> Result<&mut Self> {
        let frozen = self
            .frozen
            .as_mut()
            .ok_or_else(|| Error::illegal_state("transaction must be frozen before signing"))?;

        let mut bodies = frozen.chunks.iter_mut().flat_map(|c| c.bodies.iter_mut());
        let (Some(body), None) = (bodies.next(), bodies.next()) else {
            return Err(Error::illegal_state(
                "add_signature needs exactly one node and one chunk",
            ));
        };
        body.insert_signature(public_key, signature);
        Ok(self)
    }

    /// Signatures on the first chunk, per node and key.
    pub fn signatures(&self) -> Result<BTreeMap<AccountId, BTreeMap<PublicKey, Vec<u8>>>> {
        let frozen = self.require_frozen()?;
        Ok(frozen
            .chunks
            .first()
            .map(|chunk| {
                chunk
                    .bodies
                    .iter()
                    .map(|body| (body.node_id, body.signatures.iter().cloned().collect()))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Whether every body carries a signature by `public_key`.
    pub fn is_signed_by(&self, public_key: &PublicKey) -> bool {
        self.frozen
            .as_ref()
            .map(|f| f.bodies().all(|b| b.is_signed_by(public_key)))
            .unwrap_or(false)
    }
}
