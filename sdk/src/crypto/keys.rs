//! # Key Management
//!
//! Ed25519 keys for operators, payers and every other party that signs a
//! transaction body.
//!
//! The transaction state machine never touches key material directly. It
//! only sees the [`Signer`] capability: "give me your public key" and
//! "sign these bytes". [`PrivateKey`] is the in-process implementation;
//! a hardware wallet or remote KMS plugs in through [`FnSigner`] or its own
//! `Signer` impl.
//!
//! ## Security considerations
//!
//! - Private keys are zeroized on drop (ed25519-dalek does this for us).
//! - Key generation uses `OsRng`.
//! - Key bytes are never logged, and `Debug` only ever prints the public half.

use ed25519_dalek::{
    Signature as DalekSignature, Signer as DalekSigner, SigningKey, Verifier, VerifyingKey,
    SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::proto;

/// Errors that can occur during key operations.
///
/// Deliberately vague: error messages are not the place to describe key
/// material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid private key bytes: wrong length or not valid hex")]
    InvalidPrivateKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,
}

// ---------------------------------------------------------------------------
// Signer capability
// ---------------------------------------------------------------------------

/// Anything that can produce a signature over transaction body bytes.
///
/// Implementations must be pure with respect to the message: signing the
/// same bytes twice yields a signature that verifies both times. Ed25519
/// goes further and yields the *same* signature, which is what makes
/// re-serialization after signing byte-stable.
pub trait Signer: Send + Sync {
    /// The public key that verifies this signer's output.
    fn public_key(&self) -> PublicKey;

    /// Sign `message`, returning raw signature bytes.
    fn sign(&self, message: &[u8]) -> Vec<u8>;
}

impl<S: Signer + ?Sized> Signer for Arc<S> {
    fn public_key(&self) -> PublicKey {
        (**self).public_key()
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        (**self).sign(message)
    }
}

/// Adapts an arbitrary signing function (HSM, remote wallet, test double)
/// into a [`Signer`].
pub struct FnSigner<F> {
    public_key: PublicKey,
    sign_fn: F,
}

impl<F> FnSigner<F>
where
    F: Fn(&[u8]) -> Vec<u8> + Send + Sync,
{
    pub fn new(public_key: PublicKey, sign_fn: F) -> Self {
        Self {
            public_key,
            sign_fn,
        }
    }
}

impl<F> Signer for FnSigner<F>
where
    F: Fn(&[u8]) -> Vec<u8> + Send + Sync,
{
    fn public_key(&self) -> PublicKey {
        self.public_key
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        (self.sign_fn)(message)
    }
}

impl<F> fmt::Debug for FnSigner<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FnSigner(pub={})", self.public_key)
    }
}

// ---------------------------------------------------------------------------
// PrivateKey
// ---------------------------------------------------------------------------

/// An Ed25519 private key.
///
/// `PrivateKey` does not implement `Serialize`. Exporting a secret should be
/// a deliberate call to [`to_bytes`](Self::to_bytes), not a side effect of
/// dumping a config struct.
///
/// # Examples
///
/// ```
/// use strata_sdk::crypto::{PrivateKey, Signer};
///
/// let key = PrivateKey::generate();
/// let sig = key.sign(b"transfer 1 hbar to bob");
/// assert!(key.public_key().verify(b"transfer 1 hbar to bob", &sig));
/// ```
pub struct PrivateKey {
    signing_key: SigningKey,
}

impl PrivateKey {
    /// Generate a fresh key from the OS cryptographic RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Build a key deterministically from a 32-byte seed.
    ///
    /// In Ed25519 the seed *is* the secret key, so a weak seed is a weak key.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parse a hex-encoded 32-byte secret key.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidPrivateKey)?;
        let seed: [u8; SECRET_KEY_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// Export the raw secret bytes. Don't log them.
    pub fn to_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }
}

impl Signer for PrivateKey {
    fn public_key(&self) -> PublicKey {
        PrivateKey::public_key(self)
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

impl Clone for PrivateKey {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Public half only. A partial leak is still a leak.
        write!(f, "PrivateKey(pub={})", self.public_key())
    }
}

impl FromStr for PrivateKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// The public half of an Ed25519 key. `Copy`, hashable, safe to share.
///
/// Public keys identify signers inside a signature map and can stand in for
/// an account number as a key alias.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey {
    bytes: [u8; 32],
}

impl PublicKey {
    /// Parse raw bytes, rejecting anything that is not a valid curve point.
    pub fn from_bytes(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::from_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    pub fn to_bytes_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// Verify `signature` over `message`.
    ///
    /// Returns a plain boolean: callers want yes/no, not a failure taxonomy.
    /// Malformed signatures are simply `false`, never a panic.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        verifying_key
            .verify(message, &DalekSignature::from_bytes(&sig_bytes))
            .is_ok()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

// ---------------------------------------------------------------------------
// Wire conversions
// ---------------------------------------------------------------------------

impl PublicKey {
    pub fn to_key_proto(self) -> proto::Key {
        proto::Key {
            key: Some(proto::key::Key::Ed25519(self.bytes.to_vec())),
        }
    }

    pub fn from_key_proto(key: &proto::Key) -> Result<Self, KeyError> {
        match &key.key {
            Some(proto::key::Key::Ed25519(bytes)) => Self::from_bytes(bytes),
            _ => Err(KeyError::InvalidPublicKey),
        }
    }
}

/// Encode several keys as a key list (file keys, for instance).
pub(crate) fn key_list_to_proto(keys: &[PublicKey]) -> proto::KeyList {
    proto::KeyList {
        keys: keys.iter().map(|k| k.to_key_proto()).collect(),
    }
}

pub(crate) fn key_list_from_proto(list: &proto::KeyList) -> Result<Vec<PublicKey>, KeyError> {
    list.keys.iter().map(PublicKey::from_key_proto).collect()
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
