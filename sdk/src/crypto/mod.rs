//! # Cryptographic Primitives
//!
//! Thin, type-safe wrappers around audited implementations:
//!
//! - **Ed25519** (ed25519-dalek) for transaction signatures.
//! - **SHA-384** (sha2) for transaction hashes.
//!
//! Nothing in here is clever, and that is the point.

pub mod hash;
pub mod keys;

pub use hash::{sha384, TRANSACTION_HASH_LENGTH};
pub use keys::{FnSigner, KeyError, PrivateKey, PublicKey, Signer};
