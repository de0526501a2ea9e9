//! # Hashing Utilities
//!
//! The ledger identifies a submitted transaction by the SHA-384 digest of
//! its signed-transaction bytes (the middle envelope layer, signatures
//! included). That is the only hash this SDK needs, so it is the only one
//! here.

use sha2::{Digest, Sha384};

/// Length in bytes of a transaction hash.
pub const TRANSACTION_HASH_LENGTH: usize = 48;

/// Compute the SHA-384 digest of `data`.
///
/// # Example
///
/// ```
/// use strata_sdk::crypto::sha384;
///
/// assert_eq!(sha384(b"strata").len(), 48);
/// ```
pub fn sha384(data: &[u8]) -> [u8; TRANSACTION_HASH_LENGTH] {
    let mut hasher = Sha384::new();
    hasher.update(data);
    let mut output = [0u8; TRANSACTION_HASH_LENGTH];
    output.copy_from_slice(&hasher.finalize());
    output
}
