//! Blake2b hashing for content-addressed ids.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::Serialize;

use crate::CryptoError;

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Hash the canonical JSON encoding of `value`.
///
/// Struct fields serialize in declaration order and `serde_json::Map` keeps
/// keys sorted, so equal values always produce equal digests.
pub fn content_hash<T: Serialize + ?Sized>(value: &T) -> Result<[u8; 32], CryptoError> {
    let bytes = serde_json::to_vec(value)?;
    Ok(blake2b_256(&bytes))
}
