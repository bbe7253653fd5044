//! Hashing primitives for chain identities.

use crate::{encode, BlockHash};
use serde::Serialize;

/// Hash function used for every identity in the engine.
pub type DefaultHashFunction = blake3::Hasher;

/// Length of a digest in bytes.
pub const DIGEST_LENGTH: usize = 32;

/// Trait implemented by values whose identity is the hash of their canonical
/// encoding.
pub trait Hashable {
    /// The identity hash of this value.
    fn hash(&self) -> BlockHash;
}

/// Hash a value's canonical encoding.
///
/// Two values with identical content always produce identical hashes because
/// the encoding is canonical.
pub fn hash_encoded<T: Serialize>(value: &T) -> BlockHash {
    let mut hasher = DefaultHashFunction::new();
    hasher.update(&encode(value));
    BlockHash::from(*hasher.finalize().as_bytes())
}
