//! Encode/decode helpers for values and database keys.
//!
//! Values go through bcs: it is canonical (a value has exactly one encoding),
//! which the header hash relies on. Keys go through bincode with big-endian
//! fixed-width integers so that encoded keys binary-sort in key order; the
//! canonical-number and header tables depend on that ordering. Keep the two
//! codecs separate: bcs does not sort, bincode is not canonical for every
//! value shape we store.

pub use bcs::Error as BcsError;
use bincode::Options;
use serde::{Deserialize, Serialize};

/// Encode a database key. The produced bytes binary-sort in key order.
pub fn encode_key<T: Serialize>(obj: &T) -> Vec<u8> {
    bincode::DefaultOptions::new()
        .with_big_endian()
        .with_fixint_encoding()
        .serialize(obj)
        .expect("key type is serializable")
}

/// Decode a database key produced by [`encode_key`].
///
/// Panics on malformed bytes; only feed it keys read back from a table.
pub fn decode_key<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> T {
    bincode::DefaultOptions::new()
        .with_big_endian()
        .with_fixint_encoding()
        .deserialize(bytes)
        .expect("valid key bytes")
}

/// Encode a value to its canonical byte representation.
pub fn encode<T: Serialize>(obj: &T) -> Vec<u8> {
    bcs::to_bytes(obj).expect("value type is serializable")
}

/// Decode a value encoded with [`encode`].
///
/// Panics on malformed bytes; only feed it values read back from a table.
pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> T {
    bcs::from_bytes(bytes).expect("valid value bytes")
}

/// Fallible variant of [`decode`] for bytes of uncertain provenance.
pub fn try_decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> bcs::Result<T> {
    bcs::from_bytes(bytes)
}
