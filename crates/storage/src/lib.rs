// SPDX-License-Identifier: MIT or Apache-2.0
//! Persistent storage types for the header chain.

#![warn(future_incompatible, nonstandard_style, rust_2018_idioms, rust_2021_compatibility)]

mod cache;
mod header_store;
pub mod mem_db;

pub use cache::*;
pub use header_store::*;
pub use mem_db::MemDatabase;

pub use lamina_types::error::{StoreError, StoreResult};

/// The datastore column family names.
const HEADERS_CF: &str = "headers";
const HEADER_NUMBERS_CF: &str = "header_numbers";
const CANONICAL_HASHES_CF: &str = "canonical_hashes";
const TOTAL_DIFFICULTIES_CF: &str = "total_difficulties";
const HEAD_HASH_CF: &str = "head_hash";

/// Key under which the head block hash lives in its single-row table.
pub(crate) const HEAD_HASH_KEY: u8 = 0;

macro_rules! tables {
    ( $($table:ident;$name:expr;<$K:ty, $V:ty>),*) => {
            $(
                #[derive(Debug)]
                pub struct $table {}
                impl lamina_types::Table for $table {
                    type Key = $K;
                    type Value = $V;

                    const NAME: &'static str = $name;
                }
            )*
    };
}

pub mod tables {
    use lamina_types::{BlockHash, BlockNumber, Header, TotalDifficulty};

    tables!(
        // Headers keyed by (number, hash): one chain height groups together
        // on disk, and competing headers at a height coexist.
        Headers;crate::HEADERS_CF;<(BlockNumber, BlockHash), Header>,
        // Reverse index from a header's hash to its context-tier number.
        HeaderNumbers;crate::HEADER_NUMBERS_CF;<BlockHash, BlockNumber>,
        // The canonical chain: exactly one hash per populated number.
        CanonicalHashes;crate::CANONICAL_HASHES_CF;<BlockNumber, BlockHash>,
        // Total difficulty vectors written back by the fork-choice layer.
        TotalDifficulties;crate::TOTAL_DIFFICULTIES_CF;<(BlockNumber, BlockHash), TotalDifficulty>,
        // Single-row table holding the persisted head block hash.
        HeadHash;crate::HEAD_HASH_CF;<u8, BlockHash>
    );
}

/// Open an in-memory database with every header chain table registered.
pub fn open_memory_db() -> MemDatabase {
    let db = MemDatabase::new();
    db.open_table::<tables::Headers>();
    db.open_table::<tables::HeaderNumbers>();
    db.open_table::<tables::CanonicalHashes>();
    db.open_table::<tables::TotalDifficulties>();
    db.open_table::<tables::HeadHash>();
    db
}
