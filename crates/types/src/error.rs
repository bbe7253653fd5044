//! Error types for the header chain engine.

use crate::BlockHash;
use thiserror::Error;

/// Return an error if the condition is false.
#[macro_export(local_inner_macros)]
macro_rules! ensure {
    ($cond:expr, $e:expr) => {
        if !($cond) {
            return Err($e);
        }
    };
}

/// Failures from the key-value layer are propagated unchanged.
pub type StoreError = eyre::Report;

/// Convenience type to propagate store errors.
pub type StoreResult<T> = eyre::Result<T>;

/// Result alias for engine-level operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Errors surfaced by the public operations of the header chain.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The underlying key-value store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A parent lookup on the retiring branch came back empty during branch
    /// alignment.
    #[error("invalid old chain")]
    InvalidOldChain,

    /// A parent lookup on the retained branch came back empty during branch
    /// alignment.
    #[error("invalid new chain")]
    InvalidNewChain,

    /// The block executor rejected a block.
    #[error("block executor rejected block: {0}")]
    Executor(String),

    /// A header expected to be present could not be fetched.
    #[error("header {0} not found")]
    HeaderNotFound(BlockHash),

    /// A context index fell outside the configured hierarchy.
    #[error("context {context} is outside the allowable range 0..={max}")]
    ContextOutOfRange { context: usize, max: usize },

    /// A location byte fell outside the configured region/zone bounds.
    #[error("the provided location is outside the allowable {axis} range")]
    LocationOutOfRange { axis: &'static str },

    /// A long walk was abandoned because the interrupt was triggered.
    #[error("operation interrupted")]
    Interrupted,

    /// No genesis header could be loaded at construction.
    #[error("genesis header not found in the store")]
    NoGenesis,
}

/// Errors produced while validating or decoding a header.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    /// A per-tier field does not span the full hierarchy depth.
    #[error("field '{field}' has {actual} tiers, expected {expected}")]
    TierLength { field: &'static str, expected: usize, actual: usize },

    /// The hierarchy depth resolved to zero.
    #[error("header carries no tiers")]
    EmptyHierarchy,

    /// The location is not a (region, zone) byte pair.
    #[error("location has {0} bytes, expected 2")]
    LocationLength(usize),
}
