// SPDX-License-Identifier: MIT or Apache-2.0
//! Core value types shared across the lamina header chain.

mod block;
mod codec;
mod config;
mod crypto;
mod database;
#[macro_use]
pub mod error;
mod header;
mod interrupt;

pub use block::*;
pub use codec::*;
pub use config::*;
pub use crypto::*;
pub use database::*;
pub use error::*;
pub use header::*;
pub use interrupt::*;

pub use alloy_primitives::{Address, Bloom, Bytes, B256, B64, U256, U64};

/// Hash identifying a block (and its header) everywhere in the engine.
pub type BlockHash = B256;

/// Nonce carried by a sealed header.
pub type BlockNonce = B64;

/// Height of a block at a given tier of the hierarchy.
pub type BlockNumber = u64;

/// Cumulative proof-of-work weight, one entry per tier. Computed by the
/// fork-choice layer; the engine only stores and serves it.
pub type TotalDifficulty = Vec<U256>;

