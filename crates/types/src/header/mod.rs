//! Hierarchy-aware block header.

mod json;

pub use json::JsonHeader;

use crate::{
    error::HeaderError, hash_encoded, Address, BlockHash, BlockNonce, Bloom, Bytes, Hashable, U256,
};
use derive_builder::Builder;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinates of a chain inside the hierarchy: a (region, zone) byte pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location([u8; 2]);

impl Location {
    /// Create a location from its region and zone bytes.
    pub const fn new(region: u8, zone: u8) -> Self {
        Self([region, zone])
    }

    pub fn region(&self) -> u8 {
        self.0[0]
    }

    pub fn zone(&self) -> u8 {
        self.0[1]
    }

    pub fn as_bytes(&self) -> &[u8; 2] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Location {
    type Error = HeaderError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let pair: [u8; 2] =
            bytes.try_into().map_err(|_| HeaderError::LocationLength(bytes.len()))?;
        Ok(Self(pair))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.region(), self.zone())
    }
}

/// Immutable block header spanning every tier of the hierarchy.
///
/// Each per-tier field holds exactly one entry per tier; tiers a producer did
/// not populate carry explicit zero values. Construct through
/// [`HeaderBuilder`], which enforces that shape. The header's identity is the
/// hash of its canonical encoding, computed lazily and cached.
#[derive(Builder, Clone, Serialize, Deserialize)]
#[builder(pattern = "owned", build_fn(skip))]
pub struct Header {
    /// Hash of the parent block, per tier.
    parent_hash: Vec<BlockHash>,
    /// Hash of the uncle set, per tier.
    uncle_hash: Vec<BlockHash>,
    /// Block reward recipient, per tier.
    coinbase: Vec<Address>,
    /// State trie root, per tier.
    state_root: Vec<BlockHash>,
    /// Transaction trie root, per tier.
    tx_root: Vec<BlockHash>,
    /// External-transaction trie root, per tier.
    etx_root: Vec<BlockHash>,
    /// Block manifest hash, per tier.
    manifest_hash: Vec<BlockHash>,
    /// Receipt trie root, per tier.
    receipt_root: Vec<BlockHash>,
    /// Log bloom filter, per tier.
    bloom: Vec<Bloom>,
    /// Proof-of-work difficulty, per tier.
    difficulty: Vec<U256>,
    /// Block height, per tier.
    number: Vec<U256>,
    /// Gas limit, per tier.
    gas_limit: Vec<u64>,
    /// Gas consumed, per tier.
    gas_used: Vec<u64>,
    /// Base fee per gas, per tier.
    base_fee: Vec<U256>,
    /// Chain coordinates of the producing node.
    location: Location,
    /// Seal timestamp in UNIX seconds.
    timestamp: u64,
    /// Arbitrary producer payload.
    extra: Bytes,
    /// Seal nonce.
    nonce: BlockNonce,
    /// Lazily computed identity hash.
    #[serde(skip)]
    #[builder(setter(skip))]
    hash: OnceCell<BlockHash>,
}

impl Header {
    /// The identity hash, computed over the canonical encoding on first use.
    pub fn hash(&self) -> BlockHash {
        *self.hash.get_or_init(|| hash_encoded(self))
    }

    /// Number of tiers this header spans.
    pub fn depth(&self) -> usize {
        self.number.len()
    }

    pub fn parent_hash(&self, tier: usize) -> BlockHash {
        self.parent_hash[tier]
    }

    pub fn uncle_hash(&self, tier: usize) -> BlockHash {
        self.uncle_hash[tier]
    }

    pub fn coinbase(&self, tier: usize) -> Address {
        self.coinbase[tier]
    }

    pub fn state_root(&self, tier: usize) -> BlockHash {
        self.state_root[tier]
    }

    pub fn tx_root(&self, tier: usize) -> BlockHash {
        self.tx_root[tier]
    }

    pub fn etx_root(&self, tier: usize) -> BlockHash {
        self.etx_root[tier]
    }

    pub fn manifest_hash(&self, tier: usize) -> BlockHash {
        self.manifest_hash[tier]
    }

    pub fn receipt_root(&self, tier: usize) -> BlockHash {
        self.receipt_root[tier]
    }

    pub fn bloom(&self, tier: usize) -> &Bloom {
        &self.bloom[tier]
    }

    pub fn difficulty(&self, tier: usize) -> &U256 {
        &self.difficulty[tier]
    }

    pub fn number(&self, tier: usize) -> &U256 {
        &self.number[tier]
    }

    /// Block height at `tier` as a machine word. Heights beyond `u64::MAX`
    /// saturate.
    pub fn number_u64(&self, tier: usize) -> u64 {
        self.number[tier].saturating_to()
    }

    /// True when this header sits at height zero of `tier`.
    pub fn is_genesis(&self, tier: usize) -> bool {
        self.number[tier].is_zero()
    }

    pub fn gas_limit(&self, tier: usize) -> u64 {
        self.gas_limit[tier]
    }

    pub fn gas_used(&self, tier: usize) -> u64 {
        self.gas_used[tier]
    }

    pub fn base_fee(&self, tier: usize) -> &U256 {
        &self.base_fee[tier]
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn extra(&self) -> &Bytes {
        &self.extra
    }

    pub fn nonce(&self) -> BlockNonce {
        self.nonce
    }
}

impl Hashable for Header {
    fn hash(&self) -> BlockHash {
        Header::hash(self)
    }
}

impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for Header {}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Header({:?}, loc {}, {})", self.number, self.location, self.hash())
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H{:?}({})", self.number, self.hash())
    }
}

impl HeaderBuilder {
    /// Build the header, padding omitted per-tier fields with zero values.
    ///
    /// The hierarchy depth is taken from the `number` field, which must be
    /// set and non-empty. Any per-tier field longer than the depth is
    /// rejected; shorter ones are padded so every slice spans the full
    /// hierarchy.
    pub fn build(self) -> Result<Header, HeaderError> {
        let number = self.number.unwrap_or_default();
        let depth = number.len();
        if depth == 0 {
            return Err(HeaderError::EmptyHierarchy);
        }

        fn pad<T: Clone + Default>(
            field: &'static str,
            value: Option<Vec<T>>,
            depth: usize,
        ) -> Result<Vec<T>, HeaderError> {
            let mut value = value.unwrap_or_default();
            if value.len() > depth {
                return Err(HeaderError::TierLength {
                    field,
                    expected: depth,
                    actual: value.len(),
                });
            }
            value.resize(depth, T::default());
            Ok(value)
        }

        Ok(Header {
            parent_hash: pad("parentHash", self.parent_hash, depth)?,
            uncle_hash: pad("sha3Uncles", self.uncle_hash, depth)?,
            coinbase: pad("miner", self.coinbase, depth)?,
            state_root: pad("stateRoot", self.state_root, depth)?,
            tx_root: pad("transactionsRoot", self.tx_root, depth)?,
            etx_root: pad("extTransactionsRoot", self.etx_root, depth)?,
            manifest_hash: pad("manifestHash", self.manifest_hash, depth)?,
            receipt_root: pad("receiptsRoot", self.receipt_root, depth)?,
            bloom: pad("logsBloom", self.bloom, depth)?,
            difficulty: pad("difficulty", self.difficulty, depth)?,
            number,
            gas_limit: pad("gasLimit", self.gas_limit, depth)?,
            gas_used: pad("gasUsed", self.gas_used, depth)?,
            base_fee: pad("baseFeePerGas", self.base_fee, depth)?,
            location: self.location.unwrap_or_default(),
            timestamp: self.timestamp.unwrap_or_default(),
            extra: self.extra.unwrap_or_default(),
            nonce: self.nonce.unwrap_or_default(),
            hash: OnceCell::new(),
        })
    }
}
