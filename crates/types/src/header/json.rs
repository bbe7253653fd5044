//! Interoperable JSON form of [`Header`].
//!
//! Hierarchical fields are arrays with one entry per tier, quantities are
//! `0x`-prefixed hex strings without leading zeros, byte sequences are hex
//! encoded. Encoding includes the computed `hash`; decoding requires the
//! field to be present but discards its value, recomputing the identity from
//! content. Every field except `nonce` is required on decode.

use super::{Header, Location};
use crate::{
    error::HeaderError, Address, BlockHash, BlockNonce, Bloom, Bytes, U256, U64,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// Wire representation of a header.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonHeader {
    #[serde(rename = "parentHash")]
    pub parent_hash: Vec<BlockHash>,
    #[serde(rename = "sha3Uncles")]
    pub uncle_hash: Vec<BlockHash>,
    #[serde(rename = "miner")]
    pub coinbase: Vec<Address>,
    #[serde(rename = "stateRoot")]
    pub state_root: Vec<BlockHash>,
    #[serde(rename = "transactionsRoot")]
    pub tx_root: Vec<BlockHash>,
    #[serde(rename = "extTransactionsRoot")]
    pub etx_root: Vec<BlockHash>,
    #[serde(rename = "manifestHash")]
    pub manifest_hash: Vec<BlockHash>,
    #[serde(rename = "receiptsRoot")]
    pub receipt_root: Vec<BlockHash>,
    #[serde(rename = "logsBloom")]
    pub bloom: Vec<Bloom>,
    pub difficulty: Vec<U256>,
    pub number: Vec<U256>,
    #[serde(rename = "gasLimit")]
    pub gas_limit: Vec<U64>,
    #[serde(rename = "gasUsed")]
    pub gas_used: Vec<U64>,
    #[serde(rename = "baseFeePerGas")]
    pub base_fee: Vec<U256>,
    pub location: Bytes,
    pub timestamp: U64,
    #[serde(rename = "extraData")]
    pub extra: Bytes,
    #[serde(default)]
    pub nonce: Option<BlockNonce>,
    /// Self-describing identity. Must be present on decode, but the value is
    /// discarded in favor of the recomputed content hash.
    pub hash: BlockHash,
}

impl Header {
    /// The wire form of this header, identity hash included.
    pub fn to_json(&self) -> JsonHeader {
        JsonHeader {
            parent_hash: self.parent_hash.clone(),
            uncle_hash: self.uncle_hash.clone(),
            coinbase: self.coinbase.clone(),
            state_root: self.state_root.clone(),
            tx_root: self.tx_root.clone(),
            etx_root: self.etx_root.clone(),
            manifest_hash: self.manifest_hash.clone(),
            receipt_root: self.receipt_root.clone(),
            bloom: self.bloom.clone(),
            difficulty: self.difficulty.clone(),
            number: self.number.clone(),
            gas_limit: self.gas_limit.iter().copied().map(U64::from).collect(),
            gas_used: self.gas_used.iter().copied().map(U64::from).collect(),
            base_fee: self.base_fee.clone(),
            location: Bytes::copy_from_slice(self.location.as_bytes()),
            timestamp: U64::from(self.timestamp),
            extra: self.extra.clone(),
            nonce: Some(self.nonce),
            hash: self.hash(),
        }
    }
}

fn tier_len<T>(field: &'static str, value: &[T], depth: usize) -> Result<(), HeaderError> {
    if value.len() != depth {
        return Err(HeaderError::TierLength { field, expected: depth, actual: value.len() });
    }
    Ok(())
}

impl TryFrom<JsonHeader> for Header {
    type Error = HeaderError;

    /// Rebuild a header from its wire form. Every hierarchical field must
    /// span the same number of tiers.
    fn try_from(json: JsonHeader) -> Result<Self, Self::Error> {
        let depth = json.number.len();
        if depth == 0 {
            return Err(HeaderError::EmptyHierarchy);
        }
        tier_len("parentHash", &json.parent_hash, depth)?;
        tier_len("sha3Uncles", &json.uncle_hash, depth)?;
        tier_len("miner", &json.coinbase, depth)?;
        tier_len("stateRoot", &json.state_root, depth)?;
        tier_len("transactionsRoot", &json.tx_root, depth)?;
        tier_len("extTransactionsRoot", &json.etx_root, depth)?;
        tier_len("manifestHash", &json.manifest_hash, depth)?;
        tier_len("receiptsRoot", &json.receipt_root, depth)?;
        tier_len("logsBloom", &json.bloom, depth)?;
        tier_len("difficulty", &json.difficulty, depth)?;
        tier_len("gasLimit", &json.gas_limit, depth)?;
        tier_len("gasUsed", &json.gas_used, depth)?;
        tier_len("baseFeePerGas", &json.base_fee, depth)?;

        Ok(Header {
            parent_hash: json.parent_hash,
            uncle_hash: json.uncle_hash,
            coinbase: json.coinbase,
            state_root: json.state_root,
            tx_root: json.tx_root,
            etx_root: json.etx_root,
            manifest_hash: json.manifest_hash,
            receipt_root: json.receipt_root,
            bloom: json.bloom,
            difficulty: json.difficulty,
            number: json.number,
            gas_limit: json.gas_limit.iter().map(|g| g.to::<u64>()).collect(),
            gas_used: json.gas_used.iter().map(|g| g.to::<u64>()).collect(),
            base_fee: json.base_fee,
            location: Location::try_from(json.location.as_ref())?,
            timestamp: json.timestamp.to::<u64>(),
            extra: json.extra,
            nonce: json.nonce.unwrap_or_default(),
            hash: OnceCell::new(),
        })
    }
}
