//! Capability traits the engine is wired up with, and the read surface it
//! exports back.

use lamina_types::{
    Block, BlockHash, BlockNumber, ChainConfig, ChainResult, Header, TotalDifficulty,
};

/// Consensus capability: header verification and sealing rules.
///
/// The header chain holds the engine for its collaborators and exposes it via
/// [`ChainReader::engine`]; it does not call into it on the hot path.
pub trait ConsensusEngine: Send + Sync + 'static {
    /// Check a header against the consensus rules of its tier.
    fn verify_header(&self, header: &Header) -> ChainResult<()>;
}

/// Execution capability: persists block bodies and the state they produce.
pub trait BlockExecutor: Send + Sync + 'static {
    /// Execute and persist a block's body and state. A failure here makes the
    /// header chain take back the header it just wrote.
    fn append(&self, block: &Block) -> ChainResult<()>;

    /// Discard the side effects of a header being trimmed off an abandoned
    /// branch. Failures are logged and the trim continues.
    fn trim(&self, header: &Header) -> ChainResult<()>;
}

/// Read surface the engine presents to consensus and execution collaborators.
pub trait ChainReader {
    /// The chain configuration fixed at genesis.
    fn config(&self) -> &ChainConfig;

    /// The consensus engine this chain was constructed with.
    fn engine(&self) -> &dyn ConsensusEngine;

    /// Header by hash and number, if present.
    fn header(&self, hash: &BlockHash, number: BlockNumber) -> Option<Header>;

    /// Header by hash alone, resolving the number first.
    fn header_by_hash(&self, hash: &BlockHash) -> Option<Header>;

    /// Canonical header at a number, if that height is populated.
    fn header_by_number(&self, number: BlockNumber) -> Option<Header>;

    /// Snapshot of the current canonical head.
    fn current_header(&self) -> Header;

    /// Total difficulty of a block; a zero vector when unrecorded.
    fn td(&self, hash: &BlockHash, number: BlockNumber) -> TotalDifficulty;

    /// Total difficulty by hash alone.
    fn td_by_hash(&self, hash: &BlockHash) -> TotalDifficulty;

    /// The canonical hash at a number, if that height is populated.
    fn canonical_hash(&self, number: BlockNumber) -> Option<BlockHash>;

    /// Full block by hash and number. A header-only view always answers
    /// `None`.
    fn block(&self, hash: &BlockHash, number: BlockNumber) -> Option<Block>;
}
