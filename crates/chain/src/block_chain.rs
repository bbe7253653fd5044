//! Block-cache-fronted surface over the header chain.

use crate::{ChainReader, HeaderChain};
use lamina_types::{Block, BlockHash, BlockNumber, ChainResult, Database, Header};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Capacity of the recent-blocks cache.
pub const BLOCK_CACHE_LIMIT: usize = 256;

/// Standing of a header relative to the canonical chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockStatus {
    /// The canonical hash at the header's number is this header.
    Canonical,
    /// The height is populated by a different header.
    Side,
    /// The height is not populated at all.
    Unknown,
}

/// The outward adapter handed to collaborators that work with whole blocks.
///
/// Holds a one-way shared handle to the header chain and fronts it with a
/// recent-blocks cache: when the cache has the block, its embedded header
/// answers without consulting the header caches.
pub struct BlockChain<DB> {
    chain: Arc<HeaderChain<DB>>,
    blocks: Mutex<LruCache<BlockHash, Block>>,
}

impl<DB: Database> BlockChain<DB> {
    pub fn new(chain: Arc<HeaderChain<DB>>) -> Self {
        Self {
            chain,
            blocks: Mutex::new(LruCache::new(
                NonZeroUsize::new(BLOCK_CACHE_LIMIT).expect("nonzero capacity"),
            )),
        }
    }

    /// The header chain this adapter fronts.
    pub fn header_chain(&self) -> &Arc<HeaderChain<DB>> {
        &self.chain
    }

    /// Append a block through the header chain and keep it warm in the block
    /// cache.
    pub fn append(&self, block: Block) -> ChainResult<()> {
        self.chain.append(&block)?;
        self.blocks.lock().put(block.hash(), block);
        Ok(())
    }

    /// A recently appended block, if still cached.
    pub fn block(&self, hash: &BlockHash) -> Option<Block> {
        self.blocks.lock().get(hash).cloned()
    }

    /// Header by hash and number; a cached block answers without touching the
    /// header chain.
    pub fn header(&self, hash: &BlockHash, number: BlockNumber) -> Option<Header> {
        if let Some(block) = self.blocks.lock().get(hash) {
            return Some(block.header().clone());
        }
        self.chain.header(hash, number)
    }

    /// Header by hash alone, block cache first.
    pub fn header_by_hash(&self, hash: &BlockHash) -> Option<Header> {
        if let Some(block) = self.blocks.lock().get(hash) {
            return Some(block.header().clone());
        }
        self.chain.header_by_hash(hash)
    }

    /// Snapshot of the current head header.
    pub fn current_header(&self) -> Arc<Header> {
        self.chain.current_header()
    }

    /// Gas limit of the current head at the network context tier.
    pub fn gas_limit(&self) -> u64 {
        let config = self.chain.config();
        self.chain.current_header().gas_limit(config.network_context)
    }

    /// Where a header stands relative to the canonical chain.
    pub fn block_status(&self, header: &Header) -> BlockStatus {
        let context = self.chain.config().network_context;
        match self.chain.canonical_hash(header.number_u64(context)) {
            None => BlockStatus::Unknown,
            Some(canonical) if canonical == header.hash() => BlockStatus::Canonical,
            Some(_) => BlockStatus::Side,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::*;
    use lamina_storage::{open_memory_db, HeaderCaches, HeaderStore};
    use lamina_types::{Interrupt, U256};

    fn new_block_chain() -> (BlockChain<lamina_storage::MemDatabase>, Header) {
        let store =
            HeaderStore::new(open_memory_db(), CONTEXT, HeaderCaches::default());
        let genesis = genesis_header();
        store.write_genesis(&genesis).expect("genesis");
        let chain = HeaderChain::new(
            store,
            test_config(),
            std::sync::Arc::new(NoopEngine),
            std::sync::Arc::new(RecordingExecutor::default()),
            Interrupt::new(),
            None,
        )
        .expect("engine constructs");
        (BlockChain::new(Arc::new(chain)), genesis)
    }

    #[test]
    fn append_caches_the_block() {
        let (bc, genesis) = new_block_chain();
        let header = child_of(&genesis, 0);
        let block = Block::new(header.clone(), vec![lamina_types::Bytes::from_static(b"tx")]);

        bc.append(block.clone()).expect("append");
        assert_eq!(bc.block(&header.hash()), Some(block));
        assert_eq!(bc.header_by_hash(&header.hash()), Some(header.clone()));
        assert_eq!(bc.header(&header.hash(), 1), Some(header));
    }

    #[test]
    fn cached_block_answers_header_reads_after_deletion() {
        let (bc, genesis) = new_block_chain();
        let header = child_of(&genesis, 0);
        bc.append(Block::from_header(header.clone())).expect("append");

        // Remove the header underneath: the embedded copy still answers.
        bc.header_chain().store().delete_header(&header.hash(), 1).expect("delete");
        assert_eq!(bc.header_by_hash(&header.hash()), Some(header));
    }

    #[test]
    fn block_status_tracks_the_canonical_map() {
        let (bc, genesis) = new_block_chain();
        let a = child_of(&genesis, 0);
        bc.append(Block::from_header(a.clone())).expect("append");
        let side = child_of(&genesis, 1);
        bc.append(Block::from_header(side.clone())).expect("append");

        assert_eq!(bc.block_status(&a), BlockStatus::Unknown);

        bc.header_chain().store().write_canonical_hash(1, a.hash()).expect("canonical");
        assert_eq!(bc.block_status(&a), BlockStatus::Canonical);
        assert_eq!(bc.block_status(&side), BlockStatus::Side);
    }

    #[test]
    fn gas_limit_follows_the_head() {
        let (bc, genesis) = new_block_chain();
        let header = lamina_types::HeaderBuilder::default()
            .number(vec![U256::ZERO, U256::ZERO, U256::from(1u64)])
            .parent_hash(vec![BlockHash::ZERO, BlockHash::ZERO, genesis.hash()])
            .gas_limit(vec![0, 0, 8_000_000])
            .build()
            .expect("valid header");
        bc.append(Block::from_header(header.clone())).expect("append");
        bc.header_chain().set_current_header(header.clone());
        assert_eq!(*bc.current_header(), header);
        assert_eq!(bc.gas_limit(), 8_000_000);
    }
}
