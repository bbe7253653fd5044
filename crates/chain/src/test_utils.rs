//! Helpers shared by the engine tests.

use crate::{BlockExecutor, ConsensusEngine, HeaderChain};
use lamina_storage::{open_memory_db, HeaderCaches, HeaderStore, MemDatabase};
use lamina_types::{
    Block, BlockHash, Bytes, ChainConfig, ChainError, ChainResult, Header, HeaderBuilder,
    Interrupt, Location, U256,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// The network context every engine test runs at (D=3, c=2).
pub(crate) const CONTEXT: usize = 2;

pub(crate) fn test_config() -> ChainConfig {
    ChainConfig { depth: 3, network_context: CONTEXT, region_max: 3, zone_max: 3, max_heads_queue: 3 }
}

pub(crate) struct NoopEngine;

impl ConsensusEngine for NoopEngine {
    fn verify_header(&self, _header: &Header) -> ChainResult<()> {
        Ok(())
    }
}

/// Executor that records every append and trim, and can be told to reject
/// one specific block.
#[derive(Default)]
pub(crate) struct RecordingExecutor {
    pub reject: Mutex<Option<BlockHash>>,
    pub appended: Mutex<Vec<BlockHash>>,
    pub trimmed: Mutex<Vec<BlockHash>>,
}

impl BlockExecutor for RecordingExecutor {
    fn append(&self, block: &Block) -> ChainResult<()> {
        if *self.reject.lock() == Some(block.hash()) {
            return Err(ChainError::Executor("rejected by test executor".to_string()));
        }
        self.appended.lock().push(block.hash());
        Ok(())
    }

    fn trim(&self, header: &Header) -> ChainResult<()> {
        self.trimmed.lock().push(header.hash());
        Ok(())
    }
}

pub(crate) fn genesis_header() -> Header {
    HeaderBuilder::default()
        .number(vec![U256::ZERO, U256::ZERO, U256::ZERO])
        .location(Location::new(1, 1))
        .build()
        .expect("valid genesis header")
}

/// A child of `parent` at the network context tier. `tag` disambiguates
/// siblings of the same parent.
pub(crate) fn child_of(parent: &Header, tag: u8) -> Header {
    child_at(parent, tag, parent.location())
}

pub(crate) fn child_at(parent: &Header, tag: u8, location: Location) -> Header {
    HeaderBuilder::default()
        .number(vec![
            U256::ZERO,
            U256::ZERO,
            *parent.number(CONTEXT) + U256::from(1u64),
        ])
        .parent_hash(vec![BlockHash::ZERO, BlockHash::ZERO, parent.hash()])
        .location(location)
        .extra(Bytes::from(vec![tag]))
        .build()
        .expect("valid child header")
}

pub(crate) struct TestChain {
    pub chain: HeaderChain<MemDatabase>,
    pub executor: Arc<RecordingExecutor>,
    pub interrupt: Interrupt,
    pub genesis: Header,
}

impl TestChain {
    /// Append a header as a block and expect success.
    pub fn append(&self, header: &Header) {
        self.chain.append(&Block::from_header(header.clone())).expect("append succeeds");
    }

    /// Append `count` descendants of `parent`, returning them oldest first.
    pub fn extend(&self, parent: &Header, count: usize, tag: u8) -> Vec<Header> {
        let mut headers = Vec::with_capacity(count);
        let mut parent = parent.clone();
        for _ in 0..count {
            let child = child_of(&parent, tag);
            self.append(&child);
            parent = child.clone();
            headers.push(child);
        }
        headers
    }
}

pub(crate) fn new_chain() -> TestChain {
    new_chain_with_metrics(None)
}

pub(crate) fn new_chain_with_metrics(metrics: Option<crate::ChainMetrics>) -> TestChain {
    let config = test_config();
    let store = HeaderStore::new(open_memory_db(), config.network_context, HeaderCaches::default());
    let genesis = genesis_header();
    store.write_genesis(&genesis).expect("genesis seeds the store");

    let executor = Arc::new(RecordingExecutor::default());
    let interrupt = Interrupt::new();
    let chain = HeaderChain::new(
        store,
        config,
        Arc::new(NoopEngine),
        executor.clone(),
        interrupt.clone(),
        metrics,
    )
    .expect("engine constructs over a seeded store");

    TestChain { chain, executor, interrupt, genesis }
}
