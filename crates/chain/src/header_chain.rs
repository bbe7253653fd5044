//! The header chain engine: append, branch trimming, ancestor queries and
//! head tracking.

use crate::{BlockExecutor, ChainMetrics, ChainReader, ConsensusEngine, HeadQueue};
use lamina_storage::HeaderStore;
use lamina_types::{
    ensure, Block, BlockHash, BlockNumber, ChainConfig, ChainError, ChainResult, Database, DbTxMut,
    Header, Interrupt, Location, TotalDifficulty, U256,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Subscribers further behind than this many head updates start losing the
/// oldest ones.
const HEAD_FEED_CAPACITY: usize = 1_024;

/// The authoritative index over block headers.
///
/// Maintains (1) the header records, (2) the hash-to-number mapping, (3) the
/// canonical number-to-hash mapping, (4) total difficulties and (5) the head
/// header marker, all behind the cache-fronted [`HeaderStore`].
///
/// All header ingestion is serialized by the internal writer lock; reads are
/// lock-free against the head pointer and only touch the concurrency-safe
/// caches and store.
pub struct HeaderChain<DB> {
    config: ChainConfig,
    store: HeaderStore<DB>,
    engine: Arc<dyn ConsensusEngine>,
    executor: Arc<dyn BlockExecutor>,
    genesis: RwLock<Header>,
    /// Current head of the header chain (may be above the block chain).
    /// Readers take only this uncontended lock, never the writer lock below.
    current: RwLock<Arc<Header>>,
    /// Serializes append and trim against each other and guards the queue of
    /// live fork tips.
    headermu: RwLock<HeadQueue>,
    head_feed: broadcast::Sender<Arc<Header>>,
    interrupt: Interrupt,
    metrics: Option<ChainMetrics>,
}

impl<DB> std::fmt::Debug for HeaderChain<DB> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderChain").finish_non_exhaustive()
    }
}

impl<DB: Database> HeaderChain<DB> {
    /// Create the engine over a store already seeded with a genesis header.
    ///
    /// The head is restored from the persisted head hash when resolvable and
    /// falls back to genesis.
    pub fn new(
        store: HeaderStore<DB>,
        config: ChainConfig,
        engine: Arc<dyn ConsensusEngine>,
        executor: Arc<dyn BlockExecutor>,
        interrupt: Interrupt,
        metrics: Option<ChainMetrics>,
    ) -> ChainResult<Self> {
        config.assert_valid();
        let context = config.network_context;

        let genesis_hash = store.canonical_hash(0)?.ok_or(ChainError::NoGenesis)?;
        let genesis = store.header(&genesis_hash, 0)?.ok_or(ChainError::NoGenesis)?;

        let mut current = genesis.clone();
        if let Some(head) = store.head_hash()? {
            if let Some(number) = store.header_number(&head)? {
                if let Some(header) = store.header(&head, number)? {
                    current = header;
                }
            }
        }

        if let Some(metrics) = &metrics {
            metrics.head_header.set(current.number_u64(context) as i64);
        }

        let (head_feed, _) = broadcast::channel(HEAD_FEED_CAPACITY);
        Ok(Self {
            headermu: RwLock::new(HeadQueue::new(config.max_heads_queue, context)),
            config,
            store,
            engine,
            executor,
            genesis: RwLock::new(genesis),
            current: RwLock::new(Arc::new(current)),
            head_feed,
            interrupt,
            metrics,
        })
    }

    /// Atomically incorporate a block's header.
    ///
    /// The header is committed in its own batch, the block is handed to the
    /// executor, and the header becomes a live fork tip. An executor
    /// rejection takes the just-written header back out of the store before
    /// the error propagates. When the tip queue is full, the oldest tip's
    /// branch is trimmed down to its common ancestor with the newest tip
    /// before the tip is dequeued.
    pub fn append(&self, block: &Block) -> ChainResult<()> {
        let mut heads = self.headermu.write();
        let header = block.header();
        let context = self.config.network_context;

        let mut txn = self.store.write_txn()?;
        self.store.write_header(&mut txn, header)?;
        txn.commit()?;
        self.store.cache_header(header);

        if let Err(err) = self.executor.append(block) {
            // Compensating delete so the header index matches executor state
            // again. Best effort: a failure here leaves a dangling header.
            if let Err(delete_err) =
                self.store.delete_header(&header.hash(), header.number_u64(context))
            {
                warn!(
                    target: "lamina::chain",
                    header = %header.hash(),
                    "failed to take back header after executor rejection: {delete_err}"
                );
            }
            return Err(err);
        }

        if heads.is_full() {
            let oldest = heads.oldest().cloned().expect("full queue has an oldest tip");
            let newest = heads.newest().cloned().expect("full queue has a newest tip");

            // Trim the branch before dequeueing.
            self.trim_branch(&oldest, &newest)?;
            heads.dequeue_oldest();
        }
        heads.push(header.clone());

        Ok(())
    }

    /// Set the in-memory head header marker of the canonical chain, persist
    /// its hash and publish the new head to subscribers.
    pub fn set_current_header(&self, header: Header) {
        let header = Arc::new(header);
        if let Err(err) = self.store.write_head_hash(header.hash()) {
            warn!(target: "lamina::chain", "failed to persist head block hash: {err}");
        }
        *self.current.write() = header.clone();
        if let Some(metrics) = &self.metrics {
            metrics.head_header.set(header.number_u64(self.config.network_context) as i64);
        }
        // Publishing never fails the head update; a send error only means
        // nobody is subscribed right now.
        let _ = self.head_feed.send(header);
    }

    /// Snapshot of the current head header.
    pub fn current_header(&self) -> Arc<Header> {
        self.current.read().clone()
    }

    /// Hash of the current head header.
    pub fn current_hash(&self) -> BlockHash {
        self.current.read().hash()
    }

    /// Subscribe to canonical-head-changed events. Delivery is
    /// order-preserving per subscriber.
    pub fn subscribe_heads(&self) -> broadcast::Receiver<Arc<Header>> {
        self.head_feed.subscribe()
    }

    /// Delete the headers of an abandoned branch, walking backward from
    /// `start` until `common` is reached.
    ///
    /// Every deleted header is also handed to the executor to discard its
    /// dependent state. A missing ancestor mid-walk ends the trim early with
    /// partial progress: the remaining stretch is already absent.
    fn trim(&self, common: &Header, start: &Header) -> ChainResult<()> {
        let context = self.config.network_context;
        let mut parent = start.clone();
        // Delete each header until the common ancestor is found.
        loop {
            if parent.hash() == common.hash() {
                break;
            }
            if self.interrupt.is_triggered() {
                warn!(target: "lamina::chain", "interrupt triggered, abandoning trim early");
                return Ok(());
            }

            self.store.delete_header(&parent.hash(), parent.number_u64(context))?;
            if let Err(err) = self.executor.trim(&parent) {
                warn!(
                    target: "lamina::chain",
                    header = %parent.hash(),
                    "executor failed to trim block state: {err}"
                );
            }
            if let Some(metrics) = &self.metrics {
                metrics.trimmed_headers.inc();
            }

            let number = parent.number_u64(context);
            match number
                .checked_sub(1)
                .and_then(|n| self.header(&parent.parent_hash(context), n))
            {
                Some(next) => parent = next,
                None => {
                    warn!(
                        target: "lamina::chain",
                        "unable to trim header chain state, one of the trimmed headers is missing"
                    );
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Find the common ancestor of two tips and trim the `old_tip` side down
    /// to it.
    fn trim_branch(&self, old_tip: &Header, new_tip: &Header) -> ChainResult<()> {
        let context = self.config.network_context;
        let target = old_tip.number_u64(context);
        let start = old_tip.clone();

        // Walk the retained tip down to the retiring tip's height.
        let mut new_cursor = new_tip.clone();
        while new_cursor.number_u64(context) > target {
            new_cursor = self
                .header(&new_cursor.parent_hash(context), new_cursor.number_u64(context) - 1)
                .ok_or(ChainError::InvalidNewChain)?;
        }
        ensure!(new_cursor.number_u64(context) == target, ChainError::InvalidNewChain);

        // Both sides of the reorg are at the same number; reduce both until
        // the common ancestor is found.
        let mut old_cursor = old_tip.clone();
        let common = loop {
            if old_cursor.hash() == new_cursor.hash() {
                break old_cursor;
            }

            let number = old_cursor.number_u64(context);
            ensure!(number > 0, ChainError::InvalidOldChain);
            old_cursor = self
                .header(&old_cursor.parent_hash(context), number - 1)
                .ok_or(ChainError::InvalidOldChain)?;
            new_cursor = self
                .header(&new_cursor.parent_hash(context), number - 1)
                .ok_or(ChainError::InvalidNewChain)?;
        };

        if let Some(metrics) = &self.metrics {
            metrics.branch_trims.inc();
        }
        self.trim(&common, &start)
    }

    /// The context-tier number a hash resolves to.
    pub fn block_number(&self, hash: &BlockHash) -> Option<BlockNumber> {
        self.store.header_number(hash).unwrap_or_else(|err| {
            debug!(target: "lamina::chain", "header number read failed: {err}");
            None
        })
    }

    /// Header by hash and number.
    pub fn header(&self, hash: &BlockHash, number: BlockNumber) -> Option<Header> {
        self.store.header(hash, number).unwrap_or_else(|err| {
            debug!(target: "lamina::chain", "header read failed: {err}");
            None
        })
    }

    /// Header by hash alone, resolving its number first.
    pub fn header_by_hash(&self, hash: &BlockHash) -> Option<Header> {
        let number = self.block_number(hash)?;
        self.header(hash, number)
    }

    /// Canonical header at a number.
    pub fn header_by_number(&self, number: BlockNumber) -> Option<Header> {
        let hash = self.canonical_hash(number)?;
        self.header(&hash, number)
    }

    /// The canonical hash at a number.
    pub fn canonical_hash(&self, number: BlockNumber) -> Option<BlockHash> {
        self.store.canonical_hash(number).unwrap_or_else(|err| {
            debug!(target: "lamina::chain", "canonical hash read failed: {err}");
            None
        })
    }

    /// Whether a header is present, in cache or store.
    pub fn has_header(&self, hash: &BlockHash, number: BlockNumber) -> bool {
        self.store.has_header(hash, number).unwrap_or(false)
    }

    /// Collect up to `max` ancestor hashes starting at `hash`, walking toward
    /// genesis. Stops early at genesis or a missing parent.
    pub fn block_hashes_from_hash(&self, hash: &BlockHash, max: u64) -> Vec<BlockHash> {
        let context = self.config.network_context;
        let Some(mut header) = self.header_by_hash(hash) else {
            return Vec::new();
        };

        let mut chain = Vec::new();
        for _ in 0..max {
            if self.interrupt.is_triggered() {
                break;
            }
            let next = header.parent_hash(context);
            let number = header.number_u64(context);
            match number.checked_sub(1).and_then(|n| self.header(&next, n)) {
                None => break,
                Some(parent) => {
                    chain.push(next);
                    header = parent;
                    if header.is_genesis(context) {
                        break;
                    }
                }
            }
        }
        chain
    }

    /// The `distance`-th ancestor of a block, assuming the block or a close
    /// ancestor is canonical.
    ///
    /// `distance == 0` names the block itself, `distance == 1` its parent.
    /// `max_non_canonical` bounds how many blocks may be stepped through
    /// individually before canonical alignment is required; when it runs out
    /// the walk gives up and answers `None`.
    pub fn ancestor(
        &self,
        hash: BlockHash,
        number: BlockNumber,
        distance: u64,
        max_non_canonical: &mut u64,
    ) -> Option<(BlockHash, BlockNumber)> {
        let context = self.config.network_context;
        if distance > number {
            return None;
        }
        if distance == 1 {
            // Cheaper to just read the header.
            return self.header(&hash, number).map(|h| (h.parent_hash(context), number - 1));
        }

        let mut hash = hash;
        let mut number = number;
        let mut distance = distance;
        while distance != 0 {
            if self.interrupt.is_triggered() {
                return None;
            }
            if self.canonical_hash(number) == Some(hash) {
                if let Some(ancestor_hash) = self.canonical_hash(number - distance) {
                    // Re-check in case a reorg raced the two reads above; on
                    // a mismatch fall through to the stepwise walk.
                    if self.canonical_hash(number) == Some(hash) {
                        return Some((ancestor_hash, number - distance));
                    }
                }
            }
            if *max_non_canonical == 0 {
                return None;
            }
            *max_non_canonical -= 1;
            distance -= 1;
            let header = self.header(&hash, number)?;
            hash = header.parent_hash(context);
            number -= 1;
        }
        Some((hash, number))
    }

    /// Walk back from `hash` to the first ancestor produced at `location`.
    pub fn ancestor_by_location(
        &self,
        hash: &BlockHash,
        location: Location,
    ) -> ChainResult<Header> {
        let context = self.config.network_context;
        let mut header = self.header_by_hash(hash).ok_or(ChainError::HeaderNotFound(*hash))?;

        while header.location() != location {
            ensure!(!self.interrupt.is_triggered(), ChainError::Interrupted);
            let parent = header.parent_hash(context);
            header = self.header_by_hash(&parent).ok_or(ChainError::HeaderNotFound(parent))?;
        }
        Ok(header)
    }

    /// Total difficulty of a block; a zero vector per tier when unrecorded.
    pub fn td(&self, hash: &BlockHash, number: BlockNumber) -> TotalDifficulty {
        match self.store.td(hash, number) {
            Ok(Some(td)) => td,
            Ok(None) => vec![U256::ZERO; self.config.depth],
            Err(err) => {
                debug!(target: "lamina::chain", "total difficulty read failed: {err}");
                vec![U256::ZERO; self.config.depth]
            }
        }
    }

    /// Total difficulty by hash alone.
    pub fn td_by_hash(&self, hash: &BlockHash) -> TotalDifficulty {
        match self.block_number(hash) {
            Some(number) => self.td(hash, number),
            None => vec![U256::ZERO; self.config.depth],
        }
    }

    /// Reject context indices outside the configured hierarchy.
    pub fn check_context(&self, context: usize) -> ChainResult<()> {
        ensure!(
            context <= self.config.depth,
            ChainError::ContextOutOfRange { context, max: self.config.depth }
        );
        Ok(())
    }

    /// Reject locations whose region or zone byte falls outside the
    /// configured bounds.
    pub fn check_location_range(&self, location: &Location) -> ChainResult<()> {
        ensure!(
            (1..=self.config.region_max).contains(&location.region()),
            ChainError::LocationOutOfRange { axis: "region" }
        );
        ensure!(
            (1..=self.config.zone_max).contains(&location.zone()),
            ChainError::LocationOutOfRange { axis: "zone" }
        );
        Ok(())
    }

    /// The genesis header this chain was constructed over.
    pub fn genesis(&self) -> Header {
        self.genesis.read().clone()
    }

    /// Replace the genesis header marker.
    pub fn set_genesis(&self, header: Header) {
        *self.genesis.write() = header;
    }

    /// The live fork tips, ascending by context-tier number.
    pub fn fork_tips(&self) -> Vec<Header> {
        self.headermu.read().iter().cloned().collect()
    }

    /// The cache-fronted store, for collaborators that write back through it
    /// (the fork-choice layer records total difficulties here).
    pub fn store(&self) -> &HeaderStore<DB> {
        &self.store
    }
}

impl<DB: Database> ChainReader for HeaderChain<DB> {
    fn config(&self) -> &ChainConfig {
        &self.config
    }

    fn engine(&self) -> &dyn ConsensusEngine {
        self.engine.as_ref()
    }

    fn header(&self, hash: &BlockHash, number: BlockNumber) -> Option<Header> {
        HeaderChain::header(self, hash, number)
    }

    fn header_by_hash(&self, hash: &BlockHash) -> Option<Header> {
        HeaderChain::header_by_hash(self, hash)
    }

    fn header_by_number(&self, number: BlockNumber) -> Option<Header> {
        HeaderChain::header_by_number(self, number)
    }

    fn current_header(&self) -> Header {
        (*HeaderChain::current_header(self)).clone()
    }

    fn td(&self, hash: &BlockHash, number: BlockNumber) -> TotalDifficulty {
        HeaderChain::td(self, hash, number)
    }

    fn td_by_hash(&self, hash: &BlockHash) -> TotalDifficulty {
        HeaderChain::td_by_hash(self, hash)
    }

    fn canonical_hash(&self, number: BlockNumber) -> Option<BlockHash> {
        HeaderChain::canonical_hash(self, number)
    }

    /// A header chain has no blocks available for retrieval.
    fn block(&self, _hash: &BlockHash, _number: BlockNumber) -> Option<Block> {
        None
    }
}
