//! Typed, cache-fronted reads and writes for every header chain table.

use crate::{
    tables::{CanonicalHashes, HeadHash, HeaderNumbers, Headers, TotalDifficulties},
    HeaderCaches, StoreResult, HEAD_HASH_KEY,
};
use lamina_types::{BlockHash, BlockNumber, Database, DbTxMut, Header, TotalDifficulty};
use std::sync::Arc;

/// The storage facade of the header chain.
///
/// Wraps the five persistent mappings with typed operations and fronts the
/// hot ones with the LRU trio. Multi-write operations assemble into a write
/// transaction handed out by [`write_txn`]; the transaction commits or fails
/// as a whole.
///
/// [`write_txn`]: HeaderStore::write_txn
#[derive(Clone)]
pub struct HeaderStore<DB> {
    /// The storage DB.
    db: DB,
    /// Tier whose number keys the tables.
    context: usize,
    /// LRU trio for headers, numbers and total difficulties.
    caches: Arc<HeaderCaches>,
}

impl<DB: Database> HeaderStore<DB> {
    pub fn new(db: DB, context: usize, caches: HeaderCaches) -> Self {
        Self { db, context, caches: Arc::new(caches) }
    }

    /// Begin a write transaction over the underlying store.
    pub fn write_txn(&self) -> StoreResult<DB::TXMut<'_>> {
        self.db.write_txn()
    }

    /// Retrieve a header by hash and number, consulting the cache first and
    /// populating it on a store hit.
    pub fn header(&self, hash: &BlockHash, number: BlockNumber) -> StoreResult<Option<Header>> {
        if let Some(header) = self.caches.header(hash) {
            return Ok(Some(header));
        }
        let header = self.db.get::<Headers>(&(number, *hash))?;
        if let Some(header) = &header {
            self.caches.write_header(header.clone());
        }
        Ok(header)
    }

    /// Queue a header write into an open transaction: the header record plus
    /// its hash-to-number mapping.
    pub fn write_header(&self, txn: &mut DB::TXMut<'_>, header: &Header) -> StoreResult<()> {
        let number = header.number_u64(self.context);
        let hash = header.hash();
        txn.insert::<Headers>(&(number, hash), header)?;
        txn.insert::<HeaderNumbers>(&hash, &number)?;
        Ok(())
    }

    /// Unconditionally delete a header and its hash-to-number mapping,
    /// evicting all cached views of it.
    pub fn delete_header(&self, hash: &BlockHash, number: BlockNumber) -> StoreResult<()> {
        let mut txn = self.db.write_txn()?;
        txn.remove::<Headers>(&(number, *hash))?;
        txn.remove::<HeaderNumbers>(hash)?;
        txn.commit()?;

        self.caches.remove_header(hash);
        self.caches.remove_number(hash);
        self.caches.remove_td(hash);
        Ok(())
    }

    /// The context-tier number a hash resolves to, if the header is known.
    pub fn header_number(&self, hash: &BlockHash) -> StoreResult<Option<BlockNumber>> {
        if let Some(number) = self.caches.number(hash) {
            return Ok(Some(number));
        }
        let number = self.db.get::<HeaderNumbers>(hash)?;
        if let Some(number) = number {
            self.caches.write_number(*hash, number);
        }
        Ok(number)
    }

    /// Record a hash-to-number mapping outside any batch.
    pub fn write_header_number(&self, hash: BlockHash, number: BlockNumber) -> StoreResult<()> {
        self.db.insert::<HeaderNumbers>(&hash, &number)?;
        self.caches.write_number(hash, number);
        Ok(())
    }

    /// The canonical hash at a number, if that height is populated.
    pub fn canonical_hash(&self, number: BlockNumber) -> StoreResult<Option<BlockHash>> {
        self.db.get::<CanonicalHashes>(&number)
    }

    /// Designate `hash` as the canonical block at `number`.
    pub fn write_canonical_hash(&self, number: BlockNumber, hash: BlockHash) -> StoreResult<()> {
        self.db.insert::<CanonicalHashes>(&number, &hash)
    }

    /// The total difficulty vector recorded for a block, if any.
    pub fn td(&self, hash: &BlockHash, number: BlockNumber) -> StoreResult<Option<TotalDifficulty>> {
        if let Some(td) = self.caches.td(hash) {
            return Ok(Some(td));
        }
        let td = self.db.get::<TotalDifficulties>(&(number, *hash))?;
        if let Some(td) = &td {
            self.caches.write_td(*hash, td.clone());
        }
        Ok(td)
    }

    /// Record the total difficulty computed by the fork-choice layer.
    pub fn write_td(
        &self,
        hash: BlockHash,
        number: BlockNumber,
        td: TotalDifficulty,
    ) -> StoreResult<()> {
        self.db.insert::<TotalDifficulties>(&(number, hash), &td)?;
        self.caches.write_td(hash, td);
        Ok(())
    }

    /// The persisted head block hash, if one was ever recorded.
    pub fn head_hash(&self) -> StoreResult<Option<BlockHash>> {
        self.db.get::<HeadHash>(&HEAD_HASH_KEY)
    }

    /// Persist the head block hash.
    pub fn write_head_hash(&self, hash: BlockHash) -> StoreResult<()> {
        self.db.insert::<HeadHash>(&HEAD_HASH_KEY, &hash)
    }

    /// True when either cache holds the hash or the store reports the header
    /// present.
    pub fn has_header(&self, hash: &BlockHash, number: BlockNumber) -> StoreResult<bool> {
        if self.caches.contains_number(hash) || self.caches.contains_header(hash) {
            return Ok(true);
        }
        self.db.contains_key::<Headers>(&(number, *hash))
    }

    /// Populate the header and number caches after a committed write.
    pub fn cache_header(&self, header: &Header) {
        self.caches.write_number(header.hash(), header.number_u64(self.context));
        self.caches.write_header(header.clone());
    }

    /// Seed the store with a genesis header: record, number mapping and the
    /// canonical designation of height zero, committed as one batch.
    pub fn write_genesis(&self, header: &Header) -> StoreResult<()> {
        let mut txn = self.db.write_txn()?;
        self.write_header(&mut txn, header)?;
        txn.insert::<CanonicalHashes>(&header.number_u64(self.context), &header.hash())?;
        txn.commit()?;
        tracing::info!(target: "lamina::storage", genesis = %header.hash(), "seeded genesis header");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::open_memory_db;
    use lamina_types::{HeaderBuilder, U256};

    const CONTEXT: usize = 2;

    fn new_store() -> HeaderStore<crate::MemDatabase> {
        HeaderStore::new(open_memory_db(), CONTEXT, HeaderCaches::default())
    }

    fn header(number: u64, parent: BlockHash) -> Header {
        HeaderBuilder::default()
            .number(vec![U256::ZERO, U256::ZERO, U256::from(number)])
            .parent_hash(vec![BlockHash::ZERO, BlockHash::ZERO, parent])
            .build()
            .expect("valid header")
    }

    #[test]
    fn write_and_read_header() {
        let store = new_store();
        let h = header(1, BlockHash::repeat_byte(1));

        assert!(store.header(&h.hash(), 1).expect("read").is_none());
        assert!(!store.has_header(&h.hash(), 1).expect("has"));

        let mut txn = store.write_txn().expect("txn");
        store.write_header(&mut txn, &h).expect("write");
        // Invisible until the batch commits.
        assert!(store.header(&h.hash(), 1).expect("read").is_none());
        txn.commit().expect("commit");

        assert_eq!(store.header(&h.hash(), 1).expect("read"), Some(h.clone()));
        assert_eq!(store.header_number(&h.hash()).expect("read"), Some(1));
        assert!(store.has_header(&h.hash(), 1).expect("has"));
    }

    #[test]
    fn delete_header_removes_record_mapping_and_caches() {
        let store = new_store();
        let h = header(3, BlockHash::repeat_byte(2));

        let mut txn = store.write_txn().expect("txn");
        store.write_header(&mut txn, &h).expect("write");
        txn.commit().expect("commit");
        store.cache_header(&h);

        store.delete_header(&h.hash(), 3).expect("delete");
        assert!(store.header(&h.hash(), 3).expect("read").is_none());
        assert!(store.header_number(&h.hash()).expect("read").is_none());
        assert!(!store.has_header(&h.hash(), 3).expect("has"));
    }

    #[test]
    fn reads_populate_the_caches() {
        let store = new_store();
        let h = header(2, BlockHash::repeat_byte(3));

        let mut txn = store.write_txn().expect("txn");
        store.write_header(&mut txn, &h).expect("write");
        txn.commit().expect("commit");

        // First read misses the cache and fills it.
        assert!(store.header(&h.hash(), 2).expect("read").is_some());

        // Remove the record underneath: the cached snapshot still answers.
        store.db.remove::<Headers>(&(2, h.hash())).expect("raw remove");
        assert!(store.header(&h.hash(), 2).expect("read").is_some());
    }

    #[test]
    fn standalone_number_mapping_write() {
        let store = new_store();
        let hash = BlockHash::repeat_byte(9);
        assert!(store.header_number(&hash).expect("read").is_none());

        store.write_header_number(hash, 12).expect("write");
        assert_eq!(store.header_number(&hash).expect("read"), Some(12));
    }

    #[test]
    fn canonical_and_head_mappings() {
        let store = new_store();
        let genesis = header(0, BlockHash::ZERO);
        store.write_genesis(&genesis).expect("genesis");

        assert_eq!(store.canonical_hash(0).expect("read"), Some(genesis.hash()));
        assert!(store.canonical_hash(1).expect("read").is_none());

        assert!(store.head_hash().expect("read").is_none());
        store.write_head_hash(genesis.hash()).expect("write");
        assert_eq!(store.head_hash().expect("read"), Some(genesis.hash()));
    }

    #[test]
    fn td_round_trip() {
        let store = new_store();
        let hash = BlockHash::repeat_byte(5);
        let td = vec![U256::from(10u64), U256::from(20u64), U256::from(30u64)];

        assert!(store.td(&hash, 7).expect("read").is_none());
        store.write_td(hash, 7, td.clone()).expect("write");
        assert_eq!(store.td(&hash, 7).expect("read"), Some(td));
    }
}
