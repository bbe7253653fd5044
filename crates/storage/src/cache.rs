//! In-memory LRU caches fronting the header store.
//!
//! Evicting an entry never affects correctness, only read latency; the store
//! remains the source of truth.

use lamina_types::{BlockHash, BlockNumber, Header, TotalDifficulty};
use lru::LruCache;
use parking_lot::Mutex;
use prometheus::{register_int_counter_with_registry, IntCounter, Registry};
use std::num::NonZeroUsize;

/// Capacity of the recent-headers cache.
pub const HEADER_CACHE_LIMIT: usize = 512;
/// Capacity of the hash-to-number cache.
pub const NUMBER_CACHE_LIMIT: usize = 2048;
/// Capacity of the total-difficulty cache.
pub const TD_CACHE_LIMIT: usize = 1024;

/// Hit/miss counters for the cache trio.
#[derive(Clone)]
pub struct HeaderCacheMetrics {
    hit: IntCounter,
    miss: IntCounter,
}

impl HeaderCacheMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            hit: register_int_counter_with_registry!(
                "header_store_cache_hit",
                "The number of hits in the header store caches",
                registry
            )
            .expect("header cache hit counter registers once"),
            miss: register_int_counter_with_registry!(
                "header_store_cache_miss",
                "The number of misses in the header store caches",
                registry
            )
            .expect("header cache miss counter registers once"),
        }
    }
}

/// The LRU trio of the header store: headers, numbers and total difficulties,
/// each keyed by block hash.
///
/// Values handed out are immutable snapshots. All three maps are safe for
/// concurrent access.
pub struct HeaderCaches {
    headers: Mutex<LruCache<BlockHash, Header>>,
    numbers: Mutex<LruCache<BlockHash, BlockNumber>>,
    tds: Mutex<LruCache<BlockHash, TotalDifficulty>>,
    metrics: Option<HeaderCacheMetrics>,
}

impl HeaderCaches {
    pub fn new(metrics: Option<HeaderCacheMetrics>) -> Self {
        Self {
            headers: Mutex::new(LruCache::new(
                NonZeroUsize::new(HEADER_CACHE_LIMIT).expect("nonzero capacity"),
            )),
            numbers: Mutex::new(LruCache::new(
                NonZeroUsize::new(NUMBER_CACHE_LIMIT).expect("nonzero capacity"),
            )),
            tds: Mutex::new(LruCache::new(
                NonZeroUsize::new(TD_CACHE_LIMIT).expect("nonzero capacity"),
            )),
            metrics,
        }
    }

    fn report_result(&self, is_hit: bool) {
        if let Some(metrics) = self.metrics.as_ref() {
            if is_hit {
                metrics.hit.inc()
            } else {
                metrics.miss.inc()
            }
        }
    }

    /// Fetch a header, marking it most recently used.
    pub fn header(&self, hash: &BlockHash) -> Option<Header> {
        let hit = self.headers.lock().get(hash).cloned();
        self.report_result(hit.is_some());
        hit
    }

    pub fn write_header(&self, header: Header) {
        self.headers.lock().put(header.hash(), header);
    }

    /// Existence check that does not refresh the LRU ordering.
    pub fn contains_header(&self, hash: &BlockHash) -> bool {
        self.headers.lock().contains(hash)
    }

    pub fn remove_header(&self, hash: &BlockHash) {
        let _ = self.headers.lock().pop(hash);
    }

    pub fn number(&self, hash: &BlockHash) -> Option<BlockNumber> {
        let hit = self.numbers.lock().get(hash).copied();
        self.report_result(hit.is_some());
        hit
    }

    pub fn write_number(&self, hash: BlockHash, number: BlockNumber) {
        self.numbers.lock().put(hash, number);
    }

    /// Existence check that does not refresh the LRU ordering.
    pub fn contains_number(&self, hash: &BlockHash) -> bool {
        self.numbers.lock().contains(hash)
    }

    pub fn remove_number(&self, hash: &BlockHash) {
        let _ = self.numbers.lock().pop(hash);
    }

    pub fn td(&self, hash: &BlockHash) -> Option<TotalDifficulty> {
        let hit = self.tds.lock().get(hash).cloned();
        self.report_result(hit.is_some());
        hit
    }

    pub fn write_td(&self, hash: BlockHash, td: TotalDifficulty) {
        self.tds.lock().put(hash, td);
    }

    pub fn remove_td(&self, hash: &BlockHash) {
        let _ = self.tds.lock().pop(hash);
    }
}

impl Default for HeaderCaches {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use lamina_types::{HeaderBuilder, U256};

    fn header(number: u64) -> Header {
        HeaderBuilder::default()
            .number(vec![U256::ZERO, U256::ZERO, U256::from(number)])
            .build()
            .expect("valid header")
    }

    #[test]
    fn header_cache_round_trip() {
        let caches = HeaderCaches::default();
        let h = header(5);
        assert!(caches.header(&h.hash()).is_none());

        caches.write_header(h.clone());
        assert!(caches.contains_header(&h.hash()));
        assert_eq!(caches.header(&h.hash()), Some(h.clone()));

        caches.remove_header(&h.hash());
        assert!(caches.header(&h.hash()).is_none());
    }

    #[test]
    fn number_cache_round_trip() {
        let caches = HeaderCaches::default();
        let hash = BlockHash::repeat_byte(9);
        caches.write_number(hash, 42);
        assert_eq!(caches.number(&hash), Some(42));
        caches.remove_number(&hash);
        assert!(caches.number(&hash).is_none());
    }

    #[test]
    fn td_cache_round_trip() {
        let caches = HeaderCaches::default();
        let hash = BlockHash::repeat_byte(7);
        let td = vec![U256::from(1u64), U256::from(2u64), U256::from(3u64)];
        caches.write_td(hash, td.clone());
        assert_eq!(caches.td(&hash), Some(td));
        caches.remove_td(&hash);
        assert!(caches.td(&hash).is_none());
    }

    #[test]
    fn metrics_count_hits_and_misses() {
        let registry = prometheus::Registry::new();
        let metrics = HeaderCacheMetrics::new(&registry);
        let caches = HeaderCaches::new(Some(metrics.clone()));

        let h = header(1);
        assert!(caches.header(&h.hash()).is_none());
        caches.write_header(h.clone());
        assert!(caches.header(&h.hash()).is_some());

        assert_eq!(metrics.miss.get(), 1);
        assert_eq!(metrics.hit.get(), 1);
    }

    #[test]
    fn oldest_headers_evict_at_capacity() {
        let caches = HeaderCaches::default();
        let headers: Vec<_> = (0..=HEADER_CACHE_LIMIT as u64).map(header).collect();
        for h in &headers {
            caches.write_header(h.clone());
        }
        // One over capacity: the first write is gone, the last survives.
        assert!(caches.header(&headers[0].hash()).is_none());
        assert!(caches.header(&headers[HEADER_CACHE_LIMIT].hash()).is_some());
    }
}
