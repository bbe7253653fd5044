//! Bounded, number-sorted queue of live fork tips.

use lamina_types::Header;

/// Fork-tip buffer holding at most `limit` headers, sorted ascending by the
/// context-tier number. The sort is stable, so tips at the same height keep
/// their insertion order. Thread safety comes from the enclosing engine's
/// writer lock.
#[derive(Debug)]
pub struct HeadQueue {
    limit: usize,
    context: usize,
    heads: Vec<Header>,
}

impl HeadQueue {
    pub fn new(limit: usize, context: usize) -> Self {
        Self { limit, context, heads: Vec::with_capacity(limit) }
    }

    /// True once the queue holds `limit` tips; the next push must be preceded
    /// by evicting the oldest.
    pub fn is_full(&self) -> bool {
        self.heads.len() == self.limit
    }

    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// The lowest-numbered tip.
    pub fn oldest(&self) -> Option<&Header> {
        self.heads.first()
    }

    /// The highest-numbered tip.
    pub fn newest(&self) -> Option<&Header> {
        self.heads.last()
    }

    /// Tip at position `index` in ascending number order.
    pub fn get(&self, index: usize) -> Option<&Header> {
        self.heads.get(index)
    }

    /// Add a tip and restore the ascending-number order.
    pub fn push(&mut self, header: Header) {
        debug_assert!(self.heads.len() < self.limit, "push into a full head queue");
        self.heads.push(header);
        let context = self.context;
        self.heads.sort_by_key(|h| h.number_u64(context));
    }

    /// Drop and return the lowest-numbered tip.
    pub fn dequeue_oldest(&mut self) -> Option<Header> {
        if self.heads.is_empty() {
            return None;
        }
        Some(self.heads.remove(0))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.heads.iter()
    }
}
