//! LRU read-through cache of byte ranges.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use super::error::SourceError;
use super::shared::SharedSource;

/// Cache key: one byte range of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RangeKey {
    offset: i64,
    size: i32,
}

/// Bounded `(offset, size) -> bytes` map in LRU order.
///
/// Capacity counts entries, not bytes. The recency queue front holds
/// the least recently used key.
#[derive(Debug)]
struct LruMap {
    capacity: usize,
    entries: HashMap<RangeKey, Bytes>,
    order: VecDeque<RangeKey>,
}

impl LruMap {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    fn get(&mut self, key: &RangeKey) -> Option<Bytes> {
        let value = self.entries.get(key)?.clone();
        self.touch(*key);
        Some(value)
    }

    fn insert(&mut self, key: RangeKey, value: Bytes) {
        if self.entries.insert(key, value).is_some() {
            self.touch(key);
        } else {
            self.order.push_back(key);
        }
        while self.entries.len() > self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    /// Moves `key` to the back of the recency queue.
    ///
    /// The linear scan is bounded by the cache capacity.
    fn touch(&mut self, key: RangeKey) {
        if let Some(pos) = self.order.iter().position(|k| *k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Read-through byte-range cache over a [`SharedSource`].
///
/// Hits are served from memory; misses seek and read the shared source
/// and remember the result, evicting the least recently used range past
/// capacity. The cache is safe for concurrent callers; misses serialize
/// on the source's lock.
#[derive(Debug)]
pub struct CachedReader {
    source: Arc<SharedSource>,
    cache: Mutex<LruMap>,
}

impl CachedReader {
    /// Creates a cache with the given entry capacity over `source`.
    pub fn new(capacity: usize, source: Arc<SharedSource>) -> Self {
        Self {
            source,
            cache: Mutex::new(LruMap::new(capacity.max(1))),
        }
    }

    /// Returns the `size` bytes at `offset`.
    pub async fn read(&self, offset: i64, size: i32) -> Result<Bytes, SourceError> {
        let key = RangeKey { offset, size };
        if let Some(bytes) = self.cache.lock().get(&key) {
            return Ok(bytes);
        }

        // Concurrent misses on the same range may read twice; the last
        // insert wins and both callers get identical bytes.
        let bytes = self.source.read_at(offset, size).await?;
        self.cache.lock().insert(key, bytes.clone());
        Ok(bytes)
    }

    /// Number of cached ranges, for diagnostics.
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Returns true if nothing is cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
