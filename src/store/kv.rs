//! Ordered-key KV interface (§6, "Fact-store KV interface (consumed)").
//!
//! The core depends only on this abstraction — embedded and distributed
//! physical backends are external collaborators (§1) and are never named
//! here. `MemoryKvStore` is the one concrete, in-process implementation
//! the core ships, intended for tests and single-process deployments.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Transient vs. permanent failure of the backing KV. `Unavailable` is
/// retried with bounded exponential backoff by `FactStore`; after the
/// retry budget is exhausted it surfaces as `StoreError::Unavailable`
/// (§4.1's failure model, §7's `StoreUnavailable`).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KvError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type KvResult<T> = Result<T, KvError>;

/// Ordered-key KV store: `put`, `get`, `delete_range`, `range` (§6).
///
/// Implementors must tolerate concurrent `put` + `range`: a `range` call
/// sees a consistent snapshot of keys that existed at its start; keys
/// inserted mid-scan may or may not appear (§5).
pub trait KvStore: Send + Sync {
    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> KvResult<()>;
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>>;
    fn delete_range(&self, low: &[u8], high: &[u8]) -> KvResult<()>;
    /// All `(key, value)` pairs with `low <= key < high`, in key-ascending
    /// order. `high` is exclusive; pass `prefix_upper_bound` to scan a
    /// prefix.
    fn range(&self, low: &[u8], high: &[u8]) -> KvResult<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// Smallest byte string greater than every string with `prefix` as a
/// prefix, used to turn a prefix scan into a `[low, high)` range query.
/// Returns `None` if `prefix` is all `0xFF` bytes (no finite upper bound;
/// callers should scan to the end of the keyspace instead).
pub fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(&last) = upper.last() {
        if last == 0xFF {
            upper.pop();
        } else {
            *upper.last_mut().unwrap() += 1;
            return Some(upper);
        }
    }
    None
}

/// In-memory, ordered KV store backed by a `BTreeMap` behind a
/// `parking_lot::RwLock`.
#[derive(Default)]
pub struct MemoryKvStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    /// Counts `put` calls, for diagnostics/tests only.
    writes: AtomicU64,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

impl KvStore for MemoryKvStore {
    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> KvResult<()> {
        self.data.write().insert(key, value);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn delete_range(&self, low: &[u8], high: &[u8]) -> KvResult<()> {
        let mut guard = self.data.write();
        let keys: Vec<Vec<u8>> = guard
            .range(low.to_vec()..high.to_vec())
            .map(|(k, _)| k.clone())
            .collect();
        for k in keys {
            guard.remove(&k);
        }
        Ok(())
    }

    fn range(&self, low: &[u8], high: &[u8]) -> KvResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let guard = self.data.read();
        Ok(guard
            .range(low.to_vec()..high.to_vec())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_upper_bound_increments_last_byte() {
        assert_eq!(prefix_upper_bound(b"abc"), Some(b"abd".to_vec()));
    }

    #[test]
    fn prefix_scan_is_ordered_and_bounded() {
        let kv = MemoryKvStore::new();
        kv.put(b"a:1".to_vec(), b"1".to_vec()).unwrap();
        kv.put(b"a:2".to_vec(), b"2".to_vec()).unwrap();
        kv.put(b"b:1".to_vec(), b"x".to_vec()).unwrap();
        let high = prefix_upper_bound(b"a:").unwrap();
        let got = kv.range(b"a:", &high).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].0, b"a:1");
        assert_eq!(got[1].0, b"a:2");
    }
}
