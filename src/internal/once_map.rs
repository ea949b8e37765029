//! Read-mostly map whose entries are computed at most once.

use std::hash::Hash;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

#[cfg(feature = "ahash")]
type Map<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;
#[cfg(not(feature = "ahash"))]
type Map<K, V> = std::collections::HashMap<K, V>;

/// Process-lifetime cache with check-lock-check population.
///
/// - **Hit**: a shared read lock and a clone of the stored value.
/// - **Miss**: an exclusive lock is held only long enough to re-check the map
///   and insert an empty per-key cell; the value is then computed inside that
///   cell, outside the map lock.
/// - **Race**: concurrent first uses of the same key block on the same cell,
///   so the computation runs exactly once. Different keys never wait on each
///   other's computation.
///
/// Entries are never evicted.
pub(crate) struct OnceMap<K, V> {
    cells: RwLock<Map<K, Arc<OnceCell<V>>>>,
}

impl<K, V> OnceMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            cells: RwLock::new(Map::default()),
        }
    }

    /// Returns the value for `key`, computing it with `init` on first use.
    pub(crate) fn get_or_init<F>(&self, key: &K, init: F) -> V
    where
        F: FnOnce() -> V,
    {
        // Fast path: already computed.
        let existing = {
            let guard = self.cells.read();
            match guard.get(key) {
                Some(cell) => match cell.get() {
                    Some(value) => return value.clone(),
                    None => Some(cell.clone()),
                },
                None => None,
            }
        };

        let cell = match existing {
            Some(cell) => cell,
            None => {
                let mut guard = self.cells.write();
                // Re-check: another thread may have inserted the cell meanwhile.
                guard
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(OnceCell::new()))
                    .clone()
            }
        };

        cell.get_or_init(init).clone()
    }

    /// Returns the value for `key` if it has been computed.
    pub(crate) fn get(&self, key: &K) -> Option<V> {
        let guard = self.cells.read();
        guard.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Number of computed entries.
    pub(crate) fn len(&self) -> usize {
        let guard = self.cells.read();
        guard.values().filter(|cell| cell.get().is_some()).count()
    }
}
