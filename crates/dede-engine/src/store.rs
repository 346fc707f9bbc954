//! # In-Memory Record Stores
//!
//! Each `Store` models one table of the licensing database: license
//! requests, task assignments, notifications. Durable persistence is
//! out of scope, so records live in a `HashMap` behind a
//! `parking_lot::RwLock`, and the store exposes the lookup, list, and
//! guarded-update surface a real repository would.
//!
//! Locking stays synchronous. The engine never holds a store lock
//! across an `.await`, and a `parking_lot` guard cannot be poisoned by
//! a panicking writer.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

/// One shared table of records, keyed by a domain identifier.
///
/// Cloning is shallow: every clone reads and writes the same map, so
/// the transition service and the sweep can each hold a handle to the
/// same table.
#[derive(Debug)]
pub struct Store<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync,
{
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K, T> Clone for Store<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K, T> Store<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync,
{
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, key: K, value: T) -> Option<T> {
        self.data.write().insert(key, value)
    }

    /// Retrieve a record by key.
    pub fn get(&self, key: &K) -> Option<T> {
        self.data.read().get(key).cloned()
    }

    /// List all records (order unspecified).
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Update a record in place. Returns the updated record, or `None`
    /// if the key is absent.
    pub fn update(&self, key: &K, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(key) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Read, validate, and mutate a record under one write lock.
    ///
    /// The closure sees the current record and may refuse the update by
    /// returning `Err(E)`. Precondition check and mutation happen under
    /// the same write lock, so a caller asking "is the status still
    /// what I read?" cannot be raced between the check and the write.
    /// This is the engine's stale-read guard: of two transitions racing
    /// on one request, exactly one observes the expected status.
    ///
    /// Returns `None` if the record doesn't exist, or `Some(result)`
    /// with the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        key: &K,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(key).map(f)
    }

    /// Check if a record exists.
    pub fn contains(&self, key: &K) -> bool {
        self.data.read().contains_key(key)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, T> Default for Store<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}
