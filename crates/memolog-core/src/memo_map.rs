//! Concurrent map whose values are computed lazily, at most once per entry.
//!
//! Each key maps to a shared cell. The caller that installs a cell (the
//! claimant) does so under the `DashMap` shard lock, releases the lock, runs
//! its factory, then publishes the result into the cell. Every other caller
//! that meets the cell blocks on the cell itself, so a slow factory only
//! stalls callers interested in the same key.
//!
//! Failures are never cached:
//! - a factory that returns `Err` evicts its cell, then hands the error to
//!   everyone waiting on that cell (`try_*` methods, needs `E: Clone`);
//! - a factory that panics abandons its cell (evicted, waiters woken) and
//!   waiters treat the key as absent;
//! - non-`try` methods treat a failed predecessor as absent.
//!
//! A factory may use the map for other keys. Re-entering for its own key
//! waits on itself forever.

use std::borrow::Borrow;
use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};

enum Slot<V, E> {
    Running,
    Ready(V),
    Failed(E),
    Abandoned,
}

/// What a waiter observes once a cell settles.
enum Outcome<V, E> {
    Ready(V),
    Failed(E),
    Abandoned,
}

impl<V, E> Outcome<V, E> {
    fn ready(self) -> Option<V> {
        match self {
            Outcome::Ready(v) => Some(v),
            Outcome::Failed(_) | Outcome::Abandoned => None,
        }
    }

    fn into_result(self) -> Result<Option<V>, E> {
        match self {
            Outcome::Ready(v) => Ok(Some(v)),
            Outcome::Failed(e) => Err(e),
            Outcome::Abandoned => Ok(None),
        }
    }
}

/// One-shot slot: written once by its claimant, read by any number of waiters.
struct Cell<V, E> {
    slot: Mutex<Slot<V, E>>,
    settled: Condvar,
}

impl<V, E> Cell<V, E> {
    fn running() -> Self {
        Self {
            slot: Mutex::new(Slot::Running),
            settled: Condvar::new(),
        }
    }

    fn ready(value: V) -> Self {
        Self {
            slot: Mutex::new(Slot::Ready(value)),
            settled: Condvar::new(),
        }
    }

    fn settle(&self, slot: Slot<V, E>) {
        *self.slot.lock() = slot;
        self.settled.notify_all();
    }
}

impl<V: Clone, E: Clone> Cell<V, E> {
    /// Block until the claimant settles the cell. Never call with a map guard held.
    fn wait(&self) -> Outcome<V, E> {
        let mut slot = self.slot.lock();
        while matches!(*slot, Slot::Running) {
            self.settled.wait(&mut slot);
        }
        match &*slot {
            Slot::Ready(v) => Outcome::Ready(v.clone()),
            Slot::Failed(e) => Outcome::Failed(e.clone()),
            Slot::Running | Slot::Abandoned => Outcome::Abandoned,
        }
    }
}

type Shared<V, E> = Arc<Cell<V, E>>;

/// Exclusive right to settle one freshly installed cell.
///
/// Dropping an unsettled claim (early return, or unwinding out of a factory)
/// evicts the cell and marks it abandoned.
struct Claim<'a, K: Eq + Hash, V, E> {
    entries: &'a DashMap<K, Shared<V, E>>,
    key: K,
    cell: Shared<V, E>,
    settled: bool,
}

impl<K: Eq + Hash, V: Clone, E: Clone> Claim<'_, K, V, E> {
    fn key(&self) -> &K {
        &self.key
    }

    fn publish(mut self, value: V) -> V {
        self.settled = true;
        self.cell.settle(Slot::Ready(value.clone()));
        value
    }

    fn fail(mut self, error: E) -> E {
        self.settled = true;
        self.evict();
        self.cell.settle(Slot::Failed(error.clone()));
        error
    }

    fn complete(self, result: Result<V, E>) -> Result<V, E> {
        match result {
            Ok(v) => Ok(self.publish(v)),
            Err(e) => Err(self.fail(e)),
        }
    }
}

impl<K: Eq + Hash, V, E> Claim<'_, K, V, E> {
    /// Remove the cell only if the map still points at it.
    fn evict(&self) {
        self.entries
            .remove_if(&self.key, |_, current| Arc::ptr_eq(current, &self.cell));
    }
}

impl<K: Eq + Hash, V, E> Drop for Claim<'_, K, V, E> {
    fn drop(&mut self) {
        if !self.settled {
            self.evict();
            self.cell.settle(Slot::Abandoned);
        }
    }
}

/// Thread-safe memoizing map.
///
/// `E` is the error type produced by the `try_*` factories; maps that only use
/// infallible factories keep the default.
pub struct MemoMap<K, V, E = Infallible> {
    entries: DashMap<K, Shared<V, E>>,
}

impl<K: Eq + Hash, V, E> Default for MemoMap<K, V, E> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V, E> fmt::Debug for MemoMap<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoMap")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl<K, V, E> MemoMap<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(&self, key: K, cell: Shared<V, E>) -> Claim<'_, K, V, E> {
        Claim {
            entries: &self.entries,
            key,
            cell,
            settled: false,
        }
    }

    /// Install a running cell unconditionally. Returns the displaced cell, if any.
    fn claim_replacing(&self, key: K) -> (Claim<'_, K, V, E>, Option<Shared<V, E>>) {
        let cell = Arc::new(Cell::running());
        let previous = match self.entries.entry(key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&cell));
                None
            }
            Entry::Occupied(mut slot) => Some(slot.insert(Arc::clone(&cell))),
        };
        (self.claim(key, cell), previous)
    }

    /// Install a running cell only over an existing entry.
    fn claim_existing(&self, key: K) -> Option<(Claim<'_, K, V, E>, Shared<V, E>)> {
        let cell = Arc::new(Cell::running());
        let previous = match self.entries.entry(key.clone()) {
            Entry::Vacant(_) => return None,
            Entry::Occupied(mut slot) => slot.insert(Arc::clone(&cell)),
        };
        Some((self.claim(key, cell), previous))
    }

    /// Install a running cell only into a vacant slot; otherwise hand back the occupant.
    fn claim_vacant(&self, key: &K) -> Result<Claim<'_, K, V, E>, Shared<V, E>> {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(slot) => Err(Arc::clone(slot.get())),
            Entry::Vacant(slot) => {
                let cell = Arc::new(Cell::running());
                slot.insert(Arc::clone(&cell));
                Ok(self.claim(key.clone(), cell))
            }
        }
    }

    fn cell<Q>(&self, key: &Q) -> Option<Shared<V, E>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(|e| Arc::clone(e.value()))
    }

    fn snapshot(&self) -> Vec<(K, Shared<V, E>)> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect()
    }

    /// Cached value for `key`, waiting for an in-flight computation. Never creates an entry.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.cell(key)?.wait().ready()
    }

    /// Like [`get`](Self::get), but surfaces the error of a computation that
    /// failed while this caller was waiting on it.
    pub fn try_get<Q>(&self, key: &Q) -> Result<Option<V>, E>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.cell(key) {
            Some(cell) => cell.wait().into_result(),
            None => Ok(None),
        }
    }

    /// Insert `add(key)` if absent, else replace with `update(key, current)`.
    ///
    /// Concurrent callers on the same missing key run `add` exactly once; every
    /// later caller runs `update` against the value before it.
    pub fn add_or_update<A, U>(&self, key: K, add: A, update: U) -> V
    where
        A: FnOnce(&K) -> V,
        U: FnOnce(&K, V) -> V,
    {
        let (claim, previous) = self.claim_replacing(key);
        let current = previous.and_then(|p| p.wait().ready());
        let value = match current {
            Some(old) => update(claim.key(), old),
            None => add(claim.key()),
        };
        claim.publish(value)
    }

    pub fn try_add_or_update<A, U>(&self, key: K, add: A, update: U) -> Result<V, E>
    where
        A: FnOnce(&K) -> Result<V, E>,
        U: FnOnce(&K, V) -> Result<V, E>,
    {
        let (claim, previous) = self.claim_replacing(key);
        let result = match previous.map(|p| p.wait()) {
            Some(Outcome::Ready(old)) => update(claim.key(), old),
            Some(Outcome::Failed(e)) => Err(e),
            None | Some(Outcome::Abandoned) => add(claim.key()),
        };
        claim.complete(result)
    }

    /// Replace an existing value with `update(key, current)`.
    /// Returns `None` without touching the map when `key` is absent.
    pub fn update_only<U>(&self, key: K, update: U) -> Option<V>
    where
        U: FnOnce(&K, V) -> V,
    {
        let (claim, previous) = self.claim_existing(key)?;
        let old = previous.wait().ready()?;
        let value = update(claim.key(), old);
        Some(claim.publish(value))
    }

    pub fn try_update_only<U>(&self, key: K, update: U) -> Result<Option<V>, E>
    where
        U: FnOnce(&K, V) -> Result<V, E>,
    {
        let Some((claim, previous)) = self.claim_existing(key) else {
            return Ok(None);
        };
        let result = match previous.wait() {
            Outcome::Ready(old) => update(claim.key(), old),
            Outcome::Failed(e) => Err(e),
            Outcome::Abandoned => return Ok(None),
        };
        claim.complete(result).map(Some)
    }

    /// Insert `add(key)` only if `key` is absent.
    /// Returns `None` without touching the map when a value is already present.
    pub fn add_only<A>(&self, key: K, add: A) -> Option<V>
    where
        A: FnOnce(&K) -> V,
    {
        loop {
            match self.claim_vacant(&key) {
                Ok(claim) => {
                    let value = add(claim.key());
                    return Some(claim.publish(value));
                }
                Err(existing) => {
                    if existing.wait().ready().is_some() {
                        return None;
                    }
                    // occupant failed and evicted itself; race for the slot again
                }
            }
        }
    }

    pub fn try_add_only<A>(&self, key: K, add: A) -> Result<Option<V>, E>
    where
        A: FnOnce(&K) -> Result<V, E>,
    {
        loop {
            match self.claim_vacant(&key) {
                Ok(claim) => {
                    let result = add(claim.key());
                    return claim.complete(result).map(Some);
                }
                Err(existing) => match existing.wait() {
                    Outcome::Ready(_) => return Ok(None),
                    Outcome::Failed(e) => return Err(e),
                    Outcome::Abandoned => {}
                },
            }
        }
    }

    /// Unconditionally store an already computed value.
    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, Arc::new(Cell::ready(value)));
    }

    /// Store an already computed value only if `key` is absent.
    pub fn try_insert(&self, key: K, value: V) -> bool {
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Cell::ready(value)));
                true
            }
        }
    }

    /// Remove `key`, returning its value. An entry whose computation failed
    /// is removed but reports `None`.
    pub fn try_remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (_, cell) = self.entries.remove(key)?;
        cell.wait().ready()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Point-in-time key snapshot. Does not wait on any computation.
    pub fn keys(&self) -> Vec<K> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    /// Point-in-time value snapshot; waits for in-flight cells and skips failed ones.
    pub fn values(&self) -> Vec<V> {
        self.snapshot()
            .into_iter()
            .filter_map(|(_, cell)| cell.wait().ready())
            .collect()
    }

    pub fn entries(&self) -> Vec<(K, V)> {
        self.snapshot()
            .into_iter()
            .filter_map(|(k, cell)| cell.wait().ready().map(|v| (k, v)))
            .collect()
    }
}

impl<K, V, E> FromIterator<(K, V)> for MemoMap<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
