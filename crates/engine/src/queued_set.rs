// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared queued-id set used for asynchronous cancellation.
//!
//! The queue scheduler refreshes this set every pass from
//! `SELECT id WHERE status='queued'`; a task whose row is flipped to
//! `cancelled` directly in the database by another process drops out of
//! the next refresh. A worker's preamble races against that refresh: if
//! its id is still present when the worker starts, the removal and the
//! refresh are totally ordered by the mutex, giving a happens-before edge
//! between "scheduler submits" and "worker decides cancel vs proceed".

use parking_lot::Mutex;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

/// Shared, mutex-guarded set of ids currently in the `queued` status.
#[derive(Clone)]
pub struct QueuedSet<Id: Eq + Hash + Copy + Send> {
    ids: Arc<Mutex<HashSet<Id>>>,
}

impl<Id: Eq + Hash + Copy + Send> Default for QueuedSet<Id> {
    fn default() -> Self {
        Self {
            ids: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl<Id: Eq + Hash + Copy + Send> QueuedSet<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set's contents wholesale, as the scheduler's refresh
    /// step does each pass.
    pub fn refresh(&self, ids: impl IntoIterator<Item = Id>) {
        let mut set = self.ids.lock();
        set.clear();
        set.extend(ids);
    }

    /// Atomically test-and-remove: a worker calls this at the start of its
    /// preamble. Returns `true` if the id was present (and has now been
    /// removed) — the worker proceeds. Returns `false` if it was already
    /// gone — the worker reports `cancelled` without touching I/O.
    pub fn try_remove(&self, id: Id) -> bool {
        self.ids.lock().remove(&id)
    }

    /// Add a single id, used by submission to mark a task `queued` before
    /// handing it to a pool.
    pub fn insert(&self, id: Id) {
        self.ids.lock().insert(id);
    }

    /// Insert `id` only if absent; returns `true` if this call inserted it.
    /// Used to guard against submitting a second concurrent poll for a
    /// staging task already in flight.
    pub fn try_insert(&self, id: Id) -> bool {
        self.ids.lock().insert(id)
    }

    pub fn remove(&self, id: Id) {
        self.ids.lock().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_remove_is_one_shot() {
        let set: QueuedSet<u64> = QueuedSet::new();
        set.insert(1);
        assert!(set.try_remove(1));
        assert!(!set.try_remove(1));
    }

    #[test]
    fn refresh_replaces_contents() {
        let set: QueuedSet<u64> = QueuedSet::new();
        set.insert(1);
        set.insert(2);
        set.refresh([3, 4]);
        assert!(!set.try_remove(1));
        assert!(set.try_remove(3));
        assert!(set.try_remove(4));
    }
}
