// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Store`: the single handle through which workers, collectors, and the
//! queue scheduler read and mutate task/batch state.
//!
//! This is the crate's substitute for the shared database handle the
//! daemon would otherwise hold open against MySQL: reads and in-flight
//! status writes go through an in-memory [`MaterializedState`] guarded by
//! a mutex, every status write is durably appended to the WAL first, and a
//! background [`Checkpointer`] periodically compacts the WAL into a
//! snapshot. No application-level locks beyond this mutex are needed —
//! coordination between worker, collector, and scheduler happens because
//! each stage only ever writes a disjoint status range.

use crate::checkpoint::{load_compressed_snapshot, CheckpointError, CheckpointHandle, Checkpointer};
use crate::state::MaterializedState;
use crate::wal::{Wal, WalError};
use fod_core::Event;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] crate::snapshot::SnapshotError),
}

struct Inner {
    wal: Wal,
    state: MaterializedState,
    pending_checkpoint: Option<CheckpointHandle>,
}

/// Durable, mutex-guarded handle onto the daemon's task/batch state.
pub struct Store {
    inner: Mutex<Inner>,
    checkpointer: Checkpointer,
}

impl Store {
    /// Open (or create) the store rooted at `dir`, replaying the WAL on top
    /// of the last snapshot. `dir` holds `snapshot.zst` and `events.jsonl`.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        let snapshot_path = dir.join("snapshot.zst");
        let wal_path = dir.join("events.jsonl");

        let (mut state, processed_seq) = match load_compressed_snapshot(&snapshot_path)? {
            Some(snapshot) => {
                info!(
                    seq = snapshot.seq,
                    transfers = snapshot.state.transfer_tasks.len(),
                    deletions = snapshot.state.deletion_tasks.len(),
                    "loaded snapshot"
                );
                (snapshot.state, snapshot.seq)
            }
            None => {
                info!("no snapshot found, starting from an empty store");
                (MaterializedState::default(), 0)
            }
        };

        let mut wal = Wal::open(&wal_path, processed_seq)?;
        let backlog = wal.entries_after(processed_seq)?;
        let replayed = backlog.len();
        let mut last_seq = processed_seq;
        for entry in backlog {
            state.apply_event(&entry.event);
            last_seq = entry.seq;
        }
        wal.mark_processed(last_seq);

        if replayed > 0 {
            info!(replayed, from_seq = processed_seq, "replayed WAL entries on startup");
        }

        Ok(Self {
            inner: Mutex::new(Inner {
                wal,
                state,
                pending_checkpoint: None,
            }),
            checkpointer: Checkpointer::new(snapshot_path),
        })
    }

    /// Append an event to the WAL and apply it to the in-memory state.
    ///
    /// Flushes immediately: every caller of this method is writing a
    /// status transition that the next scheduler pass or cancellation
    /// check must see, so group-commit batching isn't worth the added
    /// staleness window here.
    pub fn apply(&self, event: Event) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let seq = inner.wal.append(&event)?;
        inner.wal.flush()?;
        inner.wal.mark_processed(seq);
        inner.state.apply_event(&event);
        Ok(())
    }

    /// Apply a batch of events under a single lock acquisition, flushing once.
    pub fn apply_all(&self, events: impl IntoIterator<Item = Event>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let mut last_seq = None;
        for event in events {
            let seq = inner.wal.append(&event)?;
            inner.state.apply_event(&event);
            last_seq = Some(seq);
        }
        inner.wal.flush()?;
        if let Some(seq) = last_seq {
            inner.wal.mark_processed(seq);
        }
        Ok(())
    }

    /// Run `f` against a read-only view of the materialized state.
    pub fn with_state<R>(&self, f: impl FnOnce(&MaterializedState) -> R) -> R {
        let inner = self.inner.lock();
        f(&inner.state)
    }

    /// Kick off a background checkpoint if one isn't already running.
    /// Returns `false` if a checkpoint was already in flight.
    pub fn checkpoint_if_idle(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.pending_checkpoint.is_some() {
            return false;
        }
        let seq = inner.wal.processed_seq();
        let handle = self.checkpointer.start(seq, &inner.state);
        inner.pending_checkpoint = Some(handle);
        true
    }

    /// Poll a pending checkpoint; if it has completed, truncate the WAL up
    /// to the checkpointed sequence. Crash-safe: the snapshot is fsynced
    /// (including the directory entry) before truncation runs.
    pub fn finish_checkpoint_if_ready(&self) -> Result<Option<u64>, CheckpointError> {
        let mut inner = self.inner.lock();
        let Some(handle) = inner.pending_checkpoint.take() else {
            return Ok(None);
        };
        match handle.try_wait() {
            Some(Ok(result)) => {
                inner.wal.truncate_before(result.seq)?;
                Ok(Some(result.seq))
            }
            Some(Err(e)) => Err(e),
            None => {
                // Still running; put it back.
                inner.pending_checkpoint = None;
                Ok(None)
            }
        }
    }

    /// Synchronous checkpoint + truncate, for a clean shutdown where there's
    /// no scheduler loop left to poll a background handle.
    pub fn checkpoint_sync(&self) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock();
        let seq = inner.wal.processed_seq();
        let result = self
            .checkpointer
            .checkpoint_sync(seq, &inner.state)
            .map_err(|e| StoreError::Snapshot(crate::snapshot::SnapshotError::Io(std::io::Error::other(e.to_string()))))?;
        inner.wal.truncate_before(result.seq)?;
        Ok(result.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fod_core::test_support::{transfer_submitted_event, transfer_terminal_event};
    use fod_core::TransferStatus;
    use tempfile::tempdir;

    #[test]
    fn apply_is_visible_immediately_and_after_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = Store::open(dir.path()).unwrap();
            store.apply(transfer_submitted_event(1, 1, "A", "B")).unwrap();
            store.apply(transfer_terminal_event(1, TransferStatus::Done, 0, "")).unwrap();
            store.with_state(|s| assert_eq!(s.transfer_tasks.len(), 1));
        }

        let store = Store::open(dir.path()).unwrap();
        store.with_state(|s| {
            assert_eq!(s.transfer_tasks[&fod_core::TransferTaskId::new(1)].status, TransferStatus::Done);
        });
    }

    #[test]
    fn checkpoint_then_reopen_still_reflects_applied_events() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        store.apply(transfer_submitted_event(1, 1, "A", "B")).unwrap();
        store.checkpoint_sync().unwrap();
        drop(store);

        let store = Store::open(dir.path()).unwrap();
        store.with_state(|s| assert_eq!(s.transfer_tasks.len(), 1));
    }

    #[test]
    fn checkpoint_if_idle_refuses_a_second_concurrent_checkpoint() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        assert!(store.checkpoint_if_idle());
        assert!(!store.checkpoint_if_idle());
    }
}
