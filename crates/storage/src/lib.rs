// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fod-storage: event-sourced persistence for the file operations daemon.
//!
//! The relational tables the original daemon shared with the File
//! Operations Manager (`standalone_transfer_tasks`,
//! `standalone_deletion_tasks`, `standalone_transfer_batches`) are realized
//! here as a write-ahead log of [`fod_core::Event`]s, a zstd-compressed
//! periodic snapshot, and an in-memory [`MaterializedState`] folded from
//! both. [`Store`] is the facade every other crate uses; the WAL,
//! snapshot, and checkpoint modules are exposed for tests and tooling that
//! need lower-level access.

pub mod checkpoint;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod wal;

pub use checkpoint::{Checkpointer, CheckpointError, CheckpointResult};
pub use snapshot::{Snapshot, SnapshotError};
pub use state::{BatchRecord, DeletionTaskRecord, MaterializedState, TransferTaskRecord};
pub use store::{Store, StoreError};
pub use wal::{Wal, WalEntry, WalError};
