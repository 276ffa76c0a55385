// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fod-core: domain types shared by every crate of the file operations daemon.
//!
//! This crate owns the identifiers, status DAGs, event log entries, and
//! clock abstraction used to describe the `standalone_transfer_tasks`,
//! `standalone_deletion_tasks` and `standalone_transfer_batches` tables
//! without depending on any particular storage backend.

#[macro_use]
pub mod macros;

pub mod clock;
pub mod event;
pub mod ids;
pub mod status;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use event::Event;
pub use ids::{BatchId, DeletionTaskId, LinkKey, StorageEndpoint, TransferTaskId};
pub use status::{DeletionStatus, TransferStatus, CANCELLED_EXIT_CODE};
