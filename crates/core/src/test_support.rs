// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::ids::{BatchId, DeletionTaskId, StorageEndpoint, TransferTaskId};
use crate::status::{DeletionStatus, TransferStatus};
use crate::Event;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core state machine types.
pub mod strategies {
    use super::*;
    use proptest::prelude::*;

    pub fn arb_transfer_status() -> impl Strategy<Value = TransferStatus> {
        prop_oneof![
            Just(TransferStatus::New),
            Just(TransferStatus::Staging),
            Just(TransferStatus::Staged),
            Just(TransferStatus::Queued),
            Just(TransferStatus::Active),
            Just(TransferStatus::Done),
            Just(TransferStatus::Failed),
            Just(TransferStatus::Cancelled),
        ]
    }

    pub fn arb_deletion_status() -> impl Strategy<Value = DeletionStatus> {
        prop_oneof![
            Just(DeletionStatus::New),
            Just(DeletionStatus::Queued),
            Just(DeletionStatus::Active),
            Just(DeletionStatus::Done),
            Just(DeletionStatus::Failed),
            Just(DeletionStatus::Cancelled),
        ]
    }

    /// A status reachable from `New` by one step down either status DAG,
    /// useful for transition-legality properties.
    pub fn arb_task_id() -> impl Strategy<Value = u64> {
        1u64..100_000
    }
}

// ── Event factory functions ─────────────────────────────────────────────────

pub fn transfer_submitted_event(id: u64, batch_id: u64, source: &str, destination: &str) -> Event {
    Event::TransferSubmitted {
        id: TransferTaskId::new(id),
        batch_id: BatchId::new(batch_id),
        source: StorageEndpoint::from(source),
        destination: StorageEndpoint::from(destination),
        checksum_algo: None,
        checksum: None,
    }
}

pub fn transfer_status_event(id: u64, status: TransferStatus) -> Event {
    Event::TransferStatusSet {
        id: TransferTaskId::new(id),
        status,
        exit_code: None,
        message: None,
        start_time: None,
        finish_time: None,
    }
}

pub fn transfer_terminal_event(id: u64, status: TransferStatus, exit_code: i32, message: &str) -> Event {
    Event::TransferStatusSet {
        id: TransferTaskId::new(id),
        status,
        exit_code: Some(exit_code),
        message: Some(message.to_string()),
        start_time: Some(1_000),
        finish_time: Some(1_005),
    }
}

pub fn deletion_submitted_event(id: u64, file: &str, site: &str) -> Event {
    Event::DeletionSubmitted {
        id: DeletionTaskId::new(id),
        file: file.to_string(),
        site: StorageEndpoint::from(site),
    }
}

pub fn deletion_status_event(id: u64, status: DeletionStatus) -> Event {
    Event::DeletionStatusSet {
        id: DeletionTaskId::new(id),
        status,
        exit_code: None,
        message: None,
        start_time: None,
        finish_time: None,
    }
}

pub fn batch_registered_event(batch_id: u64, source_site: &str, destination_site: &str, mss_source: bool) -> Event {
    Event::BatchRegistered {
        batch_id: BatchId::new(batch_id),
        source_site: StorageEndpoint::from(source_site),
        destination_site: StorageEndpoint::from(destination_site),
        mss_source,
    }
}

pub fn batch_stage_token_event(batch_id: u64, stage_token: Option<&str>) -> Event {
    Event::BatchStageTokenSet {
        batch_id: BatchId::new(batch_id),
        stage_token: stage_token.map(str::to_string),
    }
}
