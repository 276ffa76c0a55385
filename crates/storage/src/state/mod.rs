// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay.
//!
//! This is the in-memory stand-in for the relational tables the daemon
//! shares with the File Operations Manager: `standalone_transfer_tasks`,
//! `standalone_deletion_tasks`, and `standalone_transfer_batches`. Every
//! column write is an [`Event`] applied here rather than a SQL statement.

mod batches;
mod deletions;
mod transfers;
mod types;

pub use types::{BatchRecord, DeletionTaskRecord, TransferTaskRecord};

use fod_core::{BatchId, DeletionStatus, DeletionTaskId, Event, TransferStatus, TransferTaskId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Materialized state built from event log replay.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub transfer_tasks: HashMap<TransferTaskId, TransferTaskRecord>,
    pub deletion_tasks: HashMap<DeletionTaskId, DeletionTaskRecord>,
    pub batches: HashMap<BatchId, BatchRecord>,
}

impl MaterializedState {
    /// Apply an event to derive state changes.
    ///
    /// # Idempotency requirement
    ///
    /// All event handlers MUST be idempotent. Applying the same event twice
    /// must produce the same state as applying it once: the collector
    /// applies events for immediate in-process visibility, and the same
    /// entries are replayed from the WAL again after a restart.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::TransferSubmitted { .. } | Event::TransferStatusSet { .. } => {
                transfers::apply(self, event)
            }
            Event::DeletionSubmitted { .. } | Event::DeletionStatusSet { .. } => {
                deletions::apply(self, event)
            }
            Event::BatchRegistered { .. } | Event::BatchStageTokenSet { .. } => {
                batches::apply(self, event)
            }
            Event::Unknown => {}
        }
    }

    /// Transfer tasks in `status`, ordered by id.
    pub fn transfer_tasks_with_status(&self, status: TransferStatus) -> Vec<&TransferTaskRecord> {
        let mut rows: Vec<_> = self
            .transfer_tasks
            .values()
            .filter(|t| t.status == status)
            .collect();
        rows.sort_by_key(|t| t.id);
        rows
    }

    /// Deletion tasks in `status`, ordered by `(site, id)` as the scheduler's
    /// selecting query does.
    pub fn deletion_tasks_with_status(&self, status: DeletionStatus) -> Vec<&DeletionTaskRecord> {
        let mut rows: Vec<_> = self
            .deletion_tasks
            .values()
            .filter(|t| t.status == status)
            .collect();
        rows.sort_by(|a, b| (&a.site, a.id).cmp(&(&b.site, b.id)));
        rows
    }

    /// Tasks ready to submit to a transfer pool: `status='new'` with a
    /// non-tape source batch, or `status='staged'`. Ordered by
    /// `(source_site, dest_site, id)`.
    pub fn runnable_transfer_tasks(&self) -> Vec<&TransferTaskRecord> {
        let mut rows: Vec<_> = self
            .transfer_tasks
            .values()
            .filter(|t| match t.status {
                TransferStatus::Staged => true,
                TransferStatus::New => self
                    .batches
                    .get(&t.batch_id)
                    .map(|b| !b.mss_source)
                    .unwrap_or(true),
                _ => false,
            })
            .collect();
        rows.sort_by(|a, b| (&a.source, &a.destination, a.id).cmp(&(&b.source, &b.destination, b.id)));
        rows
    }

    /// `staging` transfer tasks ordered by `(source_site, id)`.
    pub fn staging_transfer_tasks(&self) -> Vec<&TransferTaskRecord> {
        let mut rows = self.transfer_tasks_with_status(TransferStatus::Staging);
        rows.sort_by(|a, b| (&a.source, a.id).cmp(&(&b.source, b.id)));
        rows
    }

    /// Batches that are tape sources with no `bring_online` token yet.
    pub fn batches_needing_staging(&self) -> Vec<&BatchRecord> {
        let mut rows: Vec<_> = self.batches.values().filter(|b| b.needs_staging()).collect();
        rows.sort_by_key(|b| b.batch_id);
        rows
    }

    /// Transfer task ids currently `queued`, for refreshing the shared
    /// queued-id set used for cancellation.
    pub fn queued_transfer_ids(&self) -> Vec<TransferTaskId> {
        self.transfer_tasks_with_status(TransferStatus::Queued)
            .into_iter()
            .map(|t| t.id)
            .collect()
    }

    /// Deletion task ids currently `queued`.
    pub fn queued_deletion_ids(&self) -> Vec<DeletionTaskId> {
        self.deletion_tasks_with_status(DeletionStatus::Queued)
            .into_iter()
            .map(|t| t.id)
            .collect()
    }

    /// All rows currently `queued` or `active`, across both tables — the
    /// set the crash-recovery sweep rewrites back to `new` at startup.
    pub fn in_flight_rows(&self) -> (Vec<TransferTaskId>, Vec<DeletionTaskId>) {
        let transfers = self
            .transfer_tasks
            .values()
            .filter(|t| matches!(t.status, TransferStatus::Queued | TransferStatus::Active))
            .map(|t| t.id)
            .collect();
        let deletions = self
            .deletion_tasks
            .values()
            .filter(|t| matches!(t.status, DeletionStatus::Queued | DeletionStatus::Active))
            .map(|t| t.id)
            .collect();
        (transfers, deletions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fod_core::test_support::*;

    #[test]
    fn runnable_transfer_tasks_excludes_new_tape_sourced_rows() {
        let mut state = MaterializedState::default();
        state.apply_event(&batch_registered_event(1, "SITE-TAPE", "SITE-DISK", true));
        state.apply_event(&batch_registered_event(2, "SITE-DISK", "SITE-DISK2", false));
        state.apply_event(&transfer_submitted_event(1, 1, "SITE-TAPE", "SITE-DISK"));
        state.apply_event(&transfer_submitted_event(2, 2, "SITE-DISK", "SITE-DISK2"));

        let runnable = state.runnable_transfer_tasks();
        assert_eq!(runnable.len(), 1);
        assert_eq!(runnable[0].id, TransferTaskId::new(2));
    }

    #[test]
    fn staged_tasks_are_runnable_regardless_of_batch() {
        let mut state = MaterializedState::default();
        state.apply_event(&batch_registered_event(1, "SITE-TAPE", "SITE-DISK", true));
        state.apply_event(&transfer_submitted_event(1, 1, "SITE-TAPE", "SITE-DISK"));
        state.apply_event(&transfer_status_event(1, TransferStatus::Staged));

        let runnable = state.runnable_transfer_tasks();
        assert_eq!(runnable.len(), 1);
    }

    #[test]
    fn crash_recovery_sweep_targets_queued_and_active_only() {
        let mut state = MaterializedState::default();
        state.apply_event(&transfer_submitted_event(1, 1, "A", "B"));
        state.apply_event(&transfer_status_event(1, TransferStatus::Active));
        state.apply_event(&transfer_submitted_event(2, 1, "A", "B"));
        state.apply_event(&transfer_status_event(2, TransferStatus::Queued));
        state.apply_event(&transfer_submitted_event(3, 1, "A", "B"));

        let (transfers, _) = state.in_flight_rows();
        let mut ids: Vec<u64> = transfers.iter().map(|id| id.get()).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
    }
}
