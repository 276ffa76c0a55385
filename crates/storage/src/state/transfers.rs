// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transfer task event handlers.
//!
//! All handlers here must be idempotent: the same event may be applied
//! twice, once for immediate in-process visibility and once more during
//! WAL replay after a restart.

use super::MaterializedState;
use super::types::TransferTaskRecord;
use fod_core::Event;
use tracing::warn;

pub(super) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::TransferSubmitted {
            id,
            batch_id,
            source,
            destination,
            checksum_algo,
            checksum,
        } => {
            let record = state
                .transfer_tasks
                .entry(*id)
                .or_insert_with(|| TransferTaskRecord::new(*id, *batch_id, source.clone(), destination.clone()));
            record.checksum_algo = checksum_algo.clone();
            record.checksum = checksum.clone();
        }

        Event::TransferStatusSet {
            id,
            status,
            exit_code,
            message,
            start_time,
            finish_time,
        } => {
            if let Some(record) = state.transfer_tasks.get_mut(id) {
                if record.status != *status && !record.status.can_transition_to(*status) {
                    warn!(%id, from = %record.status, to = %status, "dropping illegal transfer status transition");
                    return;
                }
                record.status = *status;
                if exit_code.is_some() {
                    record.exit_code = *exit_code;
                }
                if message.is_some() {
                    record.message = message.clone();
                }
                if start_time.is_some() {
                    record.start_time = *start_time;
                }
                if finish_time.is_some() {
                    record.finish_time = *finish_time;
                }
            }
        }

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fod_core::test_support::{transfer_status_event, transfer_submitted_event, transfer_terminal_event};
    use fod_core::TransferStatus;

    #[test]
    fn submitting_twice_does_not_duplicate_or_reset_status() {
        let mut state = MaterializedState::default();
        state.apply_event(&transfer_submitted_event(1, 10, "SITE-A", "SITE-B"));
        state.apply_event(&transfer_status_event(1, TransferStatus::Queued));
        state.apply_event(&transfer_status_event(1, TransferStatus::Active));
        state.apply_event(&transfer_terminal_event(1, TransferStatus::Done, 0, ""));
        state.apply_event(&transfer_submitted_event(1, 10, "SITE-A", "SITE-B"));

        assert_eq!(state.transfer_tasks.len(), 1);
        assert_eq!(state.transfer_tasks[&fod_core::TransferTaskId::new(1)].status, TransferStatus::Done);
    }

    #[test]
    fn status_set_is_idempotent() {
        let mut state = MaterializedState::default();
        state.apply_event(&transfer_submitted_event(1, 10, "SITE-A", "SITE-B"));
        state.apply_event(&transfer_status_event(1, TransferStatus::Queued));
        state.apply_event(&transfer_status_event(1, TransferStatus::Active));
        let event = transfer_terminal_event(1, TransferStatus::Failed, 1, "boom");
        state.apply_event(&event);
        state.apply_event(&event);

        let record = &state.transfer_tasks[&fod_core::TransferTaskId::new(1)];
        assert_eq!(record.status, TransferStatus::Failed);
        assert_eq!(record.exit_code, Some(1));
    }

    #[test]
    fn queued_to_done_skipping_active_is_dropped() {
        let mut state = MaterializedState::default();
        state.apply_event(&transfer_submitted_event(1, 10, "SITE-A", "SITE-B"));
        state.apply_event(&transfer_status_event(1, TransferStatus::Queued));
        state.apply_event(&transfer_terminal_event(1, TransferStatus::Done, 0, ""));

        assert_eq!(state.transfer_tasks[&fod_core::TransferTaskId::new(1)].status, TransferStatus::Queued);
    }

    #[test]
    fn crash_recovery_reset_from_active_to_new_is_accepted() {
        let mut state = MaterializedState::default();
        state.apply_event(&transfer_submitted_event(1, 10, "SITE-A", "SITE-B"));
        state.apply_event(&transfer_status_event(1, TransferStatus::Queued));
        state.apply_event(&transfer_status_event(1, TransferStatus::Active));
        state.apply_event(&transfer_status_event(1, TransferStatus::New));

        assert_eq!(state.transfer_tasks[&fod_core::TransferTaskId::new(1)].status, TransferStatus::New);
    }
}
