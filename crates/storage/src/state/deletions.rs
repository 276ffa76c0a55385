// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deletion task event handlers.

use super::types::DeletionTaskRecord;
use super::MaterializedState;
use fod_core::Event;
use tracing::warn;

pub(super) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::DeletionSubmitted { id, file, site } => {
            state
                .deletion_tasks
                .entry(*id)
                .or_insert_with(|| DeletionTaskRecord::new(*id, file.clone(), site.clone()));
        }

        Event::DeletionStatusSet {
            id,
            status,
            exit_code,
            message,
            start_time,
            finish_time,
        } => {
            if let Some(record) = state.deletion_tasks.get_mut(id) {
                if record.status != *status && !record.status.can_transition_to(*status) {
                    warn!(%id, from = %record.status, to = %status, "dropping illegal deletion status transition");
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
