// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transfer batch event handlers.

use super::types::BatchRecord;
use super::MaterializedState;
use fod_core::Event;

pub(super) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::BatchRegistered {
            batch_id,
            source_site,
            destination_site,
            mss_source,
        } => {
            state.batches.entry(*batch_id).or_insert_with(|| BatchRecord {
                batch_id: *batch_id,
                source_site: source_site.clone(),
                destination_site: destination_site.clone(),
                mss_source: *mss_source,
                stage_token: None,
            });
        }

        Event::BatchStageTokenSet { batch_id, stage_token } => {
            if let Some(batch) = state.batches.get_mut(batch_id) {
                batch.stage_token = stage_token.clone();
            }
        }

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fod_core::test_support::{batch_registered_event, batch_stage_token_event};
    use fod_core::BatchId;

    #[test]
    fn registering_twice_preserves_an_already_set_token() {
        let mut state = MaterializedState::default();
        state.apply_event(&batch_registered_event(1, "SITE-TAPE", "SITE-DISK", true));
        state.apply_event(&batch_stage_token_event(1, Some("tok-abc")));
        state.apply_event(&batch_registered_event(1, "SITE-TAPE", "SITE-DISK", true));

        let batch = &state.batches[&BatchId::new(1)];
        assert_eq!(batch.stage_token.as_deref(), Some("tok-abc"));
        assert!(!batch.needs_staging());
    }
}
