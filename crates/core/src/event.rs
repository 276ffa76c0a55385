// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event log entries applied to `MaterializedState`.
//!
//! Every column write the daemon would otherwise issue as a SQL `UPDATE`
//! or `INSERT` is instead recorded as one of these variants and appended to
//! the write-ahead log. `MaterializedState::apply_event` must be idempotent
//! for every variant: events may be replayed from the last snapshot on
//! startup, and a worker crash can leave a duplicate in the WAL tail.

use crate::ids::{BatchId, DeletionTaskId, StorageEndpoint, TransferTaskId};
use crate::status::{DeletionStatus, TransferStatus};
use serde::{Deserialize, Serialize};

/// Events that mutate the daemon's view of the task and batch tables.
///
/// Serializes as `{"type": "event:name", ...fields}`. Unknown type tags
/// deserialize to `Unknown` rather than failing WAL replay outright, so a
/// downgrade after a forward-compatible append doesn't brick the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- transfer task lifecycle --
    #[serde(rename = "transfer:submitted")]
    TransferSubmitted {
        id: TransferTaskId,
        batch_id: BatchId,
        source: StorageEndpoint,
        destination: StorageEndpoint,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checksum_algo: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checksum: Option<String>,
    },

    #[serde(rename = "transfer:status_set")]
    TransferStatusSet {
        id: TransferTaskId,
        status: TransferStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_time: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finish_time: Option<u64>,
    },

    // -- deletion task lifecycle --
    #[serde(rename = "deletion:submitted")]
    DeletionSubmitted {
        id: DeletionTaskId,
        file: String,
        site: StorageEndpoint,
    },

    #[serde(rename = "deletion:status_set")]
    DeletionStatusSet {
        id: DeletionTaskId,
        status: DeletionStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_time: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finish_time: Option<u64>,
    },

    // -- batch --
    #[serde(rename = "batch:registered")]
    BatchRegistered {
        batch_id: BatchId,
        source_site: StorageEndpoint,
        destination_site: StorageEndpoint,
        mss_source: bool,
    },

    #[serde(rename = "batch:stage_token_set")]
    BatchStageTokenSet {
        batch_id: BatchId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stage_token: Option<String>,
    },

    /// Catch-all for forward-compatible log entries this build doesn't know.
    #[serde(other, skip_serializing)]
    Unknown,
}

impl Event {
    /// A short tag for log lines, independent of the serde wire name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransferSubmitted { .. } => "transfer:submitted",
            Self::TransferStatusSet { .. } => "transfer:status_set",
            Self::DeletionSubmitted { .. } => "deletion:submitted",
            Self::DeletionStatusSet { .. } => "deletion:status_set",
            Self::BatchRegistered { .. } => "batch:registered",
            Self::BatchStageTokenSet { .. } => "batch:stage_token_set",
            Self::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_tag_deserializes_to_unknown_variant() {
        let json = r#"{"type":"future:event","foo":"bar"}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event, Event::Unknown);
    }

    #[test]
    fn transfer_status_set_round_trips() {
        let event = Event::TransferStatusSet {
            id: TransferTaskId::new(1),
            status: TransferStatus::Done,
            exit_code: Some(0),
            message: None,
            start_time: Some(100),
            finish_time: Some(105),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn kind_is_stable_independent_of_serde_rename() {
        let event = Event::BatchRegistered {
            batch_id: BatchId::new(1),
            source_site: "SITE-A".into(),
            destination_site: "SITE-B".into(),
            mss_source: true,
        };
        assert_eq!(event.kind(), "batch:registered");
    }
}
