// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row types materialized from the event log.

use fod_core::{BatchId, DeletionTaskId, StorageEndpoint, TransferTaskId};
use fod_core::{DeletionStatus, TransferStatus};
use serde::{Deserialize, Serialize};

/// Materialized row of `standalone_transfer_tasks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferTaskRecord {
    pub id: TransferTaskId,
    pub batch_id: BatchId,
    pub source: StorageEndpoint,
    pub destination: StorageEndpoint,
    pub checksum_algo: Option<String>,
    pub checksum: Option<String>,
    pub status: TransferStatus,
    pub exit_code: Option<i32>,
    pub message: Option<String>,
    pub start_time: Option<u64>,
    pub finish_time: Option<u64>,
}

impl TransferTaskRecord {
    pub(crate) fn new(
        id: TransferTaskId,
        batch_id: BatchId,
        source: StorageEndpoint,
        destination: StorageEndpoint,
    ) -> Self {
        Self {
            id,
            batch_id,
            source,
            destination,
            checksum_algo: None,
            checksum: None,
            status: TransferStatus::New,
            exit_code: None,
            message: None,
            start_time: None,
            finish_time: None,
        }
    }
}

/// Materialized row of `standalone_deletion_tasks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionTaskRecord {
    pub id: DeletionTaskId,
    pub file: String,
    pub site: StorageEndpoint,
    pub status: DeletionStatus,
    pub exit_code: Option<i32>,
    pub message: Option<String>,
    pub start_time: Option<u64>,
    pub finish_time: Option<u64>,
}

impl DeletionTaskRecord {
    pub(crate) fn new(id: DeletionTaskId, file: String, site: StorageEndpoint) -> Self {
        Self {
            id,
            file,
            site,
            status: DeletionStatus::New,
            exit_code: None,
            message: None,
            start_time: None,
            finish_time: None,
        }
    }
}

/// Materialized row of `standalone_transfer_batches`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub batch_id: BatchId,
    pub source_site: StorageEndpoint,
    pub destination_site: StorageEndpoint,
    pub mss_source: bool,
    pub stage_token: Option<String>,
}

impl BatchRecord {
    /// Whether this batch is a tape source still awaiting a `bring_online` token.
    pub fn needs_staging(&self) -> bool {
        self.mss_source && self.stage_token.is_none()
    }
}
