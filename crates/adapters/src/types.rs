// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types shared by every [`crate::StorageAdapter`] implementation.

use serde::{Deserialize, Serialize};

/// The structured result every adapter call returns, mirroring the grid
/// I/O library's own `(exit_code, start_ts, finish_ts, message, log_buffer)`
/// tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterResult {
    pub exit_code: i32,
    pub start_ts: Option<u64>,
    pub finish_ts: Option<u64>,
    pub message: String,
    pub log: String,
}

impl AdapterResult {
    pub fn success(start_ts: u64, finish_ts: u64, log: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            start_ts: Some(start_ts),
            finish_ts: Some(finish_ts),
            message: String::new(),
            log: log.into(),
        }
    }

    pub fn failure(exit_code: i32, start_ts: u64, finish_ts: u64, message: impl Into<String>, log: impl Into<String>) -> Self {
        Self {
            exit_code,
            start_ts: Some(start_ts),
            finish_ts: Some(finish_ts),
            message: message.into(),
            log: log.into(),
        }
    }

    /// The sentinel a worker returns when it loses the queued-set race:
    /// exit code `-1`, no timestamps, empty message and log.
    pub fn cancelled() -> Self {
        Self {
            exit_code: fod_core::CANCELLED_EXIT_CODE,
            start_ts: None,
            finish_ts: None,
            message: String::new(),
            log: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Parameters passed through to `filecopy`.
#[derive(Debug, Clone, Default)]
pub struct FileCopyParams {
    pub checksum_algo: Option<String>,
    pub checksum: Option<String>,
    pub overwrite: bool,
    pub timeout_secs: u64,
}

/// Outcome of a single `bring_online_poll` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Ready,
    Pending,
    Error(AdapterResult),
}

/// Result of issuing `bring_online` for a batch: per-PFN errors (`None`
/// means that file was accepted) plus the opaque token for subsequent polls.
#[derive(Debug, Clone)]
pub struct BringOnlineResult {
    pub per_file_errors: Vec<(String, Option<AdapterResult>)>,
    pub token: Option<String>,
}
