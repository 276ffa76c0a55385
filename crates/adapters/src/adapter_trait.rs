// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin capability layer over the grid I/O library.
//!
//! Every method returns a structured [`AdapterResult`] — even failures —
//! so the caller (a task worker) can hand the same shape to the error
//! classifier and the collector's status write. An `Err(AdapterError)`
//! means the operation never ran to completion at all (the binary
//! couldn't be spawned, its output didn't parse), which a worker treats
//! the same way it treats a panic.

use crate::error::AdapterError;
use crate::types::{AdapterResult, BringOnlineResult, FileCopyParams, PollOutcome};
use async_trait::async_trait;

/// Capability layer over `gfal2`-equivalent grid I/O primitives.
///
/// Implementations must be `Send + Sync` so a single adapter instance can
/// back every worker in every pool.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn filecopy(&self, src: &str, dst: &str, params: &FileCopyParams) -> Result<AdapterResult, AdapterError>;

    async fn stat(&self, pfn: &str) -> Result<AdapterResult, AdapterError>;

    async fn unlink(&self, pfn: &str) -> Result<AdapterResult, AdapterError>;

    /// Issue an asynchronous tape recall for a batch of PFNs.
    async fn bring_online(
        &self,
        pfns: &[String],
        pin_time_secs: u64,
        timeout_secs: u64,
        r#async: bool,
    ) -> Result<BringOnlineResult, AdapterError>;

    /// Poll a single PFN's recall progress.
    async fn bring_online_poll(&self, pfn: &str, token: &str) -> Result<PollOutcome, AdapterError>;
}
