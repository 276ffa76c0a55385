// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process [`StorageAdapter`] for deterministic worker and scheduler
//! tests — no real grid storage endpoint required.
//!
//! Every call is recorded, and outcomes are programmable per-PFN so tests
//! can script exactly the sequence of retryable/irrecoverable/successful
//! results a scenario needs (e.g. "fail twice, then succeed" for the
//! bounded-retry invariant).

use crate::adapter_trait::StorageAdapter;
use crate::error::AdapterError;
use crate::types::{AdapterResult, BringOnlineResult, FileCopyParams, PollOutcome};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// One recorded invocation against the fake adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterCall {
    FileCopy { src: String, dst: String },
    Stat { pfn: String },
    Unlink { pfn: String },
    BringOnline { pfns: Vec<String> },
    BringOnlinePoll { pfn: String, token: String },
}

#[derive(Default)]
struct FakeAdapterState {
    calls: Vec<AdapterCall>,
    /// Per-pfn queue of results to return from `stat`, consumed in order;
    /// the last entry is reused once the queue is drained.
    stat_results: HashMap<String, VecDeque<AdapterResult>>,
    filecopy_results: HashMap<String, VecDeque<AdapterResult>>,
    unlink_results: HashMap<String, VecDeque<AdapterResult>>,
    bring_online_token: Option<String>,
    bring_online_errors: HashMap<String, AdapterResult>,
    poll_ready: std::collections::HashSet<String>,
    poll_errors: HashMap<String, AdapterResult>,
}

/// Fake [`StorageAdapter`] with programmable, per-PFN scripted results.
#[derive(Clone, Default)]
pub struct FakeAdapter {
    state: Arc<Mutex<FakeAdapterState>>,
}

impl FakeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<AdapterCall> {
        self.state.lock().calls.clone()
    }

    /// Queue a `stat` result for `pfn`; `filecopy` consults this to decide
    /// whether the destination is already present.
    pub fn push_stat_result(&self, pfn: &str, result: AdapterResult) {
        self.state.lock().stat_results.entry(pfn.to_string()).or_default().push_back(result);
    }

    /// Queue a `filecopy` result for the `(src, dst)` pair keyed by `dst`.
    pub fn push_filecopy_result(&self, dst: &str, result: AdapterResult) {
        self.state.lock().filecopy_results.entry(dst.to_string()).or_default().push_back(result);
    }

    pub fn push_unlink_result(&self, pfn: &str, result: AdapterResult) {
        self.state.lock().unlink_results.entry(pfn.to_string()).or_default().push_back(result);
    }

    /// Set the token `bring_online` should hand back, and which PFNs (if
    /// any) should be reported as per-file errors instead.
    pub fn set_bring_online_token(&self, token: impl Into<String>) {
        self.state.lock().bring_online_token = Some(token.into());
    }

    pub fn set_bring_online_error(&self, pfn: &str, result: AdapterResult) {
        self.state.lock().bring_online_errors.insert(pfn.to_string(), result);
    }

    /// Mark a PFN as ready for the next `bring_online_poll` call.
    pub fn set_staged(&self, pfn: &str) {
        self.state.lock().poll_ready.insert(pfn.to_string());
    }

    pub fn set_poll_error(&self, pfn: &str, result: AdapterResult) {
        self.state.lock().poll_errors.insert(pfn.to_string(), result);
    }
}

fn next_or_default(queue: &mut VecDeque<AdapterResult>, default: AdapterResult) -> AdapterResult {
    if queue.len() > 1 {
        queue.pop_front().unwrap_or(default)
    } else {
        queue.front().cloned().unwrap_or(default)
    }
}

#[async_trait]
impl StorageAdapter for FakeAdapter {
    async fn filecopy(&self, src: &str, dst: &str, _params: &FileCopyParams) -> Result<AdapterResult, AdapterError> {
        let mut state = self.state.lock();
        state.calls.push(AdapterCall::FileCopy {
            src: src.to_string(),
            dst: dst.to_string(),
        });
        let default = AdapterResult::success(1, 2, "");
        let result = match state.filecopy_results.get_mut(dst) {
            Some(queue) => next_or_default(queue, default),
            None => default,
        };
        Ok(result)
    }

    async fn stat(&self, pfn: &str) -> Result<AdapterResult, AdapterError> {
        let mut state = self.state.lock();
        state.calls.push(AdapterCall::Stat { pfn: pfn.to_string() });
        let default = AdapterResult::failure(1, 1, 1, "no such file", "");
        let result = match state.stat_results.get_mut(pfn) {
            Some(queue) => next_or_default(queue, default),
            None => default,
        };
        Ok(result)
    }

    async fn unlink(&self, pfn: &str) -> Result<AdapterResult, AdapterError> {
        let mut state = self.state.lock();
        state.calls.push(AdapterCall::Unlink { pfn: pfn.to_string() });
        let default = AdapterResult::success(1, 2, "");
        let result = match state.unlink_results.get_mut(pfn) {
            Some(queue) => next_or_default(queue, default),
            None => default,
        };
        Ok(result)
    }

    async fn bring_online(
        &self,
        pfns: &[String],
        _pin_time_secs: u64,
        _timeout_secs: u64,
        _async: bool,
    ) -> Result<BringOnlineResult, AdapterError> {
        let mut state = self.state.lock();
        state.calls.push(AdapterCall::BringOnline { pfns: pfns.to_vec() });

        let per_file_errors = pfns
            .iter()
            .map(|pfn| (pfn.clone(), state.bring_online_errors.get(pfn).cloned()))
            .collect();
        let token = state.bring_online_token.clone();
        Ok(BringOnlineResult { per_file_errors, token })
    }

    async fn bring_online_poll(&self, pfn: &str, token: &str) -> Result<PollOutcome, AdapterError> {
        let mut state = self.state.lock();
        state.calls.push(AdapterCall::BringOnlinePoll {
            pfn: pfn.to_string(),
            token: token.to_string(),
        });

        if let Some(error) = state.poll_errors.get(pfn) {
            return Ok(PollOutcome::Error(error.clone()));
        }
        if state.poll_ready.contains(pfn) {
            Ok(PollOutcome::Ready)
        } else {
            Ok(PollOutcome::Pending)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn filecopy_returns_queued_result_and_records_the_call() {
        let adapter = FakeAdapter::new();
        adapter.push_filecopy_result("/dst/a", AdapterResult::failure(1, 0, 0, "retryable", ""));

        let result = adapter.filecopy("/src/a", "/dst/a", &FileCopyParams::default()).await.unwrap();
        assert_eq!(result.exit_code, 1);
        assert_eq!(adapter.calls().len(), 1);
    }

    #[tokio::test]
    async fn stat_defaults_to_enoent_when_unscripted() {
        let adapter = FakeAdapter::new();
        let result = adapter.stat("/missing").await.unwrap();
        assert_ne!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn bring_online_poll_honors_set_staged() {
        let adapter = FakeAdapter::new();
        adapter.set_bring_online_token("tok-1");
        let pending = adapter.bring_online_poll("/a", "tok-1").await.unwrap();
        assert_eq!(pending, PollOutcome::Pending);

        adapter.set_staged("/a");
        let ready = adapter.bring_online_poll("/a", "tok-1").await.unwrap();
        assert_eq!(ready, PollOutcome::Ready);
    }

    #[tokio::test]
    async fn multi_value_queues_drain_in_order_then_stick_on_the_last() {
        let adapter = FakeAdapter::new();
        adapter.push_stat_result("/a", AdapterResult::failure(1, 0, 0, "first", ""));
        adapter.push_stat_result("/a", AdapterResult::success(1, 2, ""));

        let first = adapter.stat("/a").await.unwrap();
        assert_eq!(first.message, "first");
        let second = adapter.stat("/a").await.unwrap();
        assert!(second.is_success());
        let third = adapter.stat("/a").await.unwrap();
        assert!(third.is_success());
    }
}
