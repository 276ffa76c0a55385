// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task workers: the three executable shapes a queued row can take, and
//! the shared cancellation preamble every transfer/deletion worker runs
//! before touching the adapter.
//!
//! A worker never returns an `Err` — every adapter error is already a
//! normal [`Outcome`]; the bounded retry loop and the classifier absorb
//! everything else. A panic inside the spawned task is caught at the
//! `JoinHandle` boundary by the pool, not here.

use crate::queued_set::QueuedSet;
use fod_adapters::{classify, AdapterResult, ClassifierConfig, Disposition, FileCopyParams, OperationKind, PollOutcome, StorageAdapter};
use fod_core::{DeletionTaskId, StorageEndpoint, TransferTaskId};
use fod_storage::Store;
use std::sync::Arc;
use tracing::{info, warn};

/// Bound on in-worker attempts for a single adapter call, per S6.
const MAX_ATTEMPTS: u32 = 5;

/// Shared dependencies every worker needs, handed in by the pool that
/// spawns it.
#[derive(Clone)]
pub struct WorkerContext {
    pub adapter: Arc<dyn StorageAdapter>,
    pub classifier: Arc<ClassifierConfig>,
}

/// What a transfer/deletion worker produced.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Lost the queued-set race; never touched the adapter.
    Cancelled,
    /// Ran to a terminal result; `result.exit_code` is already
    /// post-classification (success-equivalent failures read as `0`).
    Finished(AdapterResult),
}

/// What a staging poll produced. Staging does not use the queued-set
/// preamble, so there is no `Cancelled` variant here.
#[derive(Debug, Clone)]
pub enum StageOutcome {
    /// Recall complete; write `status='staged'`.
    Ready(AdapterResult),
    /// Still recalling; a silent no-op for this pass.
    Pending,
    /// The poll itself failed in a way the classifier calls irrecoverable.
    Failed(AdapterResult),
}

#[derive(Debug, Clone)]
pub struct TransferJob {
    pub id: TransferTaskId,
    pub source: StorageEndpoint,
    pub destination: StorageEndpoint,
    pub params: FileCopyParams,
}

#[derive(Debug, Clone)]
pub struct DeleteJob {
    pub id: DeletionTaskId,
    pub pfn: String,
}

#[derive(Debug, Clone)]
pub struct StageJob {
    pub pfn: String,
    pub token: String,
}

/// Run the bounded retry loop for a single adapter call, classifying each
/// failure against `operation`. Returns the attempt that ended the loop,
/// with its log prefixed by every earlier attempt's log.
async fn retrying<F, Fut>(ctx: &WorkerContext, operation: OperationKind, mut call: F) -> AdapterResult
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<AdapterResult, fod_adapters::AdapterError>>,
{
    let mut accumulated_log = String::new();
    let mut last = AdapterResult::failure(-1, 0, 0, "worker never attempted the call", "");

    for attempt in 1..=MAX_ATTEMPTS {
        let result = match call().await {
            Ok(result) => result,
            Err(e) => AdapterResult::failure(-1, 0, 0, e.to_string(), ""),
        };

        if !accumulated_log.is_empty() {
            accumulated_log.push('\n');
        }
        accumulated_log.push_str(&result.log);

        if result.is_success() {
            return AdapterResult { log: accumulated_log, ..result };
        }

        let disposition = classify(operation, &result, &ctx.classifier);
        match disposition {
            Disposition::SuccessEquivalent => {
                info!(attempt, message = %result.message, "adapter call failed but classified success-equivalent");
                return AdapterResult {
                    exit_code: 0,
                    log: String::new(),
                    ..result
                };
            }
            Disposition::Irrecoverable => {
                warn!(attempt, message = %result.message, "adapter call failed irrecoverably");
                return AdapterResult { log: accumulated_log, ..result };
            }
            Disposition::Retryable => {
                warn!(attempt, max = MAX_ATTEMPTS, message = %result.message, "adapter call failed, retrying");
                last = result;
            }
        }
    }

    AdapterResult { log: accumulated_log, ..last }
}

impl TransferJob {
    pub async fn execute(&self, ctx: &WorkerContext, queued: &QueuedSet<TransferTaskId>, store: &Store) -> Outcome {
        if !queued.try_remove(self.id) {
            return Outcome::Cancelled;
        }
        if let Err(e) = store.apply(fod_core::Event::TransferStatusSet {
            id: self.id,
            status: fod_core::TransferStatus::Active,
            exit_code: None,
            message: None,
            start_time: None,
            finish_time: None,
        }) {
            warn!(error = %e, id = %self.id, "failed to write active status");
        }

        if !self.params.overwrite {
            if let Ok(stat) = ctx.adapter.stat(&self.destination.0).await {
                if stat.is_success() {
                    info!(id = %self.id, "destination already present, skipping filecopy");
                    return Outcome::Finished(stat);
                }
            }
        }

        let src = self.source.0.clone();
        let dst = self.destination.0.clone();
        let params = self.params.clone();
        let result = retrying(ctx, OperationKind::Transfer, || {
            let adapter = Arc::clone(&ctx.adapter);
            let src = src.clone();
            let dst = dst.clone();
            let params = params.clone();
            async move { adapter.filecopy(&src, &dst, &params).await }
        })
        .await;

        Outcome::Finished(result)
    }
}

impl DeleteJob {
    pub async fn execute(&self, ctx: &WorkerContext, queued: &QueuedSet<DeletionTaskId>, store: &Store) -> Outcome {
        if !queued.try_remove(self.id) {
            return Outcome::Cancelled;
        }
        if let Err(e) = store.apply(fod_core::Event::DeletionStatusSet {
            id: self.id,
            status: fod_core::DeletionStatus::Active,
            exit_code: None,
            message: None,
            start_time: None,
            finish_time: None,
        }) {
            warn!(error = %e, id = %self.id, "failed to write active status");
        }

        let pfn = self.pfn.clone();
        let result = retrying(ctx, OperationKind::Delete, || {
            let adapter = Arc::clone(&ctx.adapter);
            let pfn = pfn.clone();
            async move { adapter.unlink(&pfn).await }
        })
        .await;

        Outcome::Finished(result)
    }
}

impl StageJob {
    /// A single poll, not a retry loop: the scheduler calls this again
    /// next pass regardless of outcome, so there is no in-worker bound.
    pub async fn execute(&self, ctx: &WorkerContext) -> StageOutcome {
        match ctx.adapter.bring_online_poll(&self.pfn, &self.token).await {
            Ok(PollOutcome::Ready) => StageOutcome::Ready(AdapterResult::success(0, 0, "")),
            Ok(PollOutcome::Pending) => StageOutcome::Pending,
            Ok(PollOutcome::Error(result)) => match classify(OperationKind::Stage, &result, &ctx.classifier) {
                Disposition::Irrecoverable => StageOutcome::Failed(result),
                _ => StageOutcome::Pending,
            },
            Err(e) => {
                warn!(error = %e, "staging poll could not be run, treating as pending");
                StageOutcome::Pending
            }
        }
    }
}
