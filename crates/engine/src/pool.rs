// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pool Manager: one [`Pool`] per `(kind, link-or-site)`, bounding
//! concurrency with a [`tokio::sync::Semaphore`] and collecting finished
//! workers in a background task.
//!
//! This realizes the spec's OS-process pool as an in-process `tokio` task
//! pool: the real adapter already shells out per call, so bounding
//! `max_concurrent` with a semaphore reproduces the same resource limit
//! without needing one OS process per worker.

use crate::queued_set::QueuedSet;
use crate::worker::{DeleteJob, Outcome, StageJob, StageOutcome, TransferJob, WorkerContext};
use fod_core::{DeletionTaskId, TransferTaskId};
use fod_storage::Store;
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Terminal exit-code -> status mapping shared by every pool's collector.
pub fn status_for_exit_code(exit_code: i32) -> fod_core::TransferStatus {
    use fod_core::TransferStatus::*;
    match exit_code {
        c if c == fod_core::CANCELLED_EXIT_CODE => Cancelled,
        0 => Done,
        _ => Failed,
    }
}

pub fn deletion_status_for_exit_code(exit_code: i32) -> fod_core::DeletionStatus {
    use fod_core::DeletionStatus::*;
    match exit_code {
        c if c == fod_core::CANCELLED_EXIT_CODE => Cancelled,
        0 => Done,
        _ => Failed,
    }
}

struct Slots {
    semaphore: Arc<Semaphore>,
    in_flight: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
    notify: Arc<Notify>,
}

/// A bounded pool of transfer workers for one `(source, destination)` link.
pub struct TransferPool {
    link: fod_core::LinkKey,
    slots: Arc<Slots>,
    closed: std::sync::atomic::AtomicBool,
    collector: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl TransferPool {
    pub fn new(link: fod_core::LinkKey, max_concurrent: usize) -> Self {
        Self {
            link,
            slots: Arc::new(Slots {
                semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
                in_flight: tokio::sync::Mutex::new(Vec::new()),
                notify: Arc::new(Notify::new()),
            }),
            closed: std::sync::atomic::AtomicBool::new(false),
            collector: tokio::sync::Mutex::new(None),
        }
    }

    /// Submit a runnable transfer: write `queued`, register in the shared
    /// queued-set, and spawn the worker.
    pub async fn add_task(
        &self,
        job: TransferJob,
        store: Arc<Store>,
        queued_set: Arc<QueuedSet<TransferTaskId>>,
        worker_ctx: Arc<WorkerContext>,
    ) {
        let id = job.id;
        if let Err(e) = store.apply(fod_core::Event::TransferStatusSet {
            id,
            status: fod_core::TransferStatus::Queued,
            exit_code: None,
            message: None,
            start_time: None,
            finish_time: None,
        }) {
            warn!(error = %e, %id, "failed to write queued status, task left unsubmitted");
            return;
        }
        queued_set.insert(id);

        let permit_slots = Arc::clone(&self.slots);
        let handle = tokio::spawn(async move {
            let _permit = match permit_slots.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let outcome = job.execute(&worker_ctx, &queued_set, &store).await;
            let (status, exit_code, message, log, start_time, finish_time) = match outcome {
                Outcome::Cancelled => (fod_core::TransferStatus::Cancelled, fod_core::CANCELLED_EXIT_CODE, String::new(), String::new(), None, None),
                Outcome::Finished(result) => (
                    status_for_exit_code(result.exit_code),
                    result.exit_code,
                    result.message,
                    result.log,
                    result.start_ts,
                    result.finish_ts,
                ),
            };

            if let Err(e) = store.apply(fod_core::Event::TransferStatusSet {
                id,
                status,
                exit_code: Some(exit_code),
                message: if message.is_empty() { None } else { Some(message) },
                start_time,
                finish_time,
            }) {
                warn!(error = %e, %id, "failed to write terminal status");
            }
            info!(%id, %status, log_len = log.len(), "transfer worker finished");

            permit_slots.notify.notify_one();
        });

        self.slots.in_flight.lock().await.push(handle);
        self.ensure_collector().await;
    }

    async fn ensure_collector(&self) {
        let mut collector = self.collector.lock().await;
        if collector.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let slots = Arc::clone(&self.slots);
        *collector = Some(tokio::spawn(async move {
            loop {
                {
                    let mut in_flight = slots.in_flight.lock().await;
                    in_flight.retain(|h| !h.is_finished());
                    if in_flight.is_empty() {
                        return;
                    }
                }
                tokio::select! {
                    _ = slots.notify.notified() => {}
                    _ = tokio::time::sleep(std::time::Duration::from_secs(5)) => {}
                }
            }
        }));
    }

    /// Ready to be discarded: closed, or drained and the collector has exited.
    pub async fn ready_for_recycle(&self) -> bool {
        if self.closed.load(std::sync::atomic::Ordering::Acquire) {
            return true;
        }
        let in_flight_empty = self.slots.in_flight.lock().await.is_empty();
        let collector_done = self.collector.lock().await.as_ref().is_none_or(|h| h.is_finished());
        in_flight_empty && collector_done
    }

    /// Recycle this pool: abort in-flight workers if `hard` (signal-driven
    /// shutdown), otherwise let them drain; join the collector.
    pub async fn recycle(&self, hard: bool) {
        self.closed.store(true, std::sync::atomic::Ordering::Release);
        if hard {
            for handle in self.slots.in_flight.lock().await.drain(..) {
                handle.abort();
            }
        }
        if let Some(collector) = self.collector.lock().await.take() {
            let _ = collector.await;
        }
    }

    pub fn link(&self) -> &fod_core::LinkKey {
        &self.link
    }
}

/// A bounded pool of deletion workers for one site.
pub struct DeletionPool {
    site: fod_core::StorageEndpoint,
    slots: Arc<Slots>,
    closed: std::sync::atomic::AtomicBool,
    collector: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl DeletionPool {
    pub fn new(site: fod_core::StorageEndpoint, max_concurrent: usize) -> Self {
        Self {
            site,
            slots: Arc::new(Slots {
                semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
                in_flight: tokio::sync::Mutex::new(Vec::new()),
                notify: Arc::new(Notify::new()),
            }),
            closed: std::sync::atomic::AtomicBool::new(false),
            collector: tokio::sync::Mutex::new(None),
        }
    }

    pub async fn add_task(
        &self,
        job: DeleteJob,
        store: Arc<Store>,
        queued_set: Arc<QueuedSet<DeletionTaskId>>,
        worker_ctx: Arc<WorkerContext>,
    ) {
        let id = job.id;
        if let Err(e) = store.apply(fod_core::Event::DeletionStatusSet {
            id,
            status: fod_core::DeletionStatus::Queued,
            exit_code: None,
            message: None,
            start_time: None,
            finish_time: None,
        }) {
            warn!(error = %e, %id, "failed to write queued status, task left unsubmitted");
            return;
        }
        queued_set.insert(id);

        let permit_slots = Arc::clone(&self.slots);
        let handle = tokio::spawn(async move {
            let _permit = match permit_slots.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let outcome = job.execute(&worker_ctx, &queued_set, &store).await;
            let (status, exit_code, message, start_time, finish_time) = match outcome {
                Outcome::Cancelled => (fod_core::DeletionStatus::Cancelled, fod_core::CANCELLED_EXIT_CODE, String::new(), None, None),
                Outcome::Finished(result) => (
                    deletion_status_for_exit_code(result.exit_code),
                    result.exit_code,
                    result.message,
                    result.start_ts,
                    result.finish_ts,
                ),
            };

            if let Err(e) = store.apply(fod_core::Event::DeletionStatusSet {
                id,
                status,
                exit_code: Some(exit_code),
                message: if message.is_empty() { None } else { Some(message) },
                start_time,
                finish_time,
            }) {
                warn!(error = %e, %id, "failed to write terminal status");
            }
            info!(%id, %status, "deletion worker finished");

            permit_slots.notify.notify_one();
        });

        self.slots.in_flight.lock().await.push(handle);
        self.ensure_collector().await;
    }

    async fn ensure_collector(&self) {
        let mut collector = self.collector.lock().await;
        if collector.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let slots = Arc::clone(&self.slots);
        *collector = Some(tokio::spawn(async move {
            loop {
                {
                    let mut in_flight = slots.in_flight.lock().await;
                    in_flight.retain(|h| !h.is_finished());
                    if in_flight.is_empty() {
                        return;
                    }
                }
                tokio::select! {
                    _ = slots.notify.notified() => {}
                    _ = tokio::time::sleep(std::time::Duration::from_secs(5)) => {}
                }
            }
        }));
    }

    pub async fn ready_for_recycle(&self) -> bool {
        if self.closed.load(std::sync::atomic::Ordering::Acquire) {
            return true;
        }
        let in_flight_empty = self.slots.in_flight.lock().await.is_empty();
        let collector_done = self.collector.lock().await.as_ref().is_none_or(|h| h.is_finished());
        in_flight_empty && collector_done
    }

    pub async fn recycle(&self, hard: bool) {
        self.closed.store(true, std::sync::atomic::Ordering::Release);
        if hard {
            for handle in self.slots.in_flight.lock().await.drain(..) {
                handle.abort();
            }
        }
        if let Some(collector) = self.collector.lock().await.take() {
            let _ = collector.await;
        }
    }

    pub fn site(&self) -> &fod_core::StorageEndpoint {
        &self.site
    }
}

/// A bounded pool of staging-poll workers for one source site. Staging
/// tasks never enter the transfer queued-set: `process_result` only
/// writes `staged` on `Ready`, and `Pending` is a silent no-op, so there
/// is nothing to submit into a shared cancellation set.
pub struct StagePool {
    site: fod_core::StorageEndpoint,
    slots: Arc<Slots>,
    closed: std::sync::atomic::AtomicBool,
    collector: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl StagePool {
    pub fn new(site: fod_core::StorageEndpoint, max_concurrent: usize) -> Self {
        Self {
            site,
            slots: Arc::new(Slots {
                semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
                in_flight: tokio::sync::Mutex::new(Vec::new()),
                notify: Arc::new(Notify::new()),
            }),
            closed: std::sync::atomic::AtomicBool::new(false),
            collector: tokio::sync::Mutex::new(None),
        }
    }

    pub async fn add_task(
        &self,
        transfer_id: TransferTaskId,
        job: StageJob,
        store: Arc<Store>,
        worker_ctx: Arc<WorkerContext>,
        in_flight: Arc<QueuedSet<TransferTaskId>>,
    ) {
        let permit_slots = Arc::clone(&self.slots);
        let handle = tokio::spawn(async move {
            let _permit = match permit_slots.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    in_flight.remove(transfer_id);
                    return;
                }
            };

            match job.execute(&worker_ctx).await {
                StageOutcome::Ready(_) => {
                    if let Err(e) = store.apply(fod_core::Event::TransferStatusSet {
                        id: transfer_id,
                        status: fod_core::TransferStatus::Staged,
                        exit_code: None,
                        message: None,
                        start_time: None,
                        finish_time: None,
                    }) {
                        warn!(error = %e, id = %transfer_id, "failed to write staged status");
                    }
                    info!(id = %transfer_id, "staging complete");
                }
                StageOutcome::Pending => {
                    // next scheduler pass polls again; nothing to write.
                }
                StageOutcome::Failed(result) => {
                    if let Err(e) = store.apply(fod_core::Event::TransferStatusSet {
                        id: transfer_id,
                        status: fod_core::TransferStatus::Failed,
                        exit_code: Some(result.exit_code),
                        message: Some(result.message),
                        start_time: None,
                        finish_time: None,
                    }) {
                        warn!(error = %e, id = %transfer_id, "failed to write failed staging status");
                    }
                }
            }

            in_flight.remove(transfer_id);
            permit_slots.notify.notify_one();
        });

        self.slots.in_flight.lock().await.push(handle);
        self.ensure_collector().await;
    }

    async fn ensure_collector(&self) {
        let mut collector = self.collector.lock().await;
        if collector.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let slots = Arc::clone(&self.slots);
        *collector = Some(tokio::spawn(async move {
            loop {
                {
                    let mut in_flight = slots.in_flight.lock().await;
                    in_flight.retain(|h| !h.is_finished());
                    if in_flight.is_empty() {
                        return;
                    }
                }
                tokio::select! {
                    _ = slots.notify.notified() => {}
                    _ = tokio::time::sleep(std::time::Duration::from_secs(5)) => {}
                }
            }
        }));
    }

    pub async fn ready_for_recycle(&self) -> bool {
        if self.closed.load(std::sync::atomic::Ordering::Acquire) {
            return true;
        }
        let in_flight_empty = self.slots.in_flight.lock().await.is_empty();
        let collector_done = self.collector.lock().await.as_ref().is_none_or(|h| h.is_finished());
        in_flight_empty && collector_done
    }

    pub async fn recycle(&self, hard: bool) {
        self.closed.store(true, std::sync::atomic::Ordering::Release);
        if hard {
            for handle in self.slots.in_flight.lock().await.drain(..) {
                handle.abort();
            }
        }
        if let Some(collector) = self.collector.lock().await.take() {
            let _ = collector.await;
        }
    }

    pub fn site(&self) -> &fod_core::StorageEndpoint {
        &self.site
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queued_set::QueuedSet;
    use fod_adapters::{AdapterResult, ClassifierConfig, FakeAdapter};
    use fod_core::{BatchId, TransferTaskId};
    use tempfile::tempdir;

    fn worker_ctx(adapter: FakeAdapter) -> Arc<WorkerContext> {
        Arc::new(WorkerContext {
            adapter: Arc::new(adapter),
            classifier: Arc::new(ClassifierConfig::default()),
        })
    }

    #[tokio::test]
    async fn submitted_transfer_reaches_done_and_pool_recycles() {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        store
            .apply(fod_core::Event::BatchRegistered {
                batch_id: BatchId::new(1),
                source_site: "A".into(),
                destination_site: "B".into(),
                mss_source: false,
            })
            .unwrap();
        store
            .apply(fod_core::Event::TransferSubmitted {
                id: TransferTaskId::new(1),
                batch_id: BatchId::new(1),
                source: "A".into(),
                destination: "B".into(),
                checksum_algo: None,
                checksum: None,
            })
            .unwrap();

        let adapter = FakeAdapter::new();
        adapter.push_filecopy_result("B", AdapterResult::success(1, 2, ""));

        let pool = TransferPool::new(fod_core::LinkKey::new("A", "B"), 2);
        let queued_set: Arc<QueuedSet<TransferTaskId>> = Arc::new(QueuedSet::new());
        let job = TransferJob {
            id: TransferTaskId::new(1),
            source: "A".into(),
            destination: "B".into(),
            params: fod_adapters::FileCopyParams { overwrite: true, ..Default::default() },
        };
        pool.add_task(job, Arc::clone(&store), Arc::clone(&queued_set), worker_ctx(adapter)).await;

        for _ in 0..50 {
            if pool.ready_for_recycle().await {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(pool.ready_for_recycle().await);

        store.with_state(|s| {
            let record = &s.transfer_tasks[&TransferTaskId::new(1)];
            assert_eq!(record.status, fod_core::TransferStatus::Done);
            assert_eq!(record.start_time, Some(1));
            assert_eq!(record.finish_time, Some(2));
        });
    }
}
