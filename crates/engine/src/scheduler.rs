// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue Scheduler: the single periodic pass that drains both task
//! tables into their pools, keeps the cancellation queued-sets current,
//! and recycles idle pools.
//!
//! Step order matters and is load-bearing: deletions are submitted before
//! transfers so deletion slots are claimed first, and each queued-set is
//! refreshed *after* this pass's submissions so ids just queued become
//! visible to cancellation checks on the *next* pass, not this one.

use crate::pool::TransferPool;
use crate::queued_set::QueuedSet;
use crate::registry::{DeletionPoolRegistry, StagePoolRegistry, TransferPoolRegistry};
use crate::worker::{DeleteJob, StageJob, TransferJob, WorkerContext};
use fod_adapters::FileCopyParams;
use fod_core::{DeletionTaskId, Event, LinkKey, TransferTaskId};
use fod_storage::Store;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Tunables for one scheduler instance. `pass_interval` is nominally 30s
/// in production; tests drive `run_pass` directly without a timer.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_concurrent_per_link: usize,
    pub max_concurrent_per_site_delete: usize,
    pub max_concurrent_per_site_stage: usize,
    pub overwrite: bool,
    pub transfer_timeout_secs: u64,
    pub stage_pin_time_secs: u64,
    pub stage_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_per_link: 10,
            max_concurrent_per_site_delete: 10,
            max_concurrent_per_site_stage: 5,
            overwrite: false,
            transfer_timeout_secs: 0,
            stage_pin_time_secs: 0,
            stage_timeout_secs: 0,
        }
    }
}

/// Drives task/batch rows through the pools. One instance per daemon
/// process; `run_pass` is re-entrant-safe only in the sense that the
/// caller must never run two passes concurrently with themselves (the
/// spec's single-scheduler-task invariant).
pub struct Scheduler {
    store: Arc<Store>,
    transfer_ctx: Arc<WorkerContext>,
    delete_ctx: Arc<WorkerContext>,
    stage_ctx: Arc<WorkerContext>,
    transfer_queued: Arc<QueuedSet<TransferTaskId>>,
    deletion_queued: Arc<QueuedSet<DeletionTaskId>>,
    staging_in_flight: Arc<QueuedSet<TransferTaskId>>,
    transfer_pools: TransferPoolRegistry,
    deletion_pools: DeletionPoolRegistry,
    stage_pools: StagePoolRegistry,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(store: Arc<Store>, transfer_ctx: Arc<WorkerContext>, delete_ctx: Arc<WorkerContext>, stage_ctx: Arc<WorkerContext>, config: SchedulerConfig) -> Self {
        Self {
            transfer_pools: TransferPoolRegistry::new(config.max_concurrent_per_link),
            deletion_pools: DeletionPoolRegistry::new(config.max_concurrent_per_site_delete),
            stage_pools: StagePoolRegistry::new(config.max_concurrent_per_site_stage),
            store,
            transfer_ctx,
            delete_ctx,
            stage_ctx,
            transfer_queued: Arc::new(QueuedSet::new()),
            deletion_queued: Arc::new(QueuedSet::new()),
            staging_in_flight: Arc::new(QueuedSet::new()),
            config,
        }
    }

    /// Run the scheduler loop until `stop` is observed set, pausing
    /// `pass_interval` between passes.
    pub async fn run(&self, stop: Arc<std::sync::atomic::AtomicBool>, pass_interval: std::time::Duration) {
        let mut interval = tokio::time::interval(pass_interval);
        loop {
            interval.tick().await;
            if stop.load(std::sync::atomic::Ordering::Acquire) {
                return;
            }
            self.run_pass().await;
        }
    }

    /// One full 7-step pass.
    pub async fn run_pass(&self) {
        self.submit_new_deletions().await;
        self.refresh_deletion_queued_set();
        self.issue_staging_for_tape_batches().await;
        self.poll_staging_tasks().await;
        self.submit_runnable_transfers().await;
        self.refresh_transfer_queued_set();
        self.recycle_idle_pools(false).await;
    }

    /// Step 1: drain `new` deletions, grouped by site, into per-site pools.
    async fn submit_new_deletions(&self) {
        let rows = self.store.with_state(|s| {
            s.deletion_tasks_with_status(fod_core::DeletionStatus::New)
                .into_iter()
                .map(|t| (t.id, t.file.clone(), t.site.clone()))
                .collect::<Vec<_>>()
        });
        for (id, file, site) in rows {
            let pool = self.deletion_pools.get_or_create(&site);
            let job = DeleteJob { id, pfn: file };
            pool.add_task(job, Arc::clone(&self.store), Arc::clone(&self.deletion_queued), Arc::clone(&self.delete_ctx)).await;
        }
    }

    /// Step 2: ids just written `queued` above become visible on the
    /// *next* pass's cancellation checks, not this one.
    fn refresh_deletion_queued_set(&self) {
        let ids = self.store.with_state(|s| s.queued_deletion_ids());
        self.deletion_queued.refresh(ids);
    }

    /// Step 3: issue `bring_online` for tape batches lacking a token.
    /// The token is written even when some per-file errors occurred, so
    /// the batch is never re-issued; affected tasks are marked `failed`
    /// individually rather than blocking the whole batch.
    async fn issue_staging_for_tape_batches(&self) {
        let batches = self.store.with_state(|s| s.batches_needing_staging().into_iter().map(|b| b.batch_id).collect::<Vec<_>>());

        for batch_id in batches {
            let tasks = self.store.with_state(|s| {
                s.transfer_tasks
                    .values()
                    .filter(|t| t.batch_id == batch_id && t.status == fod_core::TransferStatus::New)
                    .map(|t| (t.id, t.source.0.clone()))
                    .collect::<Vec<_>>()
            });
            if tasks.is_empty() {
                continue;
            }
            let pfns: Vec<String> = tasks.iter().map(|(_, pfn)| pfn.clone()).collect();
            let by_pfn: HashMap<&str, TransferTaskId> = tasks.iter().map(|(id, pfn)| (pfn.as_str(), *id)).collect();

            match self
                .stage_ctx
                .adapter
                .bring_online(&pfns, self.config.stage_pin_time_secs, self.config.stage_timeout_secs, true)
                .await
            {
                Ok(result) => {
                    if let Err(e) = self.store.apply(Event::BatchStageTokenSet {
                        batch_id,
                        stage_token: result.token.clone(),
                    }) {
                        warn!(error = %e, %batch_id, "failed to persist stage token");
                    }
                    for (pfn, error) in result.per_file_errors {
                        let Some(&id) = by_pfn.get(pfn.as_str()) else { continue };
                        let event = match error {
                            Some(result) => Event::TransferStatusSet {
                                id,
                                status: fod_core::TransferStatus::Failed,
                                exit_code: Some(result.exit_code),
                                message: Some(result.message),
                                start_time: None,
                                finish_time: None,
                            },
                            None => Event::TransferStatusSet {
                                id,
                                status: fod_core::TransferStatus::Staging,
                                exit_code: None,
                                message: None,
                                start_time: None,
                                finish_time: None,
                            },
                        };
                        if let Err(e) = self.store.apply(event) {
                            warn!(error = %e, %id, "failed to write staging status");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, %batch_id, "bring_online call failed, batch left pending for the next pass");
                }
            }
        }
    }

    /// Step 4: poll every `staging` task, grouped by source site.
    async fn poll_staging_tasks(&self) {
        let rows = self.store.with_state(|s| {
            s.staging_transfer_tasks()
                .into_iter()
                .filter_map(|t| {
                    let token = s.batches.get(&t.batch_id)?.stage_token.clone()?;
                    Some((t.id, t.source.clone(), token))
                })
                .collect::<Vec<_>>()
        });

        for (id, source, token) in rows {
            if !self.staging_in_flight.try_insert(id) {
                continue;
            }
            let pool = self.stage_pools.get_or_create(&source);
            let job = StageJob { pfn: source.0, token };
            pool.add_task(id, job, Arc::clone(&self.store), Arc::clone(&self.stage_ctx), Arc::clone(&self.staging_in_flight)).await;
        }
    }

    /// Step 5: submit every runnable transfer, grouped by `(source, dest)`.
    async fn submit_runnable_transfers(&self) {
        let rows = self.store.with_state(|s| {
            s.runnable_transfer_tasks()
                .into_iter()
                .map(|t| (t.id, t.source.clone(), t.destination.clone(), t.checksum_algo.clone(), t.checksum.clone()))
                .collect::<Vec<_>>()
        });

        for (id, source, destination, checksum_algo, checksum) in rows {
            let link = LinkKey::new(source.clone(), destination.clone());
            let pool: Arc<TransferPool> = self.transfer_pools.get_or_create(&link);
            let job = TransferJob {
                id,
                source,
                destination,
                params: FileCopyParams {
                    checksum_algo,
                    checksum,
                    overwrite: self.config.overwrite,
                    timeout_secs: self.config.transfer_timeout_secs,
                },
            };
            pool.add_task(job, Arc::clone(&self.store), Arc::clone(&self.transfer_queued), Arc::clone(&self.transfer_ctx)).await;
        }
    }

    /// Step 6.
    fn refresh_transfer_queued_set(&self) {
        let ids = self.store.with_state(|s| s.queued_transfer_ids());
        self.transfer_queued.refresh(ids);
    }

    /// Step 7: recycle every pool that reports idle.
    async fn recycle_idle_pools(&self, hard: bool) {
        self.transfer_pools.recycle_idle(hard).await;
        self.deletion_pools.recycle_idle(hard).await;
        self.stage_pools.recycle_idle(hard).await;
    }

    /// Final drain at shutdown: keep recycling until every pool is empty,
    /// hard-aborting in-flight workers if the stop was signal-triggered.
    pub async fn drain(&self, hard: bool) {
        for _ in 0..600 {
            self.recycle_idle_pools(hard).await;
            if self.all_pools_idle() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        warn!("drain timed out waiting for pools to empty");
    }

    fn all_pools_idle(&self) -> bool {
        // A registry drops a pool the moment it recycles, so an empty
        // registry after `recycle_idle_pools` means nothing is left running.
        self.transfer_pools.len() == 0 && self.deletion_pools.len() == 0 && self.stage_pools.len() == 0
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}
