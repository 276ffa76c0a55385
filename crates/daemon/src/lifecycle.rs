// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup and shutdown: the PID lock, the crash-recovery sweep that
//! rewrites orphaned `queued`/`active` rows back to `new`, and the final
//! checkpoint on the way down.

use fod_adapters::{GfalAdapter, GfalConfig, StorageAdapter};
use fod_core::{DeletionStatus, Event, TransferStatus};
use fod_engine::{Scheduler, SchedulerConfig, WorkerContext};
use fod_storage::{Store, StoreError};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("another instance is already running (pid lock held at {0})")]
    LockFailed(PathBuf),
    #[error("failed to open pid file {path}: {source}")]
    PidFile { path: PathBuf, source: std::io::Error },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Holds the process-lifetime resources acquired at startup: the PID
/// lock (released on `Drop`), the store, and the wired scheduler.
pub struct Daemon {
    _pid_lock: PidLock,
    pub scheduler: Arc<Scheduler>,
}

struct PidLock {
    file: File,
    path: PathBuf,
}

impl Drop for PidLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn acquire_pid_lock(path: &Path) -> Result<PidLock, LifecycleError> {
    use std::io::Write;

    let mut file = OpenOptions::new().create(true).write(true).open(path).map_err(|source| LifecycleError::PidFile {
        path: path.to_path_buf(),
        source,
    })?;
    // Lock before truncating: an already-locked file must be left intact
    // so the running instance's PID stays readable by operators.
    file.try_lock_exclusive().map_err(|_| LifecycleError::LockFailed(path.to_path_buf()))?;
    file.set_len(0).map_err(|source| LifecycleError::PidFile {
        path: path.to_path_buf(),
        source,
    })?;
    writeln!(file, "{}", std::process::id()).map_err(|source| LifecycleError::PidFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(PidLock { file, path: path.to_path_buf() })
}

/// Rewrite every `queued`/`active` row back to `new` so the next
/// scheduler pass re-submits it, standing in for the original's
/// restart-time reconciliation against rows no live worker still owns.
fn crash_recovery_sweep(store: &Store) -> Result<(), StoreError> {
    let (transfers, deletions) = store.with_state(|s| s.in_flight_rows());
    if transfers.is_empty() && deletions.is_empty() {
        return Ok(());
    }
    info!(transfers = transfers.len(), deletions = deletions.len(), "resetting in-flight rows left over from a previous run");

    let events = transfers
        .into_iter()
        .map(|id| Event::TransferStatusSet {
            id,
            status: TransferStatus::New,
            exit_code: None,
            message: None,
            start_time: None,
            finish_time: None,
        })
        .chain(deletions.into_iter().map(|id| Event::DeletionStatusSet {
            id,
            status: DeletionStatus::New,
            exit_code: None,
            message: None,
            start_time: None,
            finish_time: None,
        }));
    store.apply_all(events)
}

fn build_adapter(proxy: Option<PathBuf>, verbosity: &str) -> Arc<dyn StorageAdapter> {
    Arc::new(GfalAdapter::new(GfalConfig {
        x509_proxy: proxy,
        verbosity: verbosity.to_string(),
    }))
}

pub fn startup(config: &Config, pid_path: &Path) -> Result<Daemon, LifecycleError> {
    let pid_lock = acquire_pid_lock(pid_path)?;

    let store = Arc::new(Store::open(&config.state_dir)?);
    crash_recovery_sweep(&store)?;

    let classifier = Arc::new(config.classifier.clone());
    let section = &config.file_operations.daemon;

    let transfer_ctx = Arc::new(WorkerContext {
        adapter: build_adapter(section.x509_proxy.clone(), &section.gfal2_verbosity),
        classifier: Arc::clone(&classifier),
    });
    let delete_ctx = Arc::new(WorkerContext {
        adapter: build_adapter(section.x509_proxy.clone(), &section.gfal2_verbosity),
        classifier: Arc::clone(&classifier),
    });
    let stage_ctx = Arc::new(WorkerContext {
        adapter: build_adapter(section.effective_staging_proxy(), &section.gfal2_verbosity),
        classifier,
    });

    let scheduler_config = SchedulerConfig {
        max_concurrent_per_link: section.max_parallel_links,
        overwrite: section.overwrite,
        transfer_timeout_secs: section.transfer_timeout,
        ..Default::default()
    };

    let scheduler = Arc::new(Scheduler::new(store, transfer_ctx, delete_ctx, stage_ctx, scheduler_config));

    Ok(Daemon {
        _pid_lock: pid_lock,
        scheduler,
    })
}

/// Drain every pool, take a final synchronous checkpoint, then let the
/// PID lock release on `Drop`.
pub async fn shutdown(daemon: Daemon, hard: bool) {
    daemon.scheduler.drain(hard).await;
    match daemon.scheduler.store().checkpoint_sync() {
        Ok(seq) => info!(seq, "final checkpoint written"),
        Err(e) => warn!(error = %e, "final checkpoint failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_lock_attempt_on_the_same_path_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fodd.pid");
        let _first = acquire_pid_lock(&path).unwrap();
        let second = acquire_pid_lock(&path);
        assert!(matches!(second, Err(LifecycleError::LockFailed(_))));
    }

    #[test]
    fn crash_recovery_sweep_resets_in_flight_rows() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        store
            .apply(Event::TransferSubmitted {
                id: fod_core::TransferTaskId::new(1),
                batch_id: fod_core::BatchId::new(1),
                source: "A".into(),
                destination: "B".into(),
                checksum_algo: None,
                checksum: None,
            })
            .unwrap();
        store
            .apply(Event::TransferStatusSet {
                id: fod_core::TransferTaskId::new(1),
                status: TransferStatus::Queued,
                exit_code: None,
                message: None,
                start_time: None,
                finish_time: None,
            })
            .unwrap();
        store
            .apply(Event::TransferStatusSet {
                id: fod_core::TransferTaskId::new(1),
                status: TransferStatus::Active,
                exit_code: None,
                message: None,
                start_time: None,
                finish_time: None,
            })
            .unwrap();

        crash_recovery_sweep(&store).unwrap();
        store.with_state(|s| {
            assert_eq!(s.transfer_tasks[&fod_core::TransferTaskId::new(1)].status, TransferStatus::New);
        });
    }
}
