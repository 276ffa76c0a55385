// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios driving a real [`Scheduler`] against a
//! [`FakeAdapter`] and a tempfile-backed [`Store`].

use fod_adapters::{AdapterResult, ClassifierConfig, FakeAdapter};
use fod_core::{BatchId, DeletionStatus, DeletionTaskId, Event, TransferStatus, TransferTaskId};
use fod_engine::{Scheduler, SchedulerConfig, WorkerContext};
use fod_storage::Store;
use std::sync::Arc;
use tempfile::tempdir;

fn scheduler(store: Arc<Store>, adapter: FakeAdapter, config: SchedulerConfig) -> Scheduler {
    let ctx = Arc::new(WorkerContext {
        adapter: Arc::new(adapter),
        classifier: Arc::new(ClassifierConfig::default()),
    });
    Scheduler::new(store, Arc::clone(&ctx), Arc::clone(&ctx), ctx, config)
}

/// Run passes until every pool drains, for scenarios with no staging
/// step where a single submit-then-settle cycle is enough.
async fn settle(scheduler: &Scheduler) {
    scheduler.run_pass().await;
    scheduler.drain(false).await;
}

#[tokio::test]
async fn s1_enoent_on_one_of_three_deletions_is_success_equivalent() {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    for (id, pfn) in [(1, "/a"), (2, "/b"), (3, "/c")] {
        store
            .apply(Event::DeletionSubmitted {
                id: DeletionTaskId::new(id),
                file: pfn.to_string(),
                site: "T1_A".into(),
            })
            .unwrap();
    }

    let adapter = FakeAdapter::new();
    adapter.push_unlink_result("/b", AdapterResult::failure(2, 0, 0, "Target file does not exist.", ""));

    let scheduler = scheduler(Arc::clone(&store), adapter, SchedulerConfig::default());
    settle(&scheduler).await;

    store.with_state(|s| {
        for id in [1, 2, 3] {
            assert_eq!(s.deletion_tasks[&DeletionTaskId::new(id)].status, DeletionStatus::Done);
        }
        assert_eq!(s.deletion_tasks[&DeletionTaskId::new(2)].message.as_deref(), Some("Target file does not exist."));
    });
}

#[tokio::test]
async fn s2_overwrite_false_and_existing_destination_skips_filecopy() {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    store
        .apply(Event::BatchRegistered {
            batch_id: BatchId::new(1),
            source_site: "A".into(),
            destination_site: "B".into(),
            mss_source: false,
        })
        .unwrap();
    store
        .apply(Event::TransferSubmitted {
            id: TransferTaskId::new(1),
            batch_id: BatchId::new(1),
            source: "A/src".into(),
            destination: "B/dst".into(),
            checksum_algo: None,
            checksum: None,
        })
        .unwrap();

    let adapter = FakeAdapter::new();
    adapter.push_stat_result("B/dst", AdapterResult::success(1, 2, ""));

    let mut config = SchedulerConfig::default();
    config.overwrite = false;
    let scheduler = scheduler(Arc::clone(&store), adapter.clone(), config);
    settle(&scheduler).await;

    assert!(!adapter.calls().iter().any(|c| matches!(c, fod_adapters::AdapterCall::FileCopy { .. })));
    store.with_state(|s| {
        assert_eq!(s.transfer_tasks[&TransferTaskId::new(1)].status, TransferStatus::Done);
    });
}

#[tokio::test]
async fn s3_tape_batch_stages_then_only_polled_ready_task_advances() {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    store
        .apply(Event::BatchRegistered {
            batch_id: BatchId::new(1),
            source_site: "TAPE".into(),
            destination_site: "DISK".into(),
            mss_source: true,
        })
        .unwrap();
    for (id, pfn) in [(1, "TAPE/a"), (2, "TAPE/b")] {
        store
            .apply(Event::TransferSubmitted {
                id: TransferTaskId::new(id),
                batch_id: BatchId::new(1),
                source: pfn.into(),
                destination: "DISK/out".into(),
                checksum_algo: None,
                checksum: None,
            })
            .unwrap();
    }

    let adapter = FakeAdapter::new();
    adapter.set_bring_online_token("tok-1");
    adapter.set_staged("TAPE/a");

    let scheduler = scheduler(Arc::clone(&store), adapter, SchedulerConfig::default());

    // First pass: issues bring_online, writes the token, marks both staging.
    scheduler.run_pass().await;
    store.with_state(|s| {
        assert!(s.batches[&BatchId::new(1)].stage_token.is_some());
        assert_eq!(s.transfer_tasks[&TransferTaskId::new(1)].status, TransferStatus::Staging);
        assert_eq!(s.transfer_tasks[&TransferTaskId::new(2)].status, TransferStatus::Staging);
    });

    // Second pass: polls both; only task 1 is scripted ready.
    scheduler.run_pass().await;
    for _ in 0..20 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let done = store.with_state(|s| s.transfer_tasks[&TransferTaskId::new(1)].status == TransferStatus::Staged);
        if done {
            break;
        }
    }
    store.with_state(|s| {
        assert_eq!(s.transfer_tasks[&TransferTaskId::new(1)].status, TransferStatus::Staged);
        assert_eq!(s.transfer_tasks[&TransferTaskId::new(2)].status, TransferStatus::Staging);
    });
}

#[tokio::test]
async fn s4_cancelled_before_worker_start_is_not_overwritten() {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    store
        .apply(Event::BatchRegistered {
            batch_id: BatchId::new(1),
            source_site: "A".into(),
            destination_site: "B".into(),
            mss_source: false,
        })
        .unwrap();
    store
        .apply(Event::TransferSubmitted {
            id: TransferTaskId::new(1),
            batch_id: BatchId::new(1),
            source: "A/src".into(),
            destination: "B/dst".into(),
            checksum_algo: None,
            checksum: None,
        })
        .unwrap();

    let adapter = FakeAdapter::new();
    let mut config = SchedulerConfig::default();
    config.overwrite = true;
    let scheduler = scheduler(Arc::clone(&store), adapter, config);

    // Pass 1 submits: writes `queued` and registers the id in the
    // queued-set. The worker task is spawned but, on this single-threaded
    // test runtime, gets no chance to run before we intervene below.
    scheduler.run_pass().await;
    store
        .apply(Event::TransferStatusSet {
            id: TransferTaskId::new(1),
            status: TransferStatus::Cancelled,
            exit_code: None,
            message: None,
            start_time: None,
            finish_time: None,
        })
        .unwrap();

    // Pass 2's queued-set refresh reads the DB afresh: the id is no
    // longer `queued`, so it drops out before the worker's preamble runs.
    scheduler.run_pass().await;

    for _ in 0..20 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    store.with_state(|s| {
        assert_eq!(s.transfer_tasks[&TransferTaskId::new(1)].status, TransferStatus::Cancelled);
    });
}

#[tokio::test]
async fn s5_crash_recovery_sweep_resets_in_flight_rows_before_first_pass() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    store
        .apply(Event::TransferSubmitted {
            id: TransferTaskId::new(7),
            batch_id: BatchId::new(1),
            source: "A".into(),
            destination: "B".into(),
            checksum_algo: None,
            checksum: None,
        })
        .unwrap();
    store
        .apply(Event::TransferStatusSet {
            id: TransferTaskId::new(7),
            status: TransferStatus::Queued,
            exit_code: None,
            message: None,
            start_time: None,
            finish_time: None,
        })
        .unwrap();
    store
        .apply(Event::TransferStatusSet {
            id: TransferTaskId::new(7),
            status: TransferStatus::Active,
            exit_code: None,
            message: None,
            start_time: None,
            finish_time: None,
        })
        .unwrap();
    store
        .apply(Event::TransferSubmitted {
            id: TransferTaskId::new(8),
            batch_id: BatchId::new(1),
            source: "A".into(),
            destination: "B".into(),
            checksum_algo: None,
            checksum: None,
        })
        .unwrap();
    store
        .apply(Event::TransferStatusSet {
            id: TransferTaskId::new(8),
            status: TransferStatus::Queued,
            exit_code: None,
            message: None,
            start_time: None,
            finish_time: None,
        })
        .unwrap();

    let (transfers, _) = store.with_state(|s| s.in_flight_rows());
    let events = transfers.into_iter().map(|id| Event::TransferStatusSet {
        id,
        status: TransferStatus::New,
        exit_code: None,
        message: None,
        start_time: None,
        finish_time: None,
    });
    store.apply_all(events).unwrap();

    store.with_state(|s| {
        assert_eq!(s.transfer_tasks[&TransferTaskId::new(7)].status, TransferStatus::New);
        assert_eq!(s.transfer_tasks[&TransferTaskId::new(8)].status, TransferStatus::New);
    });
}

#[tokio::test]
async fn s6_retryable_failures_exhaust_to_failed_with_five_attempts_logged() {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    store
        .apply(Event::BatchRegistered {
            batch_id: BatchId::new(1),
            source_site: "A".into(),
            destination_site: "B".into(),
            mss_source: false,
        })
        .unwrap();
    store
        .apply(Event::TransferSubmitted {
            id: TransferTaskId::new(1),
            batch_id: BatchId::new(1),
            source: "A/src".into(),
            destination: "B/dst".into(),
            checksum_algo: None,
            checksum: None,
        })
        .unwrap();

    let adapter = FakeAdapter::new();
    for _ in 0..5 {
        adapter.push_filecopy_result("B/dst", AdapterResult::failure(2, 0, 0, "connection reset", "attempt-log"));
    }

    let mut config = SchedulerConfig::default();
    config.overwrite = true;
    let scheduler = scheduler(Arc::clone(&store), adapter.clone(), config);
    settle(&scheduler).await;

    store.with_state(|s| {
        let task = &s.transfer_tasks[&TransferTaskId::new(1)];
        assert_eq!(task.status, TransferStatus::Failed);
        assert_eq!(task.exit_code, Some(2));
    });
    assert_eq!(adapter.calls().iter().filter(|c| matches!(c, fod_adapters::AdapterCall::FileCopy { .. })).count(), 5);
}
