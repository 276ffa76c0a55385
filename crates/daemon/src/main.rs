// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File Operations Daemon (fodd)
//!
//! Background worker draining the transfer and deletion task queues
//! produced by an external submission layer and executing them against
//! remote storage, with authoritative state kept in the store under
//! `state_dir` rather than any in-process memory.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod lifecycle;
mod privdrop;
mod signals;

use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::lifecycle::LifecycleError;
use crate::signals::{wait_for_shutdown_signal, ShutdownKind};

const MAX_LOG_SIZE: u64 = 50 * 1024 * 1024;
const MAX_ROTATED_LOGS: usize = 3;
const DEFAULT_PID_FILE: &str = "/var/run/fodd.pid";
const PASS_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("fodd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: fodd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    if let Some(log_path) = &config.logging.path {
        rotate_log_if_needed(log_path);
    }
    let _log_guard = setup_logging(&config)?;

    info!("starting file operations daemon");

    privdrop::raise_nofile_limit(65536).map_err(|e| format!("failed to raise RLIMIT_NOFILE: {e}"))?;

    let pid_path = PathBuf::from(DEFAULT_PID_FILE);
    let daemon = match lifecycle::startup(&config, &pid_path) {
        Ok(d) => d,
        Err(LifecycleError::LockFailed(path)) => {
            eprintln!("fodd is already running (pid lock held at {})", path.display());
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "failed to start daemon");
            return Err(e.into());
        }
    };

    privdrop::drop_privileges(config.user.as_deref())?;

    let scheduler = daemon.scheduler.clone();
    let stop = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let pass_loop = {
        let scheduler = scheduler.clone();
        let stop = stop.clone();
        tokio::spawn(async move { scheduler.run(stop, PASS_INTERVAL).await })
    };

    println!("READY");
    info!("daemon ready, running a pass every {:?}", PASS_INTERVAL);

    let shutdown_kind = wait_for_shutdown_signal().await.unwrap_or(ShutdownKind::Immediate);
    info!(?shutdown_kind, "shutdown requested");

    stop.store(true, std::sync::atomic::Ordering::Release);
    let _ = pass_loop.await;

    lifecycle::shutdown(daemon, shutdown_kind == ShutdownKind::Immediate).await;
    info!("daemon stopped");
    Ok(())
}

fn print_help() {
    println!("fodd {}", env!("CARGO_PKG_VERSION"));
    println!("File Operations Daemon - drains transfer and deletion task queues");
    println!();
    println!("USAGE:");
    println!("    fodd");
    println!();
    println!("Configuration is read from the path named by DYNAMO_SERVER_CONFIG");
    println!("(default /etc/fodd/daemon.toml).");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}

fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(config: &Config) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, std::io::Error> {
    let filter = EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(log_path) = &config.logging.path else {
        tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
        return Ok(None);
    };

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = log_path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let file_name = log_path.file_name().ok_or_else(|| std::io::Error::other("log path has no file name"))?;
    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();
    Ok(Some(guard))
}
