// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix signal handling: SIGHUP asks for a graceful drain (let in-flight
//! workers finish), SIGTERM/SIGINT ask for an immediate one (abort them).

use tokio::signal::unix::{signal, SignalKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownKind {
    Graceful,
    Immediate,
}

/// Wait for whichever of SIGTERM/SIGINT/SIGHUP arrives first.
pub async fn wait_for_shutdown_signal() -> std::io::Result<ShutdownKind> {
    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;
    let mut hup = signal(SignalKind::hangup())?;

    Ok(tokio::select! {
        _ = term.recv() => ShutdownKind::Immediate,
        _ = int.recv() => ShutdownKind::Immediate,
        _ = hup.recv() => ShutdownKind::Graceful,
    })
}
