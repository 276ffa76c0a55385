// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced by adapter implementations.
//!
//! These are process-level failures (the grid I/O binary could not be
//! spawned at all, its output couldn't be parsed) — distinct from
//! [`crate::types::AdapterResult`], which represents an I/O operation that
//! ran and returned a structured failure. The error classifier only ever
//! sees `AdapterResult`; an `AdapterError` means the operation never
//! produced one and the caller treats it like a worker crash.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout_secs}s")]
    Timeout { program: String, timeout_secs: u64 },

    #[error("could not parse {program} output: {message}")]
    UnparsableOutput { program: String, message: String },
}
