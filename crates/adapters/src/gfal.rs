// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real [`StorageAdapter`] backed by the `gfal2` command-line tools.
//!
//! Each call shells out to the corresponding `gfal-*` binary via
//! [`tokio::process::Command`] rather than linking `gfal2` directly: the
//! library's own C bindings are not `Send`-friendly across an async
//! worker pool, and the CLI tools are what every other component in this
//! ecosystem already wraps. Because each call is its own child process,
//! the X509 proxy is passed through the child's environment rather than
//! mutated on the daemon's own process — unlike the single-threaded
//! original, many of these run concurrently in the same address space.

use crate::adapter_trait::StorageAdapter;
use crate::error::AdapterError;
use crate::types::{AdapterResult, BringOnlineResult, FileCopyParams, PollOutcome};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::process::Command;

fn epoch_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Configuration for the real adapter: which proxy to present and how
/// chatty `gfal2`'s own logging should be.
#[derive(Debug, Clone)]
pub struct GfalConfig {
    pub x509_proxy: Option<PathBuf>,
    pub verbosity: String,
}

impl Default for GfalConfig {
    fn default() -> Self {
        Self {
            x509_proxy: None,
            verbosity: "normal".to_string(),
        }
    }
}

pub struct GfalAdapter {
    config: GfalConfig,
}

impl GfalAdapter {
    pub fn new(config: GfalConfig) -> Self {
        Self { config }
    }

    /// Build a command with the configured proxy and verbosity wired into
    /// its environment, overridable per-call (staging uses a different
    /// proxy than ordinary transfers).
    fn command(&self, program: &str, proxy_override: Option<&PathBuf>) -> Command {
        let mut cmd = Command::new(program);
        cmd.env("GFAL2_VERBOSITY", &self.config.verbosity);
        if let Some(proxy) = proxy_override.or(self.config.x509_proxy.as_ref()) {
            cmd.env("X509_USER_PROXY", proxy);
        }
        cmd
    }

    async fn run(&self, mut cmd: Command, program: &str, timeout_secs: u64) -> Result<AdapterResult, AdapterError> {
        let start_ts = epoch_secs();
        let timeout = if timeout_secs == 0 {
            Duration::from_secs(3600)
        } else {
            Duration::from_secs(timeout_secs)
        };

        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| AdapterError::Timeout {
                program: program.to_string(),
                timeout_secs,
            })?
            .map_err(|e| AdapterError::Spawn {
                program: program.to_string(),
                source: e,
            })?;

        let finish_ts = epoch_secs();
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let log = format!("{stdout}{stderr}");
        let exit_code = output.status.code().unwrap_or(-1);

        Ok(AdapterResult {
            exit_code,
            start_ts: Some(start_ts),
            finish_ts: Some(finish_ts),
            message: if exit_code == 0 { String::new() } else { stderr.trim().to_string() },
            log,
        })
    }
}

#[async_trait]
impl StorageAdapter for GfalAdapter {
    async fn filecopy(&self, src: &str, dst: &str, params: &FileCopyParams) -> Result<AdapterResult, AdapterError> {
        let mut cmd = self.command("gfal-copy", None);
        if let Some(algo) = &params.checksum_algo {
            cmd.arg("-K").arg(algo);
            if let Some(checksum) = &params.checksum {
                cmd.arg(checksum);
            }
        }
        if !params.overwrite {
            cmd.arg("--no-replace");
        } else {
            cmd.arg("-f");
        }
        cmd.arg(src).arg(dst);
        self.run(cmd, "gfal-copy", params.timeout_secs).await
    }

    async fn stat(&self, pfn: &str) -> Result<AdapterResult, AdapterError> {
        let mut cmd = self.command("gfal-stat", None);
        cmd.arg(pfn);
        self.run(cmd, "gfal-stat", 0).await
    }

    async fn unlink(&self, pfn: &str) -> Result<AdapterResult, AdapterError> {
        let mut cmd = self.command("gfal-rm", None);
        cmd.arg(pfn);
        self.run(cmd, "gfal-rm", 0).await
    }

    async fn bring_online(
        &self,
        pfns: &[String],
        pin_time_secs: u64,
        timeout_secs: u64,
        r#async: bool,
    ) -> Result<BringOnlineResult, AdapterError> {
        let mut cmd = self.command("gfal-legacy-bringonline", None);
        cmd.arg("-t").arg(pin_time_secs.to_string());
        if r#async {
            cmd.arg("--async");
        }
        cmd.args(pfns);

        let result = self.run(cmd, "gfal-legacy-bringonline", timeout_secs).await?;

        // The token is the trimmed stdout/log on success; on failure every
        // PFN in this call is reported against the same error.
        if result.is_success() {
            let token = result.log.lines().next().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
            Ok(BringOnlineResult {
                per_file_errors: pfns.iter().cloned().map(|pfn| (pfn, None)).collect(),
                token,
            })
        } else {
            let per_file_errors = pfns.iter().cloned().map(|pfn| (pfn, Some(result.clone()))).collect();
            Ok(BringOnlineResult { per_file_errors, token: None })
        }
    }

    async fn bring_online_poll(&self, pfn: &str, token: &str) -> Result<PollOutcome, AdapterError> {
        let mut cmd = self.command("gfal-legacy-bringonline", None);
        cmd.arg("--poll").arg("-i").arg(token).arg(pfn);

        let result = self.run(cmd, "gfal-legacy-bringonline", 0).await?;
        match result.exit_code {
            0 => Ok(PollOutcome::Ready),
            1 => Ok(PollOutcome::Pending),
            _ => Ok(PollOutcome::Error(result)),
        }
    }
}
