// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drop from root to a configured service account once privileged setup
//! (rlimits, PID file under a root-owned directory) is done.

use nix::unistd::{Gid, Uid, User};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PrivDropError {
    #[error("unknown user {0}")]
    UnknownUser(String),
    #[error("failed to look up user {user}: {source}")]
    Lookup { user: String, source: nix::Error },
    #[error("failed to set gid: {0}")]
    SetGid(nix::Error),
    #[error("failed to set uid: {0}")]
    SetUid(nix::Error),
}

/// No-op when `user` is `None` or the process isn't running as root —
/// lets the daemon run unprivileged in dev/test without extra config.
pub fn drop_privileges(user: Option<&str>) -> Result<(), PrivDropError> {
    let Some(username) = user else {
        return Ok(());
    };
    if !Uid::effective().is_root() {
        info!(user = username, "not running as root, skipping privilege drop");
        return Ok(());
    }

    let account = User::from_name(username).map_err(|source| PrivDropError::Lookup {
        user: username.to_string(),
        source,
    })?;
    let account = account.ok_or_else(|| PrivDropError::UnknownUser(username.to_string()))?;

    nix::unistd::setgid(Gid::from_raw(account.gid.as_raw())).map_err(PrivDropError::SetGid)?;
    nix::unistd::setuid(Uid::from_raw(account.uid.as_raw())).map_err(PrivDropError::SetUid)?;
    info!(user = username, uid = account.uid.as_raw(), gid = account.gid.as_raw(), "dropped privileges");
    Ok(())
}

/// Raise `RLIMIT_NOFILE` to accommodate one file descriptor per in-flight
/// `gfal-*` child process plus the WAL/snapshot handles.
pub fn raise_nofile_limit(target: u64) -> Result<(), nix::Error> {
    use nix::sys::resource::{setrlimit, Resource};
    setrlimit(Resource::RLIMIT_NOFILE, target, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_when_no_user_configured() {
        assert!(drop_privileges(None).is_ok());
    }
}
