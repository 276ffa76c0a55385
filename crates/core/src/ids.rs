// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newtype identifiers for the tables the daemon reads and mutates.
//!
//! These mirror the primary keys of the relational schema the daemon shares
//! with the File Operations Manager: `t_file` (transfers), `t_dm`
//! (deletions) and the job/batch groupings transfers are submitted under.

use crate::define_numeric_id;

define_numeric_id! {
    /// Primary key of a row in the transfer task table.
    TransferTaskId
}

define_numeric_id! {
    /// Primary key of a row in the deletion task table.
    DeletionTaskId
}

define_numeric_id! {
    /// Groups transfer tasks submitted together by the File Operations Manager.
    BatchId
}

/// A storage endpoint identifier, e.g. `SITE-DISK` or `SITE-TAPE`.
///
/// Kept as an owned `String` rather than an interned/inline type: link keys
/// are formed by pairing two of these (`source => destination`) and are
/// looked up far less often than task ids, so the extra allocation doesn't
/// matter and a plain string keeps equality/hashing trivial to reason about.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct StorageEndpoint(pub String);

impl std::fmt::Display for StorageEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StorageEndpoint {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StorageEndpoint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A `(source, destination)` pair identifying a transfer link's concurrency
/// pool and scheduling bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct LinkKey {
    pub source: StorageEndpoint,
    pub destination: StorageEndpoint,
}

impl LinkKey {
    pub fn new(source: impl Into<StorageEndpoint>, destination: impl Into<StorageEndpoint>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

impl std::fmt::Display for LinkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}=>{}", self.source, self.destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_json() {
        let id = TransferTaskId::new(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
        let back: TransferTaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn link_key_displays_as_arrow_pair() {
        let key = LinkKey::new("SITE-A", "SITE-B");
        assert_eq!(key.to_string(), "SITE-A=>SITE-B");
    }
}
