// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task status enums and the DAG transition rules that govern them.
//!
//! Status transitions form a DAG: `new -> (staging -> staged)? -> queued ->
//! active -> {done, failed}`, with `cancelled` reachable from any of `{new,
//! staging, staged, queued}` but never from `active` or a terminal status.
//! `active -> cancelled` is forbidden — a worker that loses the cancellation
//! race before reaching `active` reports `cancelled`; after that point the
//! task runs to `done`/`failed` regardless of a concurrent cancel request.

use crate::simple_display;

/// Status of a row in the transfer task table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    New,
    Staging,
    Staged,
    Queued,
    Active,
    Done,
    Failed,
    Cancelled,
}

simple_display! {
    TransferStatus {
        New => "new",
        Staging => "staging",
        Staged => "staged",
        Queued => "queued",
        Active => "active",
        Done => "done",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl TransferStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// Whether a task currently in this status may still be cancelled.
    ///
    /// Once a worker writes `active` the cancellation window has closed:
    /// `active -> cancelled` is not a valid edge in the DAG.
    pub const fn cancellable(self) -> bool {
        matches!(self, Self::New | Self::Staging | Self::Staged | Self::Queued)
    }

    /// Whether `to` is a legal direct successor of `self` in the transfer DAG.
    ///
    /// Includes the crash-recovery reset edge (`queued`/`active` -> `new`):
    /// that one runs backwards against the normal flow, but it is the
    /// restart-time reconciliation every row in those statuses must accept,
    /// not a forward step a worker takes. Also includes the two pre-active
    /// failure shortcuts: a `bring_online` per-file rejection fails a `new`
    /// tape task before it ever stages, and an irrecoverable staging-poll
    /// error fails a `staging` task before it ever queues. Neither touches
    /// the adapter through a worker, so neither passes through `active`.
    pub const fn can_transition_to(self, to: Self) -> bool {
        use TransferStatus::*;
        match (self, to) {
            (New, Staging) | (New, Queued) => true,
            (Staging, Staged) => true,
            (Staged, Queued) => true,
            (Queued, Active) => true,
            (Active, Done) | (Active, Failed) => true,
            (Queued, New) | (Active, New) => true,
            (New, Failed) | (Staging, Failed) => true,
            (s, Cancelled) => s.cancellable(),
            _ => false,
        }
    }
}

/// Status of a row in the deletion task table.
///
/// Deletion tasks never stage, so this is the transfer DAG with the
/// `staging`/`staged` states removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletionStatus {
    New,
    Queued,
    Active,
    Done,
    Failed,
    Cancelled,
}

simple_display! {
    DeletionStatus {
        New => "new",
        Queued => "queued",
        Active => "active",
        Done => "done",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl DeletionStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    pub const fn cancellable(self) -> bool {
        matches!(self, Self::New | Self::Queued)
    }

    pub const fn can_transition_to(self, to: Self) -> bool {
        use DeletionStatus::*;
        match (self, to) {
            (New, Queued) => true,
            (Queued, Active) => true,
            (Active, Done) | (Active, Failed) => true,
            (Queued, New) | (Active, New) => true,
            (s, Cancelled) => s.cancellable(),
            _ => false,
        }
    }
}

/// The sentinel a worker reports when it loses the queued-set race: exit
/// code `-1`, no timestamps, empty message and log.
pub const CANCELLED_EXIT_CODE: i32 = -1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_to_cancelled_is_forbidden_for_transfers() {
        assert!(!TransferStatus::Active.can_transition_to(TransferStatus::Cancelled));
    }

    #[test]
    fn active_to_cancelled_is_forbidden_for_deletions() {
        assert!(!DeletionStatus::Active.can_transition_to(DeletionStatus::Cancelled));
    }

    #[test]
    fn cancelled_reachable_from_every_pre_active_transfer_status() {
        for s in [
            TransferStatus::New,
            TransferStatus::Staging,
            TransferStatus::Staged,
            TransferStatus::Queued,
        ] {
            assert!(s.can_transition_to(TransferStatus::Cancelled), "{s} should cancel");
        }
    }

    #[test]
    fn terminal_statuses_have_no_outgoing_edges() {
        for s in [TransferStatus::Done, TransferStatus::Failed, TransferStatus::Cancelled] {
            for to in [
                TransferStatus::New,
                TransferStatus::Staging,
                TransferStatus::Staged,
                TransferStatus::Queued,
                TransferStatus::Active,
                TransferStatus::Done,
                TransferStatus::Failed,
                TransferStatus::Cancelled,
            ] {
                if s == to {
                    continue;
                }
                assert!(!s.can_transition_to(to));
            }
        }
    }

    #[test]
    fn pre_active_failure_shortcuts_are_legal_edges() {
        assert!(TransferStatus::New.can_transition_to(TransferStatus::Failed));
        assert!(TransferStatus::Staging.can_transition_to(TransferStatus::Failed));
    }

    #[test]
    fn crash_recovery_reset_is_a_legal_edge() {
        assert!(TransferStatus::Queued.can_transition_to(TransferStatus::New));
        assert!(TransferStatus::Active.can_transition_to(TransferStatus::New));
        assert!(DeletionStatus::Queued.can_transition_to(DeletionStatus::New));
        assert!(DeletionStatus::Active.can_transition_to(DeletionStatus::New));
    }

    #[test]
    fn display_matches_sql_column_values() {
        assert_eq!(TransferStatus::Staged.to_string(), "staged");
        assert_eq!(DeletionStatus::Cancelled.to_string(), "cancelled");
    }
}
