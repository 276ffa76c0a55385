// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps adapter error codes and message substrings into three dispositions:
//! *success-equivalent* (the task is done even though the adapter reported
//! non-zero), *irrecoverable* (no retry), and *retryable* (up to a small
//! bounded attempt count, enforced by the caller).
//!
//! The rule table is configuration-driven rather than hardcoded: operators
//! point `daemon.toml` at sites whose grid storage elements phrase the
//! same condition differently (e.g. a DPM endpoint's "file exists" message
//! versus a dCache one), and this module matches on substrings rather than
//! exact adapter error enums because the underlying grid I/O library
//! itself only exposes a message string, not a stable error code.

use crate::types::AdapterResult;
use serde::{Deserialize, Serialize};

/// What kind of task produced the result being classified. The same
/// message substring can mean different things for a transfer vs. a
/// deletion (e.g. "No such file" is terminal-success for a delete but
/// irrecoverable for a transfer whose source vanished).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Transfer,
    Delete,
    Stage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Disposition {
    SuccessEquivalent,
    Irrecoverable,
    Retryable,
}

/// One configured rule: an optional operation filter and a message
/// substring, matched case-insensitively against `AdapterResult::message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierRule {
    #[serde(default)]
    pub operation: Option<OperationKind>,
    pub message_substring: String,
    pub disposition: Disposition,
}

/// Ordered list of rules; the first match wins. Falls back to
/// [`ClassifierConfig::default_disposition`] when nothing matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub rules: Vec<ClassifierRule>,
    #[serde(default = "default_fallback")]
    pub default_disposition: Disposition,
}

fn default_fallback() -> Disposition {
    Disposition::Retryable
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            default_disposition: Disposition::Retryable,
        }
    }
}

fn default_rules() -> Vec<ClassifierRule> {
    vec![
        // success-equivalent-for-deletion: target already absent.
        ClassifierRule {
            operation: Some(OperationKind::Delete),
            message_substring: "no such file".into(),
            disposition: Disposition::SuccessEquivalent,
        },
        ClassifierRule {
            operation: Some(OperationKind::Delete),
            message_substring: "does not exist".into(),
            disposition: Disposition::SuccessEquivalent,
        },
        // success-equivalent-for-transfer: destination already present and
        // accepted as-is.
        ClassifierRule {
            operation: Some(OperationKind::Transfer),
            message_substring: "already exists".into(),
            disposition: Disposition::SuccessEquivalent,
        },
        // irrecoverable: no point burning the retry budget.
        ClassifierRule {
            operation: None,
            message_substring: "permission denied".into(),
            disposition: Disposition::Irrecoverable,
        },
        ClassifierRule {
            operation: None,
            message_substring: "checksum mismatch".into(),
            disposition: Disposition::Irrecoverable,
        },
        ClassifierRule {
            operation: Some(OperationKind::Transfer),
            message_substring: "no such file".into(),
            disposition: Disposition::Irrecoverable,
        },
        ClassifierRule {
            operation: None,
            message_substring: "invalid argument".into(),
            disposition: Disposition::Irrecoverable,
        },
    ]
}

/// Classify a non-zero [`AdapterResult`] for the given operation.
///
/// Callers only invoke this on failures (`result.exit_code != 0`); a
/// successful result never needs classification.
pub fn classify(operation: OperationKind, result: &AdapterResult, config: &ClassifierConfig) -> Disposition {
    let message = result.message.to_lowercase();
    for rule in &config.rules {
        if let Some(op) = rule.operation {
            if op != operation {
                continue;
            }
        }
        if message.contains(&rule.message_substring.to_lowercase()) {
            return rule.disposition;
        }
    }
    config.default_disposition
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(message: &str) -> AdapterResult {
        AdapterResult {
            exit_code: 2,
            start_ts: Some(1),
            finish_ts: Some(2),
            message: message.to_string(),
            log: String::new(),
        }
    }

    #[test]
    fn enoent_on_delete_is_success_equivalent() {
        let config = ClassifierConfig::default();
        let result = failed("Target file does not exist.");
        assert_eq!(classify(OperationKind::Delete, &result, &config), Disposition::SuccessEquivalent);
    }

    #[test]
    fn destination_exists_on_transfer_is_success_equivalent() {
        let config = ClassifierConfig::default();
        let result = failed("destination already exists");
        assert_eq!(classify(OperationKind::Transfer, &result, &config), Disposition::SuccessEquivalent);
    }

    #[test]
    fn missing_source_on_transfer_is_irrecoverable_not_success() {
        let config = ClassifierConfig::default();
        let result = failed("No such file or directory");
        assert_eq!(classify(OperationKind::Transfer, &result, &config), Disposition::Irrecoverable);
    }

    #[test]
    fn unmatched_message_falls_back_to_retryable() {
        let config = ClassifierConfig::default();
        let result = failed("connection reset by peer");
        assert_eq!(classify(OperationKind::Transfer, &result, &config), Disposition::Retryable);
    }

    #[test]
    fn operation_scoped_rule_does_not_leak_to_other_operations() {
        let config = ClassifierConfig::default();
        // "does not exist" is scoped to Delete; for Stage it should fall through.
        let result = failed("file does not exist");
        assert_eq!(classify(OperationKind::Stage, &result, &config), Disposition::Retryable);
    }
}
