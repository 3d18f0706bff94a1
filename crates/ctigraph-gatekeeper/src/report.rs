//! Valid/invalid partition and summary report

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A rejected record together with every reason that applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidTriple {
    /// The record exactly as received
    pub triple: Value,
    /// Reason codes
    pub reasons: Vec<String>,
}

/// Output of [`crate::Gatekeeper::partition`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    /// Records that passed, unchanged
    pub valid: Vec<Value>,
    /// Records that failed, with reasons
    pub invalid: Vec<InvalidTriple>,
}

impl Partition {
    /// Summarize the partition
    pub fn report(&self) -> ValidationReport {
        let mut reason_counts = BTreeMap::new();
        for item in &self.invalid {
            for reason in &item.reasons {
                *reason_counts.entry(reason.clone()).or_insert(0) += 1;
            }
        }
        ValidationReport {
            total: self.valid.len() + self.invalid.len(),
            valid: self.valid.len(),
            invalid: self.invalid.len(),
            reason_counts,
        }
    }
}

/// Counts printed after a validation run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Records seen
    pub total: usize,
    /// Records accepted
    pub valid: usize,
    /// Records rejected
    pub invalid: usize,
    /// Occurrences of each reason code
    pub reason_counts: BTreeMap<String, usize>,
}

impl ValidationReport {
    /// Share of valid records; `None` for an empty input
    pub fn valid_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.valid as f64 / self.total as f64)
    }

    /// Share of invalid records; `None` for an empty input
    pub fn invalid_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.invalid as f64 / self.total as f64)
    }
}
