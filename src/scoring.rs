// SPDX-License-Identifier: PMPL-1.0-or-later
//! Health score computation.
//!
//! Reports are bucketed into issue types by the severity of the rule that
//! produced them, and the bucket counts are reduced to one percentage. A
//! warning weighs one tenth of an error. Unrecognised severity strings fall
//! into `Passed`, so a misspelled severity silently stops counting.

use serde::{Deserialize, Serialize};

/// Scoring bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Error,
    Warning,
    Passed,
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueType::Error => write!(f, "error"),
            IssueType::Warning => write!(f, "warning"),
            IssueType::Passed => write!(f, "passed"),
        }
    }
}

/// Map a severity string to its bucket; total over all inputs
pub fn issue_type_for_severity(severity: &str) -> IssueType {
    match severity {
        "critical" | "high" | "low" => IssueType::Error,
        "info" => IssueType::Warning,
        _ => IssueType::Passed,
    }
}

/// Bucket counts fed to [`get_score`]; absent fields read as zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCount {
    #[serde(default)]
    pub error: u64,
    #[serde(default)]
    pub warning: u64,
    #[serde(default)]
    pub passed: u64,
}

impl IssueCount {
    /// Increment the bucket for `issue_type`
    pub fn add(&mut self, issue_type: IssueType) {
        match issue_type {
            IssueType::Error => self.error += 1,
            IssueType::Warning => self.warning += 1,
            IssueType::Passed => self.passed += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.error + self.warning + self.passed
    }
}

/// Score in `[0, 100]`; an empty count scores 100
pub fn get_score(count: &IssueCount) -> u8 {
    let errors = count.error as f64 + count.warning as f64 / 10.0;
    let total = count.passed as f64 + errors;
    let error_ratio = if total > 0.0 { errors / total } else { 0.0 };
    ((1.0 - error_ratio) * 100.0).round().clamp(0.0, 100.0) as u8
}
