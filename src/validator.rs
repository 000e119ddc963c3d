// SPDX-License-Identifier: PMPL-1.0-or-later
//! Report store for a validation run.
//!
//! The [`Validator`] owns every [`IssueReport`] produced since the last
//! [`Validator::reset`]. It never clears itself: a run that straddles several
//! DOM mutations keeps accumulating until the caller resets it. Each audit
//! owns its own instance, so independent sessions never share reports.

use crate::dom::NodeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One recorded violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueReport {
    /// Sequential id (`report_0`, `report_1`, ...), assigned on insertion
    pub id: String,
    /// Interpolated, human-readable message
    pub message: String,
    /// Offending element, or `None` for a document-level issue
    pub node: Option<NodeRef>,
    /// Kebab-case id of the rule that produced this report
    pub rule_id: String,
}

impl IssueReport {
    /// Create a report that has not been recorded yet (empty id)
    pub fn new(rule_id: &str, message: impl Into<String>, node: Option<NodeRef>) -> Self {
        Self {
            id: String::new(),
            message: message.into(),
            node,
            rule_id: rule_id.to_string(),
        }
    }

    /// Whether this issue concerns the document rather than one element
    pub fn is_document_level(&self) -> bool {
        self.node.is_none()
    }
}

/// Ordered, resettable collection of reports
#[derive(Debug, Default)]
pub struct Validator {
    reports: Vec<IssueReport>,
    index: HashMap<String, usize>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue, assigning it the next `report_N` id.
    ///
    /// No deduplication: two rules flagging the same element yield two reports.
    pub fn report(&mut self, mut issue: IssueReport) -> String {
        let id = format!("report_{}", self.reports.len());
        issue.id = id.clone();
        self.index.insert(id.clone(), self.reports.len());
        self.reports.push(issue);
        id
    }

    /// All reports since the last reset, in insertion order
    pub fn reports(&self) -> &[IssueReport] {
        &self.reports
    }

    /// Point lookup by report id
    pub fn get_report(&self, id: &str) -> Option<&IssueReport> {
        self.index.get(id).map(|&idx| &self.reports[idx])
    }

    /// Reports produced by one rule
    pub fn by_rule(&self, rule_id: &str) -> Vec<&IssueReport> {
        self.reports.iter().filter(|r| r.rule_id == rule_id).collect()
    }

    /// Drop every report; numbering restarts at `report_0`.
    ///
    /// Calling this while a run is in flight is a caller error.
    pub fn reset(&mut self) {
        self.reports.clear();
        self.index.clear();
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}
