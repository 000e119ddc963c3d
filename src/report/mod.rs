// SPDX-License-Identifier: PMPL-1.0-or-later
//! Audit summaries and their output formats.
//!
//! [`AuditReport::build`] tallies the Validator's reports into issue-type
//! buckets and computes the score. Rendering supports:
//! - Text: human-readable reports grouped by issue type
//! - JSON: the full summary for programmatic consumers
//! - SARIF: Static Analysis Results Interchange Format for IDE/CI integration

use crate::config::{ReportFormat, RuleSelection};
use crate::rules::RuleRegistry;
use crate::runner::{RuleDiagnostic, RunOutcome};
use crate::scoring::{get_score, issue_type_for_severity, IssueCount, IssueType};
use crate::validator::{IssueReport, Validator};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Structured JSON
    Json,
    /// SARIF for IDE/CI integration
    Sarif,
}

impl OutputFormat {
    /// JSON when the run configuration asks for it, text otherwise
    pub fn from_config(format: &ReportFormat) -> Self {
        if format.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Sarif => write!(f, "sarif"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "sarif" => Ok(OutputFormat::Sarif),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// A report with the scoring context of its rule
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    #[serde(flatten)]
    pub report: IssueReport,
    /// Effective severity string used for bucketing
    pub severity: String,
    pub issue_type: IssueType,
    pub category: String,
}

/// Everything a consumer needs from one completed run
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    /// Label of the audited document
    pub source: String,
    pub run: RunOutcome,
    pub reports: Vec<ReportEntry>,
    pub counts: IssueCount,
    pub score: u8,
}

impl AuditReport {
    /// Tally `validator` against the rules of `registry`.
    ///
    /// Each report lands in the bucket of its rule's effective severity (the
    /// configured override, else the descriptor's). Each rule that ran without
    /// reports and without failing adds one `passed`.
    pub fn build(
        source: &str,
        outcome: &RunOutcome,
        validator: &Validator,
        registry: &RuleRegistry,
        selection: &RuleSelection,
    ) -> Self {
        let mut counts = IssueCount::default();
        let mut warned: HashSet<&str> = HashSet::new();
        let mut per_rule: HashMap<&str, usize> = HashMap::new();
        let mut reports = Vec::with_capacity(validator.len());

        for report in validator.reports() {
            *per_rule.entry(report.rule_id.as_str()).or_insert(0) += 1;

            let descriptor = registry.get(&report.rule_id).map(|r| r.descriptor());
            let severity = match selection.severity.get(&report.rule_id) {
                Some(custom) => custom.clone(),
                None => descriptor.map(|d| d.severity.as_str().to_string()).unwrap_or_default(),
            };
            let issue_type = issue_type_for_severity(&severity);
            if issue_type == IssueType::Passed && warned.insert(report.rule_id.as_str()) {
                warn!(
                    rule = %report.rule_id,
                    "Severity '{}' is not recognised; reports of this rule do not affect the score",
                    severity
                );
            }
            counts.add(issue_type);

            reports.push(ReportEntry {
                report: report.clone(),
                severity,
                issue_type,
                category: descriptor.map(|d| d.category.clone()).unwrap_or_default(),
            });
        }

        for rule_id in &outcome.rules_run {
            if !outcome.failed(rule_id) && !per_rule.contains_key(rule_id.as_str()) {
                counts.add(IssueType::Passed);
            }
        }

        Self {
            source: source.to_string(),
            run: outcome.clone(),
            reports,
            score: get_score(&counts),
            counts,
        }
    }

    /// Reports in one issue-type bucket
    pub fn by_issue_type(&self, issue_type: IssueType) -> Vec<&ReportEntry> {
        self.reports.iter().filter(|r| r.issue_type == issue_type).collect()
    }

    /// Whether any report counts as an error
    pub fn has_errors(&self) -> bool {
        self.reports.iter().any(|r| r.issue_type == IssueType::Error)
    }

    pub fn failures(&self) -> &[RuleDiagnostic] {
        &self.run.failures
    }
}

/// Render a report
pub fn generate_report(report: &AuditReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => generate_text_report(report),
        OutputFormat::Json => generate_json_report(report),
        OutputFormat::Sarif => generate_sarif_report(std::slice::from_ref(report)),
    }
}

/// Render several reports as one document.
///
/// JSON becomes an array and SARIF gets one run per report.
pub fn generate_batch_report(reports: &[AuditReport], format: OutputFormat) -> String {
    match (format, reports) {
        (_, [single]) => generate_report(single, format),
        (OutputFormat::Text, _) => reports
            .iter()
            .map(generate_text_report)
            .collect::<Vec<_>>()
            .join("\n"),
        (OutputFormat::Json, _) => serde_json::to_string_pretty(reports).unwrap_or_else(|e| {
            format!("{{\"error\": \"Failed to serialize report: {}\"}}", e)
        }),
        (OutputFormat::Sarif, _) => generate_sarif_report(reports),
    }
}

/// Generate human-readable text report
fn generate_text_report(report: &AuditReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("=== Accessguard Report: {} ===\n\n", report.source));

    if report.reports.is_empty() {
        output.push_str("No accessibility issues found.\n");
    } else {
        output.push_str(&format!(
            "Found {} issue(s): {} error(s), {} warning(s)\n\n",
            report.reports.len(),
            report.counts.error,
            report.counts.warning
        ));

        for issue_type in &[IssueType::Error, IssueType::Warning, IssueType::Passed] {
            let entries = report.by_issue_type(*issue_type);
            if entries.is_empty() {
                continue;
            }

            output.push_str(&format!("--- {} ({}) ---\n", issue_type, entries.len()));

            for entry in entries {
                output.push_str(&format!(
                    "[{}] {} ({})\n",
                    entry.report.rule_id, entry.report.message, entry.severity
                ));
                match &entry.report.node {
                    Some(node) => {
                        output.push_str(&format!("  Element: {}\n", node.snippet));
                        output.push_str(&format!("  Path: {}\n", node.path));
                    }
                    None => output.push_str("  Element: <document>\n"),
                }
                output.push('\n');
            }
        }
    }

    if !report.run.failures.is_empty() {
        output.push_str(&format!("--- rule failures ({}) ---\n", report.run.failures.len()));
        for failure in &report.run.failures {
            output.push_str(&format!("[{}] {}\n", failure.rule_id, failure.message));
        }
        output.push('\n');
    }

    output.push_str(&format!(
        "Rules run: {}, passed: {}\nSCORE: {}/100\n",
        report.run.rules_run.len(),
        report.counts.passed,
        report.score
    ));

    output
}

/// Generate JSON report
fn generate_json_report(report: &AuditReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|e| {
        format!("{{\"error\": \"Failed to serialize report: {}\"}}", e)
    })
}

/// SARIF report structure (simplified)
#[derive(Debug, Serialize)]
struct SarifReport {
    #[serde(rename = "$schema")]
    schema: String,
    version: String,
    runs: Vec<SarifRun>,
}

#[derive(Debug, Serialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Debug, Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Debug, Serialize)]
struct SarifDriver {
    name: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct SarifResult {
    #[serde(rename = "ruleId")]
    rule_id: String,
    level: String,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
}

#[derive(Debug, Serialize)]
struct SarifMessage {
    text: String,
}

#[derive(Debug, Serialize)]
struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    physical_location: SarifPhysicalLocation,
    #[serde(rename = "logicalLocations", skip_serializing_if = "Vec::is_empty")]
    logical_locations: Vec<SarifLogicalLocation>,
}

#[derive(Debug, Serialize)]
struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    artifact_location: SarifArtifactLocation,
}

#[derive(Debug, Serialize)]
struct SarifArtifactLocation {
    uri: String,
}

#[derive(Debug, Serialize)]
struct SarifLogicalLocation {
    #[serde(rename = "fullyQualifiedName")]
    fully_qualified_name: String,
    kind: String,
}

/// Generate SARIF report, one run per audited document
fn generate_sarif_report(reports: &[AuditReport]) -> String {
    let runs = reports
        .iter()
        .map(|report| SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: "accessguard".to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                },
            },
            results: report.reports.iter().map(|entry| sarif_result(&report.source, entry)).collect(),
        })
        .collect();

    let sarif = SarifReport {
        schema: "https://json.schemastore.org/sarif-2.1.0.json".to_string(),
        version: "2.1.0".to_string(),
        runs,
    };

    serde_json::to_string_pretty(&sarif).unwrap_or_else(|e| {
        format!("{{\"error\": \"Failed to serialize SARIF report: {}\"}}", e)
    })
}

fn sarif_result(source: &str, entry: &ReportEntry) -> SarifResult {
    let level = match entry.issue_type {
        IssueType::Error => "error",
        IssueType::Warning => "warning",
        IssueType::Passed => "note",
    };

    let logical_locations = entry
        .report
        .node
        .iter()
        .map(|node| SarifLogicalLocation {
            fully_qualified_name: node.path.clone(),
            kind: "element".to_string(),
        })
        .collect();

    SarifResult {
        rule_id: entry.report.rule_id.clone(),
        level: level.to_string(),
        message: SarifMessage {
            text: entry.report.message.clone(),
        },
        locations: vec![SarifLocation {
            physical_location: SarifPhysicalLocation {
                artifact_location: SarifArtifactLocation { uri: source.to_string() },
            },
            logical_locations,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::rules::default_registry;
    use crate::runner::Auditor;
    use scraper::Html;

    const PAGE: &str = r#"<html><body>
        <h1>Title</h1><h3>Skipped</h3>
        <img src="a.png">
        <button>Save</button>
    </body></html>"#;

    fn audit(html: &str, config: &RunConfig) -> AuditReport {
        let auditor = Auditor::new(default_registry());
        let doc = Html::parse_document(html);
        let mut validator = Validator::new();
        let outcome = auditor.run(&doc, config, &mut validator).expect("run completes");
        AuditReport::build("page.html", &outcome, &validator, auditor.registry(), &config.rules)
    }

    #[test]
    fn test_tally_and_score() {
        let report = audit(PAGE, &RunConfig::default());
        // html-has-lang + image-alt are errors, heading-order is a warning
        assert_eq!(report.counts.error, 2);
        assert_eq!(report.counts.warning, 1);
        // 9 rules run, 3 of them reported
        assert_eq!(report.counts.passed, 6);
        assert_eq!(report.score, get_score(&report.counts));
        assert_eq!(report.score, 74);
        assert!(report.has_errors());
    }

    #[test]
    fn test_clean_page_scores_100() {
        let report = audit(
            r#"<html lang="en"><body><h1>Title</h1><img src="a.png" alt="A cat"></body></html>"#,
            &RunConfig::default(),
        );
        assert!(report.reports.is_empty());
        assert_eq!(report.counts.error, 0);
        assert_eq!(report.score, 100);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_unknown_severity_override_counts_as_passed() {
        let mut config = RunConfig::default();
        config.rules.severity.insert("image-alt".to_string(), "crtical".to_string());
        config.rules.severity.insert("html-has-lang".to_string(), "info".to_string());

        let report = audit(PAGE, &config);
        assert_eq!(report.counts.error, 0);
        assert_eq!(report.counts.warning, 2);
        assert_eq!(report.counts.passed, 7);
        let image = report.reports.iter().find(|r| r.report.rule_id == "image-alt").unwrap();
        assert_eq!(image.issue_type, IssueType::Passed);
        assert_eq!(image.severity, "crtical");
    }

    #[test]
    fn test_text_report() {
        let report = audit(PAGE, &RunConfig::default());
        let text = generate_report(&report, OutputFormat::Text);
        assert!(text.contains("Accessguard Report: page.html"));
        assert!(text.contains("[image-alt]"));
        assert!(text.contains("Element: <document>") || text.contains("Element: <html>"));
        assert!(text.contains("SCORE: 74/100"));
    }

    #[test]
    fn test_json_report() {
        let report = audit(PAGE, &RunConfig::default());
        let json = generate_report(&report, OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        assert!(parsed["reports"].is_array());
        assert_eq!(parsed["reports"][0]["id"], "report_0");
        assert!(parsed["reports"][0]["ruleId"].is_string());
        assert_eq!(parsed["score"], 74);
        assert_eq!(parsed["run"]["status"], "completed");
    }

    #[test]
    fn test_sarif_report() {
        let report = audit(PAGE, &RunConfig::default());
        let sarif = generate_report(&report, OutputFormat::Sarif);
        let parsed: serde_json::Value = serde_json::from_str(&sarif).expect("valid JSON");
        assert_eq!(parsed["version"], "2.1.0");
        assert_eq!(parsed["runs"][0]["tool"]["driver"]["name"], "accessguard");
        let results = parsed["runs"][0]["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().any(|r| r["level"] == "warning"));
    }

    #[test]
    fn test_batch_report() {
        let first = audit(PAGE, &RunConfig::default());
        let second = audit(r#"<html lang="en"><body><h1>Ok</h1></body></html>"#, &RunConfig::default());
        let reports = vec![first, second];

        let json: serde_json::Value =
            serde_json::from_str(&generate_batch_report(&reports, OutputFormat::Json)).expect("valid JSON");
        assert_eq!(json.as_array().map(Vec::len), Some(2));
        assert_eq!(json[1]["score"], 100);

        let sarif: serde_json::Value =
            serde_json::from_str(&generate_batch_report(&reports, OutputFormat::Sarif)).expect("valid JSON");
        assert_eq!(sarif["runs"].as_array().map(Vec::len), Some(2));

        let text = generate_batch_report(&reports, OutputFormat::Text);
        assert_eq!(text.matches("=== Accessguard Report").count(), 2);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("sarif".parse::<OutputFormat>().unwrap(), OutputFormat::Sarif);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_format_from_config() {
        assert_eq!(OutputFormat::from_config(&ReportFormat { json: true }), OutputFormat::Json);
        assert_eq!(OutputFormat::from_config(&ReportFormat::default()), OutputFormat::Text);
    }
}
