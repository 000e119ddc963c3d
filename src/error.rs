// SPDX-License-Identifier: PMPL-1.0-or-later
//! Error types for accessguard

use thiserror::Error;

/// Orchestrator-level and configuration errors.
///
/// A rule that fails during `validate` never surfaces here; the orchestrator
/// turns it into a [`RuleDiagnostic`](crate::runner::RuleDiagnostic) and moves on.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("DOM query unavailable: {0}")]
    DomUnavailable(String),

    #[error("Audit context '{0}' did not match any element")]
    ContextNotFound(String),

    #[error("A validation run is already in progress on this auditor")]
    Reentrant,

    #[error("Document error: {0}")]
    Document(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, AuditError>;

/// Why a rule was refused by the registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("rule has an empty id")]
    EmptyId,

    #[error("rule id '{0}' is not kebab-case")]
    MalformedId(String),
}

/// Failures raised while resolving a rule's selector
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The rule carries a selector the query engine cannot parse
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// The query capability itself is gone; fatal to the run
    #[error("{0}")]
    Unavailable(String),
}
