// SPDX-License-Identifier: PMPL-1.0-or-later
//! Run configuration

use crate::error::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Options recognised by a validation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Yield to the runtime between rules
    #[serde(default, alias = "asyncRunner")]
    pub async_runner: bool,

    /// CSS selector of the audit root; the whole document when unset
    #[serde(default)]
    pub context: Option<String>,

    /// Treat hidden elements as candidates
    #[serde(default, alias = "includeHidden")]
    pub include_hidden: bool,

    /// Re-run on DOM mutation while watching
    #[serde(default, alias = "watchDomChanges")]
    pub watch_dom_changes: bool,

    /// Output encoding requested by the consumer
    #[serde(default, alias = "reportFormat")]
    pub report_format: ReportFormat,

    /// Quiet period before a mutation-triggered re-run
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Selectors whose subtrees are never audited
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Rule selection and severity overrides
    #[serde(default)]
    pub rules: RuleSelection,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            async_runner: false,
            context: None,
            include_hidden: false,
            watch_dom_changes: false,
            report_format: ReportFormat::default(),
            debounce_ms: default_debounce_ms(),
            exclude: Vec::new(),
            rules: RuleSelection::default(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    250
}

/// Output encoding switch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFormat {
    #[serde(default, rename = "JSON", alias = "json")]
    pub json: bool,
}

/// Which registered rules take part in a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSelection {
    /// Rule ids that are skipped
    #[serde(default)]
    pub disabled: Vec<String>,

    /// When non-empty, only rules in these categories run
    #[serde(default)]
    pub categories: Vec<String>,

    /// Severity string per rule id, replacing the descriptor's severity when scoring
    #[serde(default)]
    pub severity: HashMap<String, String>,
}

impl RuleSelection {
    /// Whether a rule with this id and category should run
    pub fn is_enabled(&self, rule_id: &str, category: &str) -> bool {
        if self.disabled.iter().any(|d| d == rule_id) {
            return false;
        }
        self.categories.is_empty() || self.categories.iter().any(|c| c == category)
    }
}

/// Load configuration from a path.
///
/// A missing file yields the defaults. `.toml` files are parsed as TOML,
/// everything else as YAML.
pub fn load_config(path: &Path) -> Result<RunConfig> {
    if !path.exists() {
        debug!("Config file not found at {}, using defaults", path.display());
        return Ok(RunConfig::default());
    }

    let content = std::fs::read_to_string(path)?;

    let config: RunConfig = if is_toml(path) {
        toml::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };

    debug!(?config, "Loaded configuration");
    Ok(config)
}

/// Default config location relative to the working directory
pub fn default_config_path() -> PathBuf {
    PathBuf::from(".accessguard.toml")
}

/// Write the default configuration to a file
pub fn write_default_config(path: &Path) -> Result<()> {
    let config = RunConfig::default();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let content = if is_toml(path) {
        toml::to_string_pretty(&config).map_err(|e| AuditError::Config(e.to_string()))?
    } else {
        serde_yaml::to_string(&config)?
    };

    std::fs::write(path, content)?;
    Ok(())
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|e| e == "toml").unwrap_or(false)
}
